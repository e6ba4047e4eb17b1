//! Main Document type for envforge
//!
//! A Document is a parsed configuration tree. Exporting a section projects
//! it out of the tree and resolves every reference against the whole tree.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::import;
use crate::interpolation::Interpolator;
use crate::render::{self, OutputFormat};
use crate::resolver::ResolveOptions;
use crate::section;
use crate::value::Value;

/// A loaded configuration document
#[derive(Debug, Clone)]
pub struct Document {
    /// The raw (unresolved) document tree
    root: Arc<Value>,
    /// File the document was loaded from, if any
    source: Option<PathBuf>,
}

impl Document {
    /// Create a Document from a Value
    ///
    /// The root must be a mapping.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_mapping() {
            return Err(Error::parse(format!(
                "Document root must be a table, got {}",
                value.type_name()
            )));
        }
        Ok(Self {
            root: Arc::new(value),
            source: None,
        })
    }

    /// Parse a document from TOML text without expanding imports
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let parsed: toml::Value = toml::from_str(text).map_err(|e| Error::parse(e.to_string()))?;
        Self::from_value(Value::from(parsed))
    }

    /// Parse a document from TOML text, expanding imports relative to `base_path`
    pub fn from_toml_str_with_base(text: &str, base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref();
        let expanded = import::resolve_imports(base_path, text)?;
        let mut doc = Self::from_toml_str(&expanded)
            .map_err(|e| e.with_path(base_path.display().to_string()))?;
        doc.source = Some(base_path.to_path_buf());
        Ok(doc)
    }

    /// Load a document from a file, expanding `#!import` directives
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(path.display().to_string(), &e))?;
        log::debug!("Loaded {} ({} bytes)", path.display(), content.len());

        Self::from_toml_str_with_base(&content, path)
    }

    /// The raw document tree
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// File the document was loaded from
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Get the raw (unresolved) value at a dotted path
    pub fn get_raw(&self, path: &str) -> Result<&Value> {
        self.root.get_path(path)
    }

    /// Resolve the references in a single string against this document
    pub fn interpolate(&self, text: &str, options: &ResolveOptions) -> Result<String> {
        Interpolator::new(&self.root, options).interpolate(text)
    }

    /// Project a section and resolve every reference in it
    ///
    /// An empty section exports the whole document.
    pub fn export(&self, section: &str, options: &ResolveOptions) -> Result<Value> {
        let projected = section::project(&self.root, section, options)?;
        Interpolator::new(&self.root, options).resolve_value(&projected)
    }

    /// Export a section and render it
    ///
    /// The format's own requirements (see [`OutputFormat::apply_defaults`])
    /// are not applied here; callers decide how options and format combine.
    pub fn render(
        &self,
        section: &str,
        format: OutputFormat,
        options: &ResolveOptions,
    ) -> Result<String> {
        let value = self.export(section, options)?;
        render::render(&value, format, options.include_child_sections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_end_to_end_dotenv() {
        let doc = Document::from_toml_str(
            r#"
[globals]
HOST = "x"

[svc]
URL = "${globals.HOST}:8080"
"#,
        )
        .unwrap();

        let out = doc
            .render("svc", OutputFormat::Dotenv, &ResolveOptions::default())
            .unwrap();
        assert_eq!(out, "URL=x:8080\n");
    }

    #[test]
    fn test_export_resolves_against_root() {
        let doc = Document::from_toml_str(
            r#"
[app]
NAME = "demo"

[app.web]
TITLE = "${app.NAME} web"
"#,
        )
        .unwrap();

        let value = doc
            .export("app.web", &ResolveOptions::default())
            .unwrap();
        assert_eq!(value.get_path("TITLE").unwrap().as_str(), Some("demo web"));
    }

    #[test]
    fn test_export_with_child_sections() {
        let doc = Document::from_toml_str(
            r#"
[globals]
HOST = "x"

[svc]
URL = "${globals.HOST}"

[svc.db]
DSN = "pg://${globals.HOST}/db"
"#,
        )
        .unwrap();

        let options = ResolveOptions::new().with_include_child_sections(true);
        let out = doc.render("svc", OutputFormat::Dotenv, &options).unwrap();
        assert_eq!(out, "URL=x\nDB__DSN=pg://x/db\n");

        let shallow = doc
            .render("svc", OutputFormat::Dotenv, &ResolveOptions::default())
            .unwrap();
        assert_eq!(shallow, "URL=x\n");
    }

    #[test]
    fn test_export_strict_missing_reference_fails() {
        let doc = Document::from_toml_str(
            r#"
[svc]
URL = "${globals.HOST}"
"#,
        )
        .unwrap();

        let err = doc.export("svc", &ResolveOptions::default()).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::NotFound {
                segment: "globals".into()
            }
        );

        let options = ResolveOptions::new().with_ignore_missing(true);
        let value = doc.export("svc", &options).unwrap();
        assert_eq!(
            value.get_path("URL").unwrap().as_str(),
            Some("${globals.HOST}")
        );
    }

    #[test]
    fn test_parse_error() {
        let err = Document::from_toml_str("this is = = not toml").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
    }

    #[test]
    fn test_load_expands_imports() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("globals.toml"), "[globals]\nHOST = \"db.internal\"\n")
            .unwrap();
        let main = temp.path().join("main.toml");
        fs::write(
            &main,
            "#!import globals\n\n[svc]\nDB = \"${globals.HOST}:5432\"\n",
        )
        .unwrap();

        let doc = Document::load(&main).unwrap();
        assert_eq!(doc.source(), Some(main.as_path()));
        assert_eq!(
            doc.get_raw("globals.HOST").unwrap().as_str(),
            Some("db.internal")
        );

        let value = doc.export("svc", &ResolveOptions::default()).unwrap();
        assert_eq!(
            value.get_path("DB").unwrap().as_str(),
            Some("db.internal:5432")
        );
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = Document::load(temp.path().join("nope.toml")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Io);
    }

    #[test]
    fn test_interpolate_single_string() {
        let doc = Document::from_toml_str("name = \"demo\"").unwrap();
        assert_eq!(
            doc.interpolate("hello ${name}", &ResolveOptions::default())
                .unwrap(),
            "hello demo"
        );
    }
}
