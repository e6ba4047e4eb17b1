//! `#!import` preprocessing
//!
//! Runs on the raw document text before it is parsed. Each
//! `#!import <file>` directive is replaced by the content of the named file
//! followed by a newline. Imported files are expanded depth-first.
//!
//! Relative imports are always resolved against the directory of the
//! outermost document, including imports that appear inside imported files.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Extension appended to import targets that do not already carry it
pub const DOCUMENT_EXTENSION: &str = ".toml";

fn import_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#!import[ \t]+(.+)").expect("import pattern is valid"))
}

/// Check if text contains any `#!import` directive
pub fn contains_imports(text: &str) -> bool {
    import_regex().is_match(text)
}

/// Expand every `#!import` directive in `text`
///
/// `base_path` is the path of the document `text` was read from; it anchors
/// relative imports at every nesting level. An import chain that comes back
/// to a file already being expanded fails with `CircularImport`.
pub fn resolve_imports(base_path: &Path, text: &str) -> Result<String> {
    let base_dir = base_directory(base_path)?;
    let mut chain = vec![chain_key(&absolute(base_path)?)];
    expand(&base_dir, text, &mut chain)
}

fn expand(base_dir: &Path, text: &str, chain: &mut Vec<PathBuf>) -> Result<String> {
    let mut out = text.to_string();

    for caps in import_regex().captures_iter(text) {
        let directive = &caps[0];
        let target = import_target(base_dir, &caps[1]);
        let key = chain_key(&target);

        if chain.contains(&key) {
            let mut names: Vec<String> = chain.iter().map(|p| p.display().to_string()).collect();
            names.push(key.display().to_string());
            return Err(Error::circular_import(target.display().to_string(), names));
        }

        let content = std::fs::read_to_string(&target)
            .map_err(|e| Error::io(target.display().to_string(), &e))?;
        log::debug!("Importing {}", target.display());

        let content = if contains_imports(&content) {
            chain.push(key);
            let expanded = expand(base_dir, &content, chain);
            chain.pop();
            expanded?
        } else {
            content
        };

        out = out.replace(directive, &format!("{}\n", content));
    }

    Ok(out)
}

/// Resolve the file named by an import directive
fn import_target(base_dir: &Path, raw: &str) -> PathBuf {
    let mut file = raw.trim().to_string();
    if !file.ends_with(DOCUMENT_EXTENSION) {
        file.push_str(DOCUMENT_EXTENSION);
    }

    let file = PathBuf::from(file);
    if file.is_absolute() {
        file
    } else {
        base_dir.join(file)
    }
}

fn base_directory(base_path: &Path) -> Result<PathBuf> {
    let dir = base_path.parent().unwrap_or_else(|| Path::new(""));
    absolute(dir)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| Error::io(".", &e))?;
    Ok(cwd.join(path))
}

/// Identity of a file inside the import chain
fn chain_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
