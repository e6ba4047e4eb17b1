//! Output renderers
//!
//! Each renderer turns an already resolved tree into a complete output
//! string. Nothing is written anywhere until rendering has succeeded.

use std::str::FromStr;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::resolver::ResolveOptions;
use crate::value::Value;

/// Separator between upper-cased path segments of flattened keys
pub const KEY_SEPARATOR: &str = "__";

/// Shebang written at the top of bash exports
pub const BASH_SHEBANG: &str = "#!/bin/bash";

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// `KEY=value` lines
    #[default]
    Dotenv,
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
    /// Bash script of `export KEY="value"` lines
    Bash,
    /// Caddyfile-style server blocks
    Caddy,
    /// Compose-style YAML
    Docker,
}

impl OutputFormat {
    /// Adjust resolve options to what this format needs
    ///
    /// Server blocks and compose files are nested by nature, so both keep
    /// child sections; compose files also tolerate unresolved references.
    pub fn apply_defaults(self, options: ResolveOptions) -> ResolveOptions {
        match self {
            OutputFormat::Caddy => options.with_include_child_sections(true),
            OutputFormat::Docker => options
                .with_include_child_sections(true)
                .with_ignore_missing(true),
            _ => options,
        }
    }

    /// Name used on the command line
    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Dotenv => "dotenv",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Bash => "bash",
            OutputFormat::Caddy => "caddy",
            OutputFormat::Docker => "docker",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dotenv" | "env" => Ok(OutputFormat::Dotenv),
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "bash" | "envs" => Ok(OutputFormat::Bash),
            "caddy" => Ok(OutputFormat::Caddy),
            "docker" => Ok(OutputFormat::Docker),
            other => Err(Error::parse(format!("Unknown output format '{}'", other))
                .with_help("Use one of: dotenv, json, yaml, bash, caddy, docker")),
        }
    }
}

/// Render `value` in `format`
///
/// `flatten` controls dotenv/bash key naming: nested tables become
/// `PARENT__CHILD` keys when set, keys are written as-is otherwise.
pub fn render(value: &Value, format: OutputFormat, flatten: bool) -> Result<String> {
    match format {
        OutputFormat::Dotenv => render_dotenv(value, flatten),
        OutputFormat::Bash => render_bash(value, flatten),
        OutputFormat::Json => render_json(value),
        OutputFormat::Yaml | OutputFormat::Docker => render_yaml(value),
        OutputFormat::Caddy => render_caddy(value),
    }
}

/// Render `KEY=value` lines
pub fn render_dotenv(value: &Value, flatten: bool) -> Result<String> {
    let mut out = String::new();
    for (key, text) in flat_entries(value, flatten)? {
        out.push_str(&format!("{}={}\n", key, text));
    }
    Ok(out)
}

/// Render a bash script exporting every key
pub fn render_bash(value: &Value, flatten: bool) -> Result<String> {
    let mut out = format!("{}\n\n", BASH_SHEBANG);
    for (key, text) in flat_entries(value, flatten)? {
        out.push_str(&format!("export {}=\"{}\"\n", key, text));
    }
    Ok(out)
}

/// Render indented JSON with a trailing newline
pub fn render_json(value: &Value) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value).map_err(|e| Error::parse(e.to_string()))?;
    out.push('\n');
    Ok(out)
}

/// Render YAML
pub fn render_yaml(value: &Value) -> Result<String> {
    serde_yaml::to_string(value).map_err(|e| Error::parse(e.to_string()))
}

fn root_mapping<'a>(value: &'a Value, format: &str) -> Result<&'a IndexMap<String, Value>> {
    value.as_mapping().ok_or_else(|| {
        Error::unsupported_type("<root>", value.type_name())
            .with_help(format!("{} output needs a table at the top level", format))
    })
}

/// Collect `(KEY, text)` pairs for the line-oriented formats
fn flat_entries(value: &Value, flatten: bool) -> Result<Vec<(String, String)>> {
    let map = root_mapping(value, "dotenv/bash")?;
    let mut entries = Vec::new();
    collect_entries("", map, flatten, &mut entries);
    Ok(entries)
}

fn collect_entries(
    prefix: &str,
    map: &IndexMap<String, Value>,
    flatten: bool,
    entries: &mut Vec<(String, String)>,
) {
    for (key, value) in map {
        if !flatten {
            entries.push((format!("{}{}", prefix, key), line_text(value)));
            continue;
        }

        let name = if prefix.is_empty() {
            key.to_uppercase()
        } else {
            format!("{}{}{}", prefix, KEY_SEPARATOR, key.to_uppercase())
        };

        match value {
            Value::Mapping(child) => collect_entries(&name, child, flatten, entries),
            other => entries.push((name, line_text(other))),
        }
    }
}

/// Text of a value on a single output line
fn line_text(value: &Value) -> String {
    match value {
        Value::Sequence(items) => items
            .iter()
            .map(line_text)
            .collect::<Vec<_>>()
            .join(","),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Render Caddyfile-style server blocks
///
/// Every top-level key names a site block and must hold a table.
pub fn render_caddy(value: &Value) -> Result<String> {
    let map = root_mapping(value, "caddy")?;
    let mut out = String::new();

    for (site, body) in map {
        let Value::Mapping(directives) = body else {
            return Err(Error::unsupported_type(site.clone(), body.type_name())
                .with_help("Every top-level key of a caddy export must be a table"));
        };

        out.push_str(&format!("{} {{\n", site));
        for (name, directive) in directives {
            write_directive(&mut out, "\t", name, directive);
        }
        out.push_str("}\n\n");
    }

    Ok(out)
}

fn write_directive(out: &mut String, indent: &str, name: &str, value: &Value) {
    match value {
        Value::Mapping(block) => write_block(out, indent, name, block),
        Value::Sequence(items) => {
            out.push_str(&format!("{}{}", indent, name));
            for item in items {
                out.push_str(&format!(" {}", item));
            }
            out.push('\n');
        }
        Value::String(s) if s.is_empty() => {
            out.push_str(&format!("{}{}\n", indent, name));
        }
        other => {
            out.push_str(&format!("{}{} {}\n", indent, name, other));
        }
    }
}

/// A block holding `_` repeats its name once per item instead of nesting
fn write_block(out: &mut String, indent: &str, name: &str, block: &IndexMap<String, Value>) {
    if let Some(repeated) = block.get("_") {
        match repeated {
            Value::Sequence(items) => {
                out.push('\n');
                for item in items {
                    out.push_str(&format!("{}{} {}\n", indent, name, item));
                }
                out.push('\n');
            }
            other => {
                out.push_str(&format!(
                    "{}\t# unexpected '_' type: {}\n",
                    indent,
                    other.type_name()
                ));
            }
        }
        return;
    }

    let inner = format!("{}\t", indent);
    out.push_str(&format!("{}{} {{\n", indent, name));
    for (directive, value) in block {
        write_directive(out, &inner, directive, value);
    }
    out.push_str(&format!("{}}}\n", indent));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(source: &str) -> Value {
        Value::from(toml::from_str::<toml::Value>(source).unwrap())
    }

    #[test]
    fn test_format_names_round_trip() {
        for format in [
            OutputFormat::Dotenv,
            OutputFormat::Json,
            OutputFormat::Yaml,
            OutputFormat::Bash,
            OutputFormat::Caddy,
            OutputFormat::Docker,
        ] {
            assert_eq!(format.name().parse::<OutputFormat>().unwrap(), format);
        }
        assert_eq!("envs".parse::<OutputFormat>().unwrap(), OutputFormat::Bash);
        assert!("toml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_format_defaults() {
        let caddy = OutputFormat::Caddy.apply_defaults(ResolveOptions::default());
        assert!(caddy.include_child_sections);
        assert!(!caddy.ignore_missing);

        let docker = OutputFormat::Docker.apply_defaults(ResolveOptions::default());
        assert!(docker.include_child_sections);
        assert!(docker.ignore_missing);

        let json = OutputFormat::Json.apply_defaults(ResolveOptions::default());
        assert!(!json.include_child_sections);
    }

    #[test]
    fn test_dotenv_shallow() {
        let value = doc(
            r#"
URL = "x:8080"
port = 80
ratio = 2.0
list = ["a", 1]
"#,
        );
        assert_eq!(
            render_dotenv(&value, false).unwrap(),
            "URL=x:8080\nport=80\nratio=2\nlist=a,1\n"
        );
    }

    #[test]
    fn test_dotenv_flattened() {
        let value = doc(
            r#"
name = "svc"

[db]
host = "h"

[db.pool]
size = 4
"#,
        );
        assert_eq!(
            render_dotenv(&value, true).unwrap(),
            "NAME=svc\nDB__HOST=h\nDB__POOL__SIZE=4\n"
        );
    }

    #[test]
    fn test_bash() {
        let value = doc(
            r#"
name = "svc"

[db]
host = "h"
"#,
        );
        assert_eq!(
            render_bash(&value, true).unwrap(),
            "#!/bin/bash\n\nexport NAME=\"svc\"\nexport DB__HOST=\"h\"\n"
        );
    }

    #[test]
    fn test_json() {
        let value = doc(
            r#"
a = "x"
n = 1.5
"#,
        );
        assert_eq!(
            render_json(&value).unwrap(),
            "{\n  \"a\": \"x\",\n  \"n\": 1.5\n}\n"
        );
    }

    #[test]
    fn test_yaml() {
        let value = doc(
            r#"
a = "x"

[b]
c = true
"#,
        );
        assert_eq!(render_yaml(&value).unwrap(), "a: x\nb:\n  c: true\n");
    }

    #[test]
    fn test_caddy() {
        let value = doc(
            r#"
["example.com"]
encode = "gzip"
file_server = ""
try_files = ["{path}", "/index.html"]

["example.com".reverse_proxy]
to = "localhost:8080"

["example.com".header]
_ = ["-Server", "X-Frame-Options DENY"]
"#,
        );
        let expected = "example.com {\n\
                        \tencode gzip\n\
                        \tfile_server\n\
                        \ttry_files {path} /index.html\n\
                        \treverse_proxy {\n\
                        \t\tto localhost:8080\n\
                        \t}\n\
                        \n\
                        \theader -Server\n\
                        \theader X-Frame-Options DENY\n\
                        \n\
                        }\n\n";
        assert_eq!(render_caddy(&value).unwrap(), expected);
    }

    #[test]
    fn test_caddy_unexpected_underscore() {
        let value = doc(
            r#"
[site.log]
_ = "oops"
"#,
        );
        assert_eq!(
            render_caddy(&value).unwrap(),
            "site {\n\t\t# unexpected '_' type: string\n}\n\n"
        );
    }

    #[test]
    fn test_caddy_rejects_top_level_scalar() {
        let value = doc(r#"site = "x""#);
        assert!(render_caddy(&value).is_err());
    }

    #[test]
    fn test_render_dispatch() {
        let value = doc(r#"a = "x""#);
        assert_eq!(render(&value, OutputFormat::Dotenv, false).unwrap(), "a=x\n");
        assert_eq!(
            render(&value, OutputFormat::Docker, true).unwrap(),
            render(&value, OutputFormat::Yaml, true).unwrap()
        );
    }
}
