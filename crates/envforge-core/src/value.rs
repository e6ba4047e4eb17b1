//! Configuration value types
//!
//! Represents the parsed document tree. Values can be scalars
//! (string, int, float, bool, null), sequences (arrays), or mappings (tables).

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

use crate::error::{Error, Result};

/// A node of the document tree
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(untagged)]
pub enum Value {
    /// Null value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// String value (may contain references like ${globals.HOST})
    String(String),
    /// Sequence of values
    Sequence(Vec<Value>),
    /// Mapping of string keys to values
    Mapping(IndexMap<String, Value>),
}

impl Value {
    /// Check if this value is a mapping
    pub fn is_mapping(&self) -> bool {
        matches!(self, Value::Mapping(_))
    }

    /// Get as boolean if this is a Bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float or Integer
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as str if this is a String
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as slice if this is a Sequence
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// Get as mapping if this is a Mapping
    pub fn as_mapping(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Get a value by dotted path (e.g., "database.host")
    ///
    /// Every segment addresses a mapping key; sequences cannot be indexed.
    /// The error names the segment that failed and carries the full path.
    pub fn get_path(&self, path: &str) -> Result<&Value> {
        if path.is_empty() {
            return Ok(self);
        }

        let mut current = self;

        for segment in path.split('.') {
            current = match current {
                Value::Mapping(map) => map
                    .get(segment)
                    .ok_or_else(|| Error::not_found(segment, path))?,
                _ => return Err(Error::not_an_object(segment, path)),
            };
        }

        Ok(current)
    }

    /// Returns the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }

    /// Coerce a primitive into its textual form
    ///
    /// Strings are returned verbatim, numbers in decimal with a zero
    /// fraction dropped (`3.0` → `3`), booleans as `true`/`false`.
    /// Compound values and null have no scalar form.
    pub fn to_scalar_text(&self) -> Result<String> {
        match self {
            Value::String(s) => Ok(s.clone()),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(format_float(*f)),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Null | Value::Sequence(_) | Value::Mapping(_) => {
                Err(Error::unsupported_type(String::new(), self.type_name()))
            }
        }
    }
}

/// Render a float without a trailing zero fraction
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", format_float(*n)),
            Value::String(s) => write!(f, "{}", s),
            Value::Sequence(seq) => {
                write!(f, "[")?;
                for (i, v) in seq.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Mapping(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<toml::Value> for Value {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Integer(i),
            toml::Value::Float(f) => Value::Float(f),
            toml::Value::Boolean(b) => Value::Bool(b),
            // Datetimes have no counterpart in the tree; keep their TOML text
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            toml::Value::Table(table) => Value::Mapping(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

// Convenient From implementations
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Sequence(v.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(m: IndexMap<String, Value>) -> Self {
        Value::Mapping(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn sample() -> Value {
        let mut db = IndexMap::new();
        db.insert("host".into(), Value::String("localhost".into()));
        db.insert("port".into(), Value::Integer(5432));
        let mut map = IndexMap::new();
        map.insert("database".into(), Value::Mapping(db));
        map.insert("name".into(), Value::String("app".into()));
        Value::Mapping(map)
    }

    #[test]
    fn test_value_get_path() {
        let value = sample();

        assert_eq!(
            value.get_path("database.host").unwrap().as_str(),
            Some("localhost")
        );
        assert_eq!(
            value.get_path("database.port").unwrap().as_i64(),
            Some(5432)
        );
        assert!(value.get_path("database").unwrap().is_mapping());
    }

    #[test]
    fn test_value_get_path_not_found_names_segment() {
        let err = sample().get_path("database.user").unwrap_err();

        assert_eq!(
            err.kind,
            ErrorKind::NotFound {
                segment: "user".into()
            }
        );
        assert_eq!(err.path, Some("database.user".into()));
    }

    #[test]
    fn test_value_get_path_through_scalar() {
        let err = sample().get_path("name.first").unwrap_err();

        assert_eq!(
            err.kind,
            ErrorKind::NotAnObject {
                segment: "first".into()
            }
        );
    }

    #[test]
    fn test_value_get_path_does_not_index_sequences() {
        let mut map = IndexMap::new();
        map.insert("servers".into(), Value::from(vec!["a", "b"]));
        let value = Value::Mapping(map);

        assert!(value.get_path("servers.0").is_err());
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(Value::from("x").to_scalar_text().unwrap(), "x");
        assert_eq!(Value::Integer(8080).to_scalar_text().unwrap(), "8080");
        assert_eq!(Value::Float(3.0).to_scalar_text().unwrap(), "3");
        assert_eq!(Value::Float(3.5).to_scalar_text().unwrap(), "3.5");
        assert_eq!(Value::Float(-0.25).to_scalar_text().unwrap(), "-0.25");
        assert_eq!(Value::Bool(false).to_scalar_text().unwrap(), "false");
    }

    #[test]
    fn test_scalar_text_rejects_compound_values() {
        let err = sample().to_scalar_text().unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::UnsupportedType {
                type_name: "mapping".into()
            }
        );
        assert!(Value::from(vec![1i64, 2]).to_scalar_text().is_err());
        assert!(Value::Null.to_scalar_text().is_err());
    }

    #[test]
    fn test_from_toml_preserves_document_order() {
        let parsed: toml::Value = toml::from_str(
            r#"
zeta = 1
alpha = "a"
when = 1979-05-27T07:32:00Z

[nested]
flag = true
ratio = 0.5
list = ["x", 2]
"#,
        )
        .unwrap();
        let value = Value::from(parsed);

        let keys: Vec<_> = value.as_mapping().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "when", "nested"]);
        assert_eq!(
            value.get_path("when").unwrap().as_str(),
            Some("1979-05-27T07:32:00Z")
        );
        assert_eq!(value.get_path("nested.flag").unwrap().as_bool(), Some(true));
        assert_eq!(value.get_path("nested.ratio").unwrap().as_f64(), Some(0.5));
        assert_eq!(
            value.get_path("nested.list").unwrap().as_sequence().unwrap().len(),
            2
        );
    }
}
