//! `${...}` interpolation
//!
//! A span runs from `${` to the first following `}`; spans do not nest.
//! Each span is resolved independently and its textual form substituted in
//! place. A resolved string that contains further spans is interpolated
//! before substitution, which is how one variable refers to another.
//!
//! References are always resolved against the document root, never against
//! the section being exported.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::resolver::{resolve_reference, Reference, ResolveOptions, ENV_PREFIX};
use crate::value::Value;

fn reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("reference pattern is valid"))
}

/// Check if a string contains any `${...}` span
pub fn contains_interpolation(input: &str) -> bool {
    reference_regex().is_match(input)
}

/// A `${...}` span found in a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span<'a> {
    /// Byte offset of `$`
    pub start: usize,
    /// Byte offset just past `}`
    pub end: usize,
    /// The whole `${...}` text
    pub literal: &'a str,
    /// The text between the braces
    pub inner: &'a str,
}

/// Find every `${...}` span in `input`, left to right
pub fn find_spans(input: &str) -> Vec<Span<'_>> {
    reference_regex()
        .captures_iter(input)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let inner = caps.get(1)?;
            Some(Span {
                start: whole.start(),
                end: whole.end(),
                literal: whole.as_str(),
                inner: inner.as_str(),
            })
        })
        .collect()
}

/// Resolves references inside strings and value trees
pub struct Interpolator<'a> {
    root: &'a Value,
    options: &'a ResolveOptions,
}

impl<'a> Interpolator<'a> {
    /// Create an interpolator resolving against `root`
    pub fn new(root: &'a Value, options: &'a ResolveOptions) -> Self {
        Self { root, options }
    }

    /// Interpolate every span in `text`
    pub fn interpolate(&self, text: &str) -> Result<String> {
        let mut resolution_stack = Vec::new();
        self.interpolate_with_stack(text, &mut resolution_stack)
    }

    /// Resolve every string leaf of a value tree
    ///
    /// Strings are interpolated, string items of sequences are interpolated,
    /// nested mappings are resolved recursively, everything else is copied.
    pub fn resolve_value(&self, value: &Value) -> Result<Value> {
        match value {
            Value::String(s) => Ok(Value::String(self.interpolate(s)?)),
            Value::Sequence(seq) => seq
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(Value::String(self.interpolate(s)?)),
                    other => Ok(other.clone()),
                })
                .collect::<Result<Vec<_>>>()
                .map(Value::Sequence),
            Value::Mapping(map) => {
                let mut resolved = indexmap::IndexMap::with_capacity(map.len());
                for (key, val) in map {
                    resolved.insert(key.clone(), self.resolve_value(val)?);
                }
                Ok(Value::Mapping(resolved))
            }
            _ => Ok(value.clone()),
        }
    }

    fn interpolate_with_stack(
        &self,
        text: &str,
        resolution_stack: &mut Vec<String>,
    ) -> Result<String> {
        let spans = find_spans(text);
        if spans.is_empty() {
            return Ok(text.to_string());
        }

        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for span in spans {
            out.push_str(&text[last..span.start]);
            out.push_str(&self.resolve_span(&span, resolution_stack)?);
            last = span.end;
        }
        out.push_str(&text[last..]);

        Ok(out)
    }

    fn resolve_span(&self, span: &Span<'_>, resolution_stack: &mut Vec<String>) -> Result<String> {
        let reference = Reference::parse(span.inner);
        let key = stack_key(&reference);

        if let Some(key) = &key {
            if resolution_stack.contains(key) {
                let mut chain = resolution_stack.clone();
                chain.push(key.clone());
                return Err(Error::circular_reference(key.clone(), chain));
            }
        }

        let value = match resolve_reference(self.root, &reference, self.options) {
            Ok(value) => value,
            Err(e) if self.options.ignore_missing && e.is_missing_reference() => {
                log::warn!("Error resolving variable '{}': {}", span.inner, e.kind);
                return Ok(span.literal.to_string());
            }
            Err(e) => return Err(e),
        };

        match value {
            Value::String(s) => match key {
                Some(key) => {
                    resolution_stack.push(key);
                    let result = self.interpolate_with_stack(&s, resolution_stack);
                    resolution_stack.pop();
                    result
                }
                None => self.interpolate_with_stack(&s, resolution_stack),
            },
            other => other
                .to_scalar_text()
                .map_err(|e| e.with_path(span.inner)),
        }
    }
}

/// Name a reference is tracked under while its value is being expanded
///
/// Shell output is not tracked; it is produced fresh on every run.
fn stack_key(reference: &Reference) -> Option<String> {
    match reference {
        Reference::Path(path) => Some(path.clone()),
        Reference::Env(name) => Some(format!("{}.{}", ENV_PREFIX, name)),
        Reference::Shell(_) => None,
    }
}

/// Interpolate `text` against `root`
pub fn interpolate(root: &Value, text: &str, options: &ResolveOptions) -> Result<String> {
    Interpolator::new(root, options).interpolate(text)
}
