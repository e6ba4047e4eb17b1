//! Error types for envforge
//!
//! Errors are structured: a kind, the config path or reference that
//! triggered it, an optional cause and an actionable help message.
//! Nothing in the core terminates the process; the CLI decides the exit code.

use std::fmt;

/// Result type alias for envforge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for envforge operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Path or reference where the error occurred (e.g., "svc.URL")
    pub path: Option<String>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    /// Malformed document
    #[error("Parse error")]
    Parse,
    /// Unreadable input, import or output file
    #[error("I/O error")]
    Io,
    /// A path segment names a key that does not exist
    #[error("Key '{segment}' not found")]
    NotFound { segment: String },
    /// A path segment addresses something that is not a mapping
    #[error("Path '{segment}' is not an object")]
    NotAnObject { segment: String },
    /// A reference resolved to a value that has no scalar text form
    #[error("Unsupported value type: {type_name}")]
    UnsupportedType { type_name: String },
    /// A shell reference could not be executed or exited non-zero
    #[error("Shell command failed")]
    ShellExecutionFailed,
    /// The requested section does not exist
    #[error("Section '{section}' not found")]
    SectionNotFound { section: String },
    /// The requested section is not a mapping
    #[error("Section '{section}' is not an object")]
    SectionNotAnObject { section: String },
    /// A chain of references loops back on itself
    #[error("Circular reference detected")]
    CircularReference,
    /// A chain of imports loops back on itself
    #[error("Circular import detected")]
    CircularImport,
}

impl Error {
    fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            path: None,
            help: None,
            cause: None,
        }
    }

    /// Create a new parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            cause: Some(message.into()),
            ..Self::new(ErrorKind::Parse)
        }
    }

    /// Create an I/O error for a file that could not be read or written
    pub fn io(file: impl Into<String>, err: &std::io::Error) -> Self {
        Self {
            path: Some(file.into()),
            cause: Some(err.to_string()),
            ..Self::new(ErrorKind::Io)
        }
    }

    /// Create a missing key error
    pub fn not_found(segment: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            help: Some(format!("Check that '{}' exists in the configuration", path)),
            path: Some(path),
            ..Self::new(ErrorKind::NotFound {
                segment: segment.into(),
            })
        }
    }

    /// Create an error for a segment that walks into a non-mapping value
    pub fn not_an_object(segment: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            help: Some("Only table keys can be addressed with dotted paths".into()),
            ..Self::new(ErrorKind::NotAnObject {
                segment: segment.into(),
            })
        }
    }

    /// Create an error for a reference that does not resolve to a primitive
    pub fn unsupported_type(path: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            help: Some("References must point at a string, number or boolean".into()),
            ..Self::new(ErrorKind::UnsupportedType {
                type_name: type_name.into(),
            })
        }
    }

    /// Create a shell execution failure
    pub fn shell_failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: Some(command.into()),
            cause: Some(message.into()),
            ..Self::new(ErrorKind::ShellExecutionFailed)
        }
    }

    /// Create a section not found error
    pub fn section_not_found(section: impl Into<String>) -> Self {
        Self::new(ErrorKind::SectionNotFound {
            section: section.into(),
        })
    }

    /// Create an error for a section that is not a table
    pub fn section_not_an_object(section: impl Into<String>) -> Self {
        Self {
            help: Some("Select a table, not an individual value".into()),
            ..Self::new(ErrorKind::SectionNotAnObject {
                section: section.into(),
            })
        }
    }

    /// Create a circular reference error
    pub fn circular_reference(path: impl Into<String>, chain: Vec<String>) -> Self {
        Self {
            path: Some(path.into()),
            help: Some("Break the circular dependency by removing one of the references".into()),
            cause: Some(format!("Chain: {}", chain.join(" → "))),
            ..Self::new(ErrorKind::CircularReference)
        }
    }

    /// Create a circular import error
    pub fn circular_import(file: impl Into<String>, chain: Vec<String>) -> Self {
        Self {
            path: Some(file.into()),
            help: Some("Remove one of the #!import directives in the chain".into()),
            cause: Some(format!("Chain: {}", chain.join(" → "))),
            ..Self::new(ErrorKind::CircularImport)
        }
    }

    /// Add path context to the error
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Whether tolerant mode may substitute the literal placeholder for this error
    pub fn is_missing_reference(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::NotFound { .. } | ErrorKind::NotAnObject { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if let Some(path) = &self.path {
            write!(f, "\n  Path: {}", path)?;
        }

        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}
