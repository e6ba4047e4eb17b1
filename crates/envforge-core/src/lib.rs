//! envforge-core: variable resolution for templated TOML configuration
//!
//! This crate loads a master TOML document (with `#!import` directives),
//! selects a section of it, resolves `${...}` references against the whole
//! document and renders the result as dotenv, bash, JSON, YAML or server
//! blocks.
//!
//! # Example
//!
//! ```rust
//! use envforge_core::{Document, OutputFormat, ResolveOptions};
//!
//! let toml = r#"
//! [globals]
//! HOST = "x"
//!
//! [svc]
//! URL = "${globals.HOST}:8080"
//! "#;
//!
//! let doc = Document::from_toml_str(toml).unwrap();
//! let out = doc
//!     .render("svc", OutputFormat::Dotenv, &ResolveOptions::default())
//!     .unwrap();
//! assert_eq!(out, "URL=x:8080\n");
//! ```

pub mod error;
pub mod import;
pub mod interpolation;
pub mod render;
pub mod resolver;
pub mod section;
pub mod value;

mod document;

pub use document::Document;
pub use error::{Error, ErrorKind, Result};
pub use interpolation::{interpolate, Interpolator};
pub use render::OutputFormat;
pub use resolver::{resolve_variable, Reference, ResolveOptions};
pub use section::project;
pub use value::Value;
