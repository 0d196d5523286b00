//! # docset-core
//!
//! Core types for the docset document set validator.
//!
//! This crate defines the per-document building blocks used by the other
//! docset crates:
//! - [`Document`] and [`SourceFile`]: one parsed input file and its raw form
//! - Front-matter parsing ([`frontmatter`])
//! - Schema rules and their compiled form ([`SchemaRule`], [`SchemaConfig`], [`Schema`])
//! - Front-matter validation ([`validate`])
//! - Link extraction and resolution ([`link`])
//! - Findings ([`Finding`], [`FindingCode`], [`Severity`])
//! - Error hierarchy ([`DocsetError`], [`ParseError`], [`ConfigError`])

pub mod document;
pub mod error;
pub mod finding;
pub mod fingerprint;
pub mod frontmatter;
pub mod link;
pub mod schema;
pub mod validate;

pub use document::{Document, SourceFile};
pub use error::{ConfigError, DocsetError, ParseError, Result};
pub use finding::{Finding, FindingCode, Severity};
pub use frontmatter::FrontMatter;
pub use link::{Edge, LinkOptions, RawLink, Resolution};
pub use schema::{FieldType, Schema, SchemaConfig, SchemaRule};
pub use validate::validate_front_matter;
