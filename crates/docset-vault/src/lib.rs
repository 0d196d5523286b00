//! # docset-vault
//!
//! File system side of docset. The validator itself never touches the
//! disk; this crate turns a root directory into `(path, text)` inputs,
//! loads schema files, and watches for changes in watch mode.

pub mod config;
pub mod discover;
pub mod watcher;

pub use config::load_schema;
pub use discover::{discover, has_document_extension, relative_path};
pub use watcher::{VaultEvent, VaultWatcher};
