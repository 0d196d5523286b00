//! Error types for docset.

use thiserror::Error;

/// Top-level result type for docset operations.
pub type Result<T> = std::result::Result<T, DocsetError>;

/// Top-level error type for docset.
#[derive(Debug, Error)]
pub enum DocsetError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("vault error: {0}")]
    Vault(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A document's front-matter could not be read. Fatal for that document only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{path}:{line}: front-matter opened with '---' but never closed")]
    Unterminated { path: String, line: usize },

    #[error("{path}:{line}: invalid front-matter: {message}")]
    InvalidYaml {
        path: String,
        line: usize,
        message: String,
    },

    #[error("{path}:{line}: front-matter must be a mapping of keys to values, found {found}")]
    NotAMapping {
        path: String,
        line: usize,
        found: String,
    },
}

impl ParseError {
    /// Path of the document that failed to parse.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Unterminated { path, .. }
            | Self::InvalidYaml { path, .. }
            | Self::NotAMapping { path, .. } => path,
        }
    }

    /// 1-based line the problem was detected on.
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Self::Unterminated { line, .. }
            | Self::InvalidYaml { line, .. }
            | Self::NotAMapping { line, .. } => *line,
        }
    }

    /// The message without the `path:line:` prefix, for use in findings.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::Unterminated { .. } => {
                "front-matter opened with '---' but never closed".to_string()
            }
            Self::InvalidYaml { message, .. } => format!("invalid front-matter: {message}"),
            Self::NotAMapping { found, .. } => {
                format!("front-matter must be a mapping of keys to values, found {found}")
            }
        }
    }
}

/// Malformed schema configuration. Aborts the whole run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("schema parse error: {0}")]
    Parse(String),

    #[error("unsupported schema format '{0}': expected .yaml, .yml, .json or .toml")]
    UnsupportedFormat(String),

    #[error("schema rule has an empty key")]
    EmptyKey,

    #[error("duplicate rule for field '{0}'")]
    DuplicateField(String),

    #[error("enum field '{0}' declares no allowed values")]
    EmptyEnum(String),

    #[error("field '{field}' has type {field_type} and cannot declare allowed values")]
    UnexpectedAllowedValues { field: String, field_type: String },

    #[error("field '{field}' has type {field_type} and cannot declare {constraint}")]
    UnsupportedConstraint {
        field: String,
        field_type: String,
        constraint: String,
    },

    #[error("field '{0}' declares a max_length of 0")]
    ZeroMaxLength(String),

    #[error("invalid pattern for field '{field}': {message}")]
    InvalidPattern { field: String, message: String },

    #[error("extension list must not be empty")]
    NoExtensions,
}
