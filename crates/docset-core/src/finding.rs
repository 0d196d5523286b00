//! Findings: reportable issues attached to a scanned document.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How serious a finding is. Ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    /// True when `self` is as severe as `threshold` or more.
    #[must_use]
    pub fn is_at_least(self, threshold: Severity) -> bool {
        self <= threshold
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finding taxonomy.
///
/// Variants are declared in alphabetical order of their code names, so the
/// derived `Ord` sorts findings by code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingCode {
    BrokenLink,
    DuplicateDocument,
    FieldTooLong,
    InvalidEnumValue,
    MissingRequiredField,
    OrphanDocument,
    PatternMismatch,
    ReferenceCycle,
    TypeMismatch,
    UnknownField,
    UnparseableDocument,
}

impl FindingCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BrokenLink => "BROKEN_LINK",
            Self::DuplicateDocument => "DUPLICATE_DOCUMENT",
            Self::FieldTooLong => "FIELD_TOO_LONG",
            Self::InvalidEnumValue => "INVALID_ENUM_VALUE",
            Self::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            Self::OrphanDocument => "ORPHAN_DOCUMENT",
            Self::PatternMismatch => "PATTERN_MISMATCH",
            Self::ReferenceCycle => "REFERENCE_CYCLE",
            Self::TypeMismatch => "TYPE_MISMATCH",
            Self::UnknownField => "UNKNOWN_FIELD",
            Self::UnparseableDocument => "UNPARSEABLE_DOCUMENT",
        }
    }

    /// Every code has exactly one severity.
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Self::UnparseableDocument
            | Self::MissingRequiredField
            | Self::TypeMismatch
            | Self::InvalidEnumValue
            | Self::FieldTooLong
            | Self::PatternMismatch => Severity::Error,
            Self::UnknownField
            | Self::BrokenLink
            | Self::ReferenceCycle
            | Self::DuplicateDocument => Severity::Warning,
            Self::OrphanDocument => Severity::Info,
        }
    }
}

impl fmt::Display for FindingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reportable issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub document_path: String,
    pub severity: Severity,
    pub code: FindingCode,
    pub message: String,
    /// 1-based line in the document, when the issue has a location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Finding {
    /// Create a finding with the code's severity.
    pub fn new(
        document_path: impl Into<String>,
        code: FindingCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            document_path: document_path.into(),
            severity: code.severity(),
            code,
            message: message.into(),
            line: None,
        }
    }

    #[must_use]
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Sort key used for deterministic output: path, then code, then message.
    pub(crate) fn path_code_key(&self) -> (&str, FindingCode, &str) {
        (&self.document_path, self.code, &self.message)
    }
}
