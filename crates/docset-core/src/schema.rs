//! Schema rule definitions for front-matter contracts.
//!
//! A [`SchemaConfig`] is what a schema file deserializes into. It is checked
//! and compiled once into a [`Schema`], which the validator and the link
//! resolver read from for the rest of the run.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::ConfigError;
use crate::link::LinkOptions;

/// Constraints for one front-matter field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaRule {
    pub key: String,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// For enum types: allowed values.
    #[serde(
        default,
        alias = "allowedValues",
        skip_serializing_if = "Option::is_none"
    )]
    pub allowed_values: Option<Vec<String>>,
    /// Maximum length in characters, for string and stringArray fields.
    #[serde(default, alias = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Regular expression that string values must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SchemaRule {
    /// A rule with no constraints beyond its type.
    pub fn new(key: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            key: key.into(),
            required: false,
            field_type,
            allowed_values: None,
            max_length: None,
            pattern: None,
            description: None,
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    #[must_use]
    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }
}

/// Supported front-matter field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    String,
    #[serde(alias = "string[]")]
    StringArray,
    Enum,
    Integer,
    Boolean,
}

impl FieldType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::StringArray => "stringArray",
            Self::Enum => "enum",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }

    fn is_textual(self) -> bool {
        matches!(self, Self::String | Self::StringArray)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A schema file: field rules plus scan settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    #[serde(default)]
    pub fields: Vec<SchemaRule>,
    /// Document paths exempt from orphan reporting.
    #[serde(default = "default_entry_points", alias = "entryPoints")]
    pub entry_points: Vec<String>,
    /// File names that act as the implicit document of a linked directory.
    #[serde(default = "default_index_names", alias = "indexNames")]
    pub index_names: Vec<String>,
    /// Document-like extensions, without the leading dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_detect_duplicates", alias = "detectDuplicates")]
    pub detect_duplicates: bool,
}

fn default_entry_points() -> Vec<String> {
    vec!["README.md".to_string(), "index.md".to_string()]
}

fn default_index_names() -> Vec<String> {
    vec!["README.md".to_string(), "index.md".to_string()]
}

fn default_extensions() -> Vec<String> {
    vec!["md".to_string(), "markdown".to_string(), "mdx".to_string()]
}

fn default_detect_duplicates() -> bool {
    true
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            entry_points: default_entry_points(),
            index_names: default_index_names(),
            extensions: default_extensions(),
            detect_duplicates: default_detect_duplicates(),
        }
    }
}

impl SchemaConfig {
    /// A configuration with the given rules and default settings.
    #[must_use]
    pub fn with_rules(fields: Vec<SchemaRule>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not a valid schema document.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not a valid schema document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not a valid schema document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check the configuration and compile it into a [`Schema`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first malformed rule or setting.
    pub fn compile(self) -> Result<Schema, ConfigError> {
        Schema::new(self)
    }
}

/// A rule together with its compiled pattern.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: SchemaRule,
    pub pattern: Option<Regex>,
}

/// A checked schema, ready for validation. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct Schema {
    rules: Vec<CompiledRule>,
    entry_points: Vec<String>,
    link_options: LinkOptions,
    detect_duplicates: bool,
}

impl Default for Schema {
    fn default() -> Self {
        let config = SchemaConfig::default();
        Self {
            rules: Vec::new(),
            entry_points: config.entry_points,
            link_options: LinkOptions::new(config.extensions, config.index_names),
            detect_duplicates: config.detect_duplicates,
        }
    }
}

impl Schema {
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first malformed rule or setting.
    pub fn new(config: SchemaConfig) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(config.fields.len());

        for rule in config.fields {
            rules.push(compile_rule(rule, &mut seen)?);
        }

        if config.extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(ConfigError::NoExtensions);
        }

        Ok(Self {
            rules,
            entry_points: config.entry_points,
            link_options: LinkOptions::new(config.extensions, config.index_names),
            detect_duplicates: config.detect_duplicates,
        })
    }

    /// Compile a bare rule list with default settings.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first malformed rule.
    pub fn from_rules(rules: Vec<SchemaRule>) -> Result<Self, ConfigError> {
        Self::new(SchemaConfig::with_rules(rules))
    }

    #[must_use]
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    #[must_use]
    pub fn rule(&self, key: &str) -> Option<&CompiledRule> {
        self.rules.iter().find(|r| r.rule.key == key)
    }

    #[must_use]
    pub fn entry_points(&self) -> &[String] {
        &self.entry_points
    }

    #[must_use]
    pub fn link_options(&self) -> &LinkOptions {
        &self.link_options
    }

    #[must_use]
    pub fn extensions(&self) -> &[String] {
        self.link_options.extensions()
    }

    #[must_use]
    pub fn detect_duplicates(&self) -> bool {
        self.detect_duplicates
    }
}

fn compile_rule(rule: SchemaRule, seen: &mut HashSet<String>) -> Result<CompiledRule, ConfigError> {
    if rule.key.trim().is_empty() {
        return Err(ConfigError::EmptyKey);
    }
    if !seen.insert(rule.key.clone()) {
        return Err(ConfigError::DuplicateField(rule.key));
    }

    match (&rule.allowed_values, rule.field_type) {
        (None, FieldType::Enum) => return Err(ConfigError::EmptyEnum(rule.key)),
        (Some(values), FieldType::Enum) if values.is_empty() => {
            return Err(ConfigError::EmptyEnum(rule.key))
        }
        (Some(_), other) if other != FieldType::Enum => {
            return Err(ConfigError::UnexpectedAllowedValues {
                field: rule.key,
                field_type: other.to_string(),
            })
        }
        _ => {}
    }

    if let Some(max) = rule.max_length {
        if !rule.field_type.is_textual() {
            return Err(ConfigError::UnsupportedConstraint {
                field: rule.key,
                field_type: rule.field_type.to_string(),
                constraint: "max_length".to_string(),
            });
        }
        if max == 0 {
            return Err(ConfigError::ZeroMaxLength(rule.key));
        }
    }

    let pattern = match &rule.pattern {
        Some(_) if !rule.field_type.is_textual() => {
            return Err(ConfigError::UnsupportedConstraint {
                field: rule.key,
                field_type: rule.field_type.to_string(),
                constraint: "pattern".to_string(),
            })
        }
        Some(source) => Some(Regex::new(source).map_err(|e| ConfigError::InvalidPattern {
            field: rule.key.clone(),
            message: e.to_string(),
        })?),
        None => None,
    };

    Ok(CompiledRule { rule, pattern })
}
