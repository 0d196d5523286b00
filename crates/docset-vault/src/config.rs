//! Schema file loading.

use std::fs;
use std::path::Path;

use docset_core::{ConfigError, Result, SchemaConfig};
use tracing::debug;

/// Load a schema file, choosing the format from its extension.
///
/// `.yaml` and `.yml` are read as YAML, `.json` as JSON, `.toml` as TOML.
///
/// # Errors
///
/// Returns [`DocsetError::Io`](docset_core::DocsetError::Io) if the file
/// cannot be read and [`DocsetError::Config`](docset_core::DocsetError::Config)
/// if its format is unsupported or its content malformed.
pub fn load_schema(path: &Path) -> Result<SchemaConfig> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let parse: fn(&str) -> std::result::Result<SchemaConfig, ConfigError> = match ext.as_str() {
        "yaml" | "yml" => SchemaConfig::from_yaml_str,
        "json" => SchemaConfig::from_json_str,
        "toml" => SchemaConfig::from_toml_str,
        _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string()).into()),
    };

    let text = fs::read_to_string(path)?;
    let config = parse(&text)?;
    debug!(path = %path.display(), rules = config.fields.len(), "schema loaded");
    Ok(config)
}
