use super::{decode_unified, DecodedConfig};
use crate::format::{parse_document, strip_bom, Capabilities, Format};
use crate::DevstrapError;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Read a text file, `None` if it does not exist. A leading BOM is dropped.
///
/// # Errors
///
/// Returns `DevstrapError::Io` if the file exists but cannot be read.
pub fn read_text<P: AsRef<Path>>(path: P) -> Result<Option<String>, DevstrapError> {
    let path_ref = path.as_ref();

    if !path_ref.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path_ref)?;
    Ok(Some(strip_bom(&content).to_string()))
}

/// Read and parse a structured document, `None` if the file does not exist.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The content is not valid `format`
pub fn read_document<P: AsRef<Path>>(
    path: P,
    format: Format,
) -> Result<Option<Value>, DevstrapError> {
    let path_ref = path.as_ref();
    read_text(path_ref)?
        .map(|content| parse_document(format, &content, path_ref))
        .transpose()
}

/// Load the unified server list.
///
/// A missing file is an empty configuration, not an error; callers decide whether
/// migration is needed. The format follows the file extension (YAML when unknown).
///
/// # Errors
///
/// Returns an error if:
/// - The processor for the file's format is unavailable
/// - The file cannot be read or parsed
/// - The document root or `servers` key has the wrong shape
pub fn load_unified<P: AsRef<Path>>(
    path: P,
    capabilities: Capabilities,
) -> Result<DecodedConfig, DevstrapError> {
    let path_ref = path.as_ref();

    if !path_ref.exists() {
        debug!("No unified config at {}", path_ref.display());
        return Ok(DecodedConfig::default());
    }

    let format = Format::from_path(path_ref).unwrap_or(Format::Yaml);
    capabilities.require(format, "loading the unified server list")?;

    let document = read_document(path_ref, format)?.unwrap_or(Value::Null);
    let decoded = decode_unified(&document, path_ref)?;

    debug!("Loaded {} server(s) from {}", decoded.config.len(), path_ref.display());
    for issue in &decoded.issues {
        warn!("Skipping entry: {issue}");
    }

    Ok(decoded)
}
