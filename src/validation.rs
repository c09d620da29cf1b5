use crate::agent::Agent;
use crate::config::{decode_unified, reader, scalar_to_string, DecodedConfig};
use crate::format::{Capabilities, Format};
use crate::DevstrapError;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Entries that will not be loaded.
    pub errors: Vec<String>,
    /// Entries that load but may not do what was intended.
    pub warnings: Vec<String>,
    pub servers: usize,
}

impl ValidationResult {
    pub fn passed(&self, strict: bool) -> bool {
        self.errors.is_empty() && (!strict || self.warnings.is_empty())
    }
}

/// Check the unified server list without touching any host file.
///
/// # Errors
///
/// Returns an error if:
/// - The processor for the file's format is unavailable
/// - The file is missing, unreadable, or not valid for its format
/// - The document root or `servers` key has the wrong shape
pub fn validate_unified<P: AsRef<Path>>(
    path: P,
    capabilities: Capabilities,
) -> Result<ValidationResult, DevstrapError> {
    let path_ref = path.as_ref();
    let format = Format::from_path(path_ref).unwrap_or(Format::Yaml);
    capabilities.require(format, "validation")?;

    let document = reader::read_document(path_ref, format)?.ok_or_else(|| {
        DevstrapError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path_ref.display()),
        ))
    })?;
    let decoded = decode_unified(&document, path_ref)?;

    let mut result = ValidationResult { servers: decoded.config.len(), ..Default::default() };
    result.errors.extend(decoded.issues.iter().map(ToString::to_string));
    result.warnings.extend(duplicate_names(&document));
    result.warnings.extend(entry_warnings(&decoded));

    Ok(result)
}

fn duplicate_names(document: &Value) -> Vec<String> {
    let Some(Value::Array(entries)) = document.get("servers") else {
        return Vec::new();
    };

    let mut seen = BTreeSet::new();
    let mut reported = BTreeSet::new();
    entries
        .iter()
        .filter_map(|entry| entry.get("name").and_then(scalar_to_string))
        .filter(|name| !seen.insert(name.clone()) && reported.insert(name.clone()))
        .map(|name| format!("Server '{name}' is defined more than once; the last definition wins"))
        .collect()
}

fn entry_warnings(decoded: &DecodedConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    for (name, field) in &decoded.unknown_fields {
        warnings.push(format!("Unknown field '{field}' in server '{name}'"));
    }

    for entry in decoded.config.servers() {
        for tag in entry.agents.iter().filter(|tag| Agent::from_tag(tag).is_none()) {
            warnings.push(format!("Unknown agent '{tag}' in server '{}'", entry.name));
        }
        if entry.invocation.is_none() {
            warnings.push(format!(
                "Server '{}' has only build information and will not be written to any host",
                entry.name
            ));
        }
    }

    warnings
}
