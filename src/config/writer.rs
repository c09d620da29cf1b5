use super::UnifiedConfig;
use crate::format::{emit_document, Capabilities, Format};
use crate::DevstrapError;
use chrono::Local;
use serde_json::Value;
use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

const UNIFIED_HEADER: &str =
    "# MCP servers shared by the team. Projected into every host's config by devstrap.\n";

/// Replace `path` with `contents` in one step.
///
/// The text goes to a temporary file next to the destination which is then renamed
/// over it, so an interrupted run never leaves a half-written file. A symlinked
/// `path` is followed and its target replaced, and an existing file keeps its
/// permissions. Parent directories are created as needed and no byte-order mark is
/// written.
///
/// # Errors
///
/// Returns `DevstrapError::Write` if any step fails, including a symlink whose
/// target cannot be resolved.
pub fn write_atomic<P: AsRef<Path>>(path: P, contents: &str) -> Result<(), DevstrapError> {
    let path_ref = path.as_ref();
    let write_err = |source: std::io::Error| DevstrapError::Write {
        path: path_ref.to_path_buf(),
        source,
    };

    let destination = resolve_symlink(path_ref).map_err(write_err)?;
    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(write_err)?;

    let mut temp = NamedTempFile::new_in(&parent).map_err(write_err)?;
    temp.write_all(contents.as_bytes()).map_err(write_err)?;
    if let Ok(metadata) = fs::metadata(&destination) {
        temp.as_file().set_permissions(metadata.permissions()).map_err(write_err)?;
    }
    temp.as_file().sync_all().map_err(write_err)?;
    temp.persist(&destination).map_err(|e| write_err(e.error))?;

    Ok(())
}

fn resolve_symlink(path: &Path) -> std::io::Result<PathBuf> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.file_type().is_symlink() => {
            let target = fs::canonicalize(path)?;
            debug!("Writing through symlink {} to {}", path.display(), target.display());
            Ok(target)
        },
        _ => Ok(path.to_path_buf()),
    }
}

/// Create a backup of a file with timestamp
///
/// # Errors
///
/// Returns an error if unable to copy the file
pub fn backup_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Option<PathBuf>> {
    let path_ref = path.as_ref();

    if !path_ref.exists() {
        return Ok(None);
    }

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let backup_path = path_ref.with_file_name(format!(
        "{}.backup.{}",
        path_ref.file_name().and_then(|n| n.to_str()).unwrap_or("config"),
        timestamp
    ));

    fs::copy(path_ref, &backup_path)?;

    Ok(Some(backup_path))
}

/// Render the unified document for `path`'s format.
///
/// YAML goes through the structured emitter when available; if that processor is
/// missing or fails, the same schema is written line by line instead.
pub fn render_unified(config: &UnifiedConfig, format: Format, capabilities: Capabilities) -> String {
    let document = config.to_document();

    if format == Format::Yaml {
        let emitted = capabilities
            .require(Format::Yaml, "structured YAML output")
            .and_then(|()| emit_document(Format::Yaml, &document));
        return match emitted {
            Ok(text) => format!("{UNIFIED_HEADER}{text}"),
            Err(e) => {
                warn!("{e}; writing the unified file line by line");
                format!("{UNIFIED_HEADER}{}", emit_yaml_manually(&document))
            },
        };
    }

    match emit_document(format, &document) {
        Ok(text) => text,
        Err(e) => {
            warn!("{e}; falling back to JSON");
            serde_json::to_string_pretty(&document).unwrap_or_default()
        },
    }
}

/// Write the unified server list.
///
/// # Errors
///
/// Returns `DevstrapError::Write` if the file cannot be written.
pub fn write_unified<P: AsRef<Path>>(
    path: P,
    config: &UnifiedConfig,
    capabilities: Capabilities,
) -> Result<(), DevstrapError> {
    let path_ref = path.as_ref();
    let format = Format::from_path(path_ref).unwrap_or(Format::Yaml);
    let text = render_unified(config, format, capabilities);
    write_atomic(path_ref, &text)?;
    debug!("Wrote {} server(s) to {}", config.len(), path_ref.display());
    Ok(())
}

/// Block-style YAML for a tree of objects, arrays and scalars.
///
/// Strings are always double-quoted with JSON escapes, which YAML accepts verbatim.
pub fn emit_yaml_manually(value: &Value) -> String {
    let mut out = String::new();
    match value {
        Value::Object(map) if !map.is_empty() => emit_mapping(map, 0, &mut out),
        Value::Array(items) if !items.is_empty() => emit_sequence(items, 0, &mut out),
        other => {
            let _ = writeln!(out, "{}", yaml_inline(other));
        },
    }
    out
}

fn emit_mapping(map: &serde_json::Map<String, Value>, indent: usize, out: &mut String) {
    let pad = " ".repeat(indent);
    for (key, value) in map {
        let key = yaml_key(key);
        match value {
            Value::Object(child) if !child.is_empty() => {
                let _ = writeln!(out, "{pad}{key}:");
                emit_mapping(child, indent + 2, out);
            },
            Value::Array(items) if !items.is_empty() => {
                let _ = writeln!(out, "{pad}{key}:");
                emit_sequence(items, indent + 2, out);
            },
            scalar => {
                let _ = writeln!(out, "{pad}{key}: {}", yaml_inline(scalar));
            },
        }
    }
}

fn emit_sequence(items: &[Value], indent: usize, out: &mut String) {
    let pad = " ".repeat(indent);
    for item in items {
        match item {
            Value::Object(child) if !child.is_empty() => {
                let mut nested = String::new();
                emit_mapping(child, indent + 2, &mut nested);
                // The first key shares the line with the dash.
                let nested = nested.get(indent + 2..).unwrap_or_default();
                let _ = write!(out, "{pad}- {nested}");
            },
            Value::Array(child) if !child.is_empty() => {
                let _ = writeln!(out, "{pad}-");
                emit_sequence(child, indent + 2, out);
            },
            scalar => {
                let _ = writeln!(out, "{pad}- {}", yaml_inline(scalar));
            },
        }
    }
}

fn yaml_key(key: &str) -> String {
    let plain = !key.is_empty()
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        && !key.starts_with('-')
        && key.parse::<f64>().is_err()
        && !matches!(
            key.to_ascii_lowercase().as_str(),
            "null" | "true" | "false" | "yes" | "no" | "on" | "off"
        );
    if plain {
        key.to_string()
    } else {
        Value::String(key.to_string()).to_string()
    }
}

fn yaml_inline(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Array(_) => "[]".to_string(),
        Value::Object(_) => "{}".to_string(),
        other => other.to_string(),
    }
}
