//! Format adapters between on-disk text and the shared structured value.
//!
//! Every document (unified config, legacy sources, host configs) is decoded into a
//! `serde_json::Value` first; the rest of the crate never looks at YAML or TOML nodes.

use crate::DevstrapError;
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::path::Path;
use toml::Value as TomlValue;

const BOM: char = '\u{feff}';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    Toml,
    Yaml,
}

impl Format {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Json => "JSON",
            Self::Toml => "TOML",
            Self::Yaml => "YAML",
        };
        f.write_str(name)
    }
}

/// Which format processors a run is allowed to use.
///
/// JSON is always available. YAML and TOML can be switched off to mirror a host
/// where the corresponding processor failed to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub yaml: bool,
    pub toml: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self { yaml: true, toml: true }
    }
}

impl Capabilities {
    #[must_use]
    pub const fn without(mut self, format: Format) -> Self {
        match format {
            Format::Json => {},
            Format::Yaml => self.yaml = false,
            Format::Toml => self.toml = false,
        }
        self
    }

    #[must_use]
    pub const fn supports(self, format: Format) -> bool {
        match format {
            Format::Json => true,
            Format::Yaml => self.yaml,
            Format::Toml => self.toml,
        }
    }

    /// Fails with `CapabilityUnavailable` when `format` cannot be processed.
    ///
    /// # Errors
    ///
    /// Returns `DevstrapError::CapabilityUnavailable` naming `step`.
    pub fn require(self, format: Format, step: &str) -> Result<(), DevstrapError> {
        if self.supports(format) {
            Ok(())
        } else {
            Err(DevstrapError::CapabilityUnavailable { format, step: step.to_string() })
        }
    }
}

/// Drop a leading byte-order mark, which some Windows editors insert.
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix(BOM).unwrap_or(text)
}

/// Parse `text` into the shared structured value.
///
/// Blank documents decode to an empty object so a freshly created file behaves like
/// a missing one.
///
/// # Errors
///
/// Returns `DevstrapError::ConfigParse` (tagged with `origin`) when the text is malformed.
pub fn parse_document(format: Format, text: &str, origin: &Path) -> Result<JsonValue, DevstrapError> {
    let text = strip_bom(text);
    if text.trim().is_empty() {
        return Ok(JsonValue::Object(Map::new()));
    }

    match format {
        Format::Json => serde_json::from_str(text).map_err(|e| DevstrapError::parse(origin, e)),
        Format::Yaml => {
            let value: serde_yaml::Value =
                serde_yaml::from_str(text).map_err(|e| DevstrapError::parse(origin, e))?;
            Ok(yaml_to_json(&value))
        },
        Format::Toml => {
            let value: TomlValue =
                toml::from_str(text).map_err(|e| DevstrapError::parse(origin, e))?;
            Ok(toml_to_json(value))
        },
    }
}

/// Render a structured value in the given format.
///
/// # Errors
///
/// Returns `DevstrapError::Serialize` if the value cannot be represented.
pub fn emit_document(format: Format, value: &JsonValue) -> Result<String, DevstrapError> {
    let serialize_err = |message: String| DevstrapError::Serialize { format, message };

    match format {
        Format::Json => serde_json::to_string_pretty(value)
            .map(|mut text| {
                text.push('\n');
                text
            })
            .map_err(|e| serialize_err(e.to_string())),
        Format::Yaml => serde_yaml::to_string(value).map_err(|e| serialize_err(e.to_string())),
        Format::Toml => {
            let table = json_to_toml_value(value)
                .filter(TomlValue::is_table)
                .ok_or_else(|| serialize_err("TOML documents must be tables".to_string()))?;
            toml::to_string_pretty(&table).map_err(|e| serialize_err(e.to_string()))
        },
    }
}

fn yaml_key_to_string(key: &serde_yaml::Value) -> Option<String> {
    match key {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn yaml_to_json(value: &serde_yaml::Value) -> JsonValue {
    match value {
        serde_yaml::Value::Null => JsonValue::Null,
        serde_yaml::Value::Bool(b) => JsonValue::Bool(*b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                JsonValue::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                JsonValue::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map_or_else(|| JsonValue::String(n.to_string()), JsonValue::Number)
            }
        },
        serde_yaml::Value::String(s) => JsonValue::String(s.clone()),
        serde_yaml::Value::Sequence(seq) => JsonValue::Array(seq.iter().map(yaml_to_json).collect()),
        serde_yaml::Value::Mapping(map) => JsonValue::Object(
            map.iter()
                .filter_map(|(k, v)| yaml_key_to_string(k).map(|key| (key, yaml_to_json(v))))
                .collect(),
        ),
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

pub(crate) fn toml_to_json(value: TomlValue) -> JsonValue {
    match value {
        TomlValue::String(s) => JsonValue::String(s),
        TomlValue::Integer(i) => JsonValue::Number(i.into()),
        TomlValue::Float(f) => serde_json::Number::from_f64(f)
            .map_or_else(|| JsonValue::String(f.to_string()), JsonValue::Number),
        TomlValue::Boolean(b) => JsonValue::Bool(b),
        TomlValue::Datetime(dt) => JsonValue::String(dt.to_string()),
        TomlValue::Array(arr) => JsonValue::Array(arr.into_iter().map(toml_to_json).collect()),
        TomlValue::Table(table) => {
            JsonValue::Object(table.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect())
        },
    }
}

/// TOML has no null, so nulls are dropped from arrays and tables.
pub(crate) fn json_to_toml_value(value: &JsonValue) -> Option<TomlValue> {
    match value {
        JsonValue::Null => None,
        JsonValue::Bool(b) => Some(TomlValue::Boolean(*b)),
        JsonValue::Number(number) => number
            .as_i64()
            .map(TomlValue::Integer)
            .or_else(|| number.as_f64().map(TomlValue::Float)),
        JsonValue::String(s) => Some(TomlValue::String(s.clone())),
        JsonValue::Array(array) => {
            Some(TomlValue::Array(array.iter().filter_map(json_to_toml_value).collect()))
        },
        JsonValue::Object(json_object) => Some(TomlValue::Table(
            json_object
                .iter()
                .filter_map(|(k, v)| json_to_toml_value(v).map(|tv| (k.clone(), tv)))
                .collect(),
        )),
    }
}
