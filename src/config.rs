#![allow(clippy::self_named_module_files)]

//! The unified server list: typed entries decoded and validated from the team repository.

use crate::agent::Agent;
use crate::DevstrapError;
use serde::Deserialize;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod reader;
pub mod writer;

/// Unified file inside the team repository.
pub const UNIFIED_FILE_NAME: &str = "mcp-servers.yaml";
/// Legacy `mcpServers` JSON map.
pub const LEGACY_JSON_FILE_NAME: &str = "mcp.json";
/// Legacy `mcps` YAML list of repositories to build.
pub const LEGACY_YAML_FILE_NAME: &str = "mcps.yaml";

#[must_use]
pub fn unified_path(repo_dir: &Path) -> PathBuf {
    repo_dir.join(UNIFIED_FILE_NAME)
}

/// How a host starts or reaches a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Remote endpoint. Never path-resolved.
    Remote { url: String, headers: BTreeMap<String, String> },
    /// Local process.
    Local { command: String, args: Vec<String>, env: BTreeMap<String, String> },
}

/// Host-specific knobs carried through untouched and only emitted where understood.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolTuning {
    pub startup_timeout_sec: Option<Number>,
    pub tool_timeout_sec: Option<Number>,
    pub enabled_tools: Option<Vec<String>>,
    pub disabled_tools: Option<Vec<String>>,
}

impl ToolTuning {
    pub const fn is_empty(&self) -> bool {
        self.startup_timeout_sec.is_none()
            && self.tool_timeout_sec.is_none()
            && self.enabled_tools.is_none()
            && self.disabled_tools.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEntry {
    pub name: String,
    pub enabled: bool,
    /// Eligibility tags; empty means every host.
    pub agents: Vec<String>,
    /// `None` only for build-only entries that carry a `repository`.
    pub invocation: Option<Invocation>,
    pub repository: Option<String>,
    pub build_commands: Vec<String>,
    pub tuning: ToolTuning,
}

impl ServerEntry {
    pub fn local<N: Into<String>, C: Into<String>>(name: N, command: C) -> Self {
        Self::with_invocation(
            name,
            Some(Invocation::Local {
                command: command.into(),
                args: Vec::new(),
                env: BTreeMap::new(),
            }),
        )
    }

    pub fn remote<N: Into<String>, U: Into<String>>(name: N, url: U) -> Self {
        Self::with_invocation(
            name,
            Some(Invocation::Remote { url: url.into(), headers: BTreeMap::new() }),
        )
    }

    pub fn build_only<N: Into<String>>(name: N) -> Self {
        Self::with_invocation(name, None)
    }

    fn with_invocation<N: Into<String>>(name: N, invocation: Option<Invocation>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            agents: Vec::new(),
            invocation,
            repository: None,
            build_commands: Vec::new(),
            tuning: ToolTuning::default(),
        }
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, new_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(Invocation::Local { args, .. }) = self.invocation.as_mut() {
            *args = new_args.into_iter().map(Into::into).collect();
        }
        self
    }

    #[must_use]
    pub fn with_env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        if let Some(Invocation::Local { env, .. }) = self.invocation.as_mut() {
            env.insert(key.into(), value.into());
        }
        self
    }

    #[must_use]
    pub fn with_header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        if let Some(Invocation::Remote { headers, .. }) = self.invocation.as_mut() {
            headers.insert(key.into(), value.into());
        }
        self
    }

    #[must_use]
    pub fn with_agents<I, S>(mut self, agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.agents = agents.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether the `agents` restriction admits `agent`.
    pub fn is_eligible_for(&self, agent: Agent) -> bool {
        self.agents.is_empty() || self.agents.iter().any(|tag| agent.matches_tag(tag))
    }

    /// Serialized form in the unified schema, keys in a stable order.
    pub fn to_value(&self) -> Value {
        let mut record = Map::new();
        record.insert("name".into(), Value::String(self.name.clone()));
        record.insert("enabled".into(), Value::Bool(self.enabled));
        if !self.agents.is_empty() {
            record.insert("agents".into(), string_array(&self.agents));
        }

        match &self.invocation {
            Some(Invocation::Local { command, args, env }) => {
                record.insert("command".into(), Value::String(command.clone()));
                if !args.is_empty() {
                    record.insert("args".into(), string_array(args));
                }
                if !env.is_empty() {
                    record.insert("env".into(), string_object(env));
                }
            },
            Some(Invocation::Remote { url, headers }) => {
                record.insert("url".into(), Value::String(url.clone()));
                if !headers.is_empty() {
                    record.insert("headers".into(), string_object(headers));
                }
            },
            None => {},
        }

        if let Some(repository) = &self.repository {
            record.insert("repository".into(), Value::String(repository.clone()));
        }
        if !self.build_commands.is_empty() {
            record.insert("buildCommands".into(), string_array(&self.build_commands));
        }

        let tuning = &self.tuning;
        if let Some(timeout) = &tuning.startup_timeout_sec {
            record.insert("startup_timeout_sec".into(), Value::Number(timeout.clone()));
        }
        if let Some(timeout) = &tuning.tool_timeout_sec {
            record.insert("tool_timeout_sec".into(), Value::Number(timeout.clone()));
        }
        if let Some(tools) = &tuning.enabled_tools {
            record.insert("enabled_tools".into(), string_array(tools));
        }
        if let Some(tools) = &tuning.disabled_tools {
            record.insert("disabled_tools".into(), string_array(tools));
        }

        Value::Object(record)
    }
}

pub(crate) fn string_array(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

pub(crate) fn string_object(map: &BTreeMap<String, String>) -> Value {
    Value::Object(map.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect())
}

/// Ordered collection of entries keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnifiedConfig {
    servers: Vec<ServerEntry>,
}

impl UnifiedConfig {
    pub const fn new() -> Self {
        Self { servers: Vec::new() }
    }

    pub fn servers(&self) -> &[ServerEntry] {
        &self.servers
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ServerEntry> {
        self.servers.iter().find(|entry| entry.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ServerEntry> {
        self.servers.iter_mut().find(|entry| entry.name == name)
    }

    /// Insert an entry. A later entry with an existing name replaces the earlier one
    /// in the earlier one's position.
    pub fn upsert(&mut self, entry: ServerEntry) {
        if let Some(existing) = self.get_mut(&entry.name) {
            debug!("Duplicate server '{}' replaces the earlier definition", entry.name);
            *existing = entry;
        } else {
            self.servers.push(entry);
        }
    }

    /// `{"servers": [...]}` in the unified schema.
    pub fn to_document(&self) -> Value {
        let servers = self.servers.iter().map(ServerEntry::to_value).collect();
        let mut document = Map::new();
        document.insert("servers".into(), Value::Array(servers));
        Value::Object(document)
    }
}

impl FromIterator<ServerEntry> for UnifiedConfig {
    fn from_iter<T: IntoIterator<Item = ServerEntry>>(iter: T) -> Self {
        let mut config = Self::new();
        for entry in iter {
            config.upsert(entry);
        }
        config
    }
}

/// A decoded document plus every entry that had to be dropped.
#[derive(Debug, Default)]
pub struct DecodedConfig {
    pub config: UnifiedConfig,
    pub issues: Vec<DevstrapError>,
    /// `(entry name, field)` pairs the schema does not know.
    pub unknown_fields: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct RawServerEntry {
    name: Option<Value>,
    enabled: Option<bool>,
    agents: Option<Value>,
    url: Option<String>,
    headers: Option<Map<String, Value>>,
    command: Option<String>,
    args: Option<Value>,
    env: Option<Map<String, Value>>,
    repository: Option<String>,
    #[serde(rename = "buildCommands", alias = "build_commands")]
    build_commands: Option<Value>,
    startup_timeout_sec: Option<Number>,
    tool_timeout_sec: Option<Number>,
    enabled_tools: Option<Value>,
    disabled_tools: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Decode a parsed unified document.
///
/// A missing `servers` key means an empty configuration. Entries that fail validation
/// are dropped and reported in `issues`; they never abort the whole document.
///
/// # Errors
///
/// Returns `DevstrapError::ConfigParse` when the root is not an object or `servers`
/// is not a sequence.
pub fn decode_unified(document: &Value, origin: &Path) -> Result<DecodedConfig, DevstrapError> {
    let root = match document {
        Value::Object(root) => root,
        Value::Null => return Ok(DecodedConfig::default()),
        _ => return Err(DevstrapError::parse(origin, "expected a mapping at the document root")),
    };

    let entries = match root.get("servers") {
        None | Some(Value::Null) => return Ok(DecodedConfig::default()),
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(DevstrapError::parse(origin, "'servers' must be a sequence")),
    };

    let mut decoded = DecodedConfig::default();
    for (index, raw) in entries.iter().enumerate() {
        match decode_entry(index, raw) {
            Ok((entry, unknown)) => {
                decoded
                    .unknown_fields
                    .extend(unknown.into_iter().map(|field| (entry.name.clone(), field)));
                decoded.config.upsert(entry);
            },
            Err(issue) => decoded.issues.push(issue),
        }
    }

    Ok(decoded)
}

pub(crate) fn decode_entry(
    index: usize,
    raw: &Value,
) -> Result<(ServerEntry, Vec<String>), DevstrapError> {
    let placeholder = format!("servers[{index}]");
    if !raw.is_object() {
        return Err(DevstrapError::invalid_entry(placeholder, "entry is not a mapping"));
    }

    let raw: RawServerEntry = serde_json::from_value(raw.clone())
        .map_err(|e| DevstrapError::invalid_entry(placeholder.as_str(), e.to_string()))?;

    let name = raw
        .name
        .as_ref()
        .and_then(scalar_to_string)
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| DevstrapError::invalid_entry(placeholder.as_str(), "missing name"))?;

    let invalid = |reason: String| DevstrapError::invalid_entry(name.as_str(), reason);

    let url = raw.url.filter(|url| !url.trim().is_empty());
    let command = raw.command.filter(|command| !command.trim().is_empty());

    let invocation = match (url, command) {
        (Some(_), Some(_)) => {
            return Err(invalid("both url and command are set; exactly one is allowed".into()))
        },
        (Some(url), None) => {
            if raw.args.is_some() || raw.env.is_some() {
                debug!("Server '{name}' is remote; ignoring args/env");
            }
            let headers = string_map("headers", raw.headers.as_ref()).map_err(invalid)?;
            Some(Invocation::Remote { url, headers })
        },
        (None, Some(command)) => {
            if raw.headers.is_some() {
                debug!("Server '{name}' runs a command; ignoring headers");
            }
            let args = string_list("args", raw.args.as_ref()).map_err(invalid)?;
            let env = string_map("env", raw.env.as_ref()).map_err(invalid)?;
            Some(Invocation::Local { command, args, env })
        },
        (None, None) if raw.repository.is_some() => None,
        (None, None) => return Err(invalid("neither url nor command is set".into())),
    };

    let optional_list =
        |field: &str, value: Option<&Value>| -> Result<Option<Vec<String>>, DevstrapError> {
            value
                .filter(|value| !value.is_null())
                .map(|value| string_list(field, Some(value)).map_err(invalid))
                .transpose()
        };

    let entry = ServerEntry {
        enabled: raw.enabled.unwrap_or(true),
        agents: string_list("agents", raw.agents.as_ref()).map_err(invalid)?,
        invocation,
        repository: raw.repository.filter(|repo| !repo.trim().is_empty()),
        build_commands: string_list("buildCommands", raw.build_commands.as_ref())
            .map_err(invalid)?,
        tuning: ToolTuning {
            startup_timeout_sec: raw.startup_timeout_sec,
            tool_timeout_sec: raw.tool_timeout_sec,
            enabled_tools: optional_list("enabled_tools", raw.enabled_tools.as_ref())?,
            disabled_tools: optional_list("disabled_tools", raw.disabled_tools.as_ref())?,
        },
        name: name.clone(),
    };

    let unknown = raw.extra.keys().cloned().collect();
    Ok((entry, unknown))
}

pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Accepts a sequence or a lone scalar, which some emitters produce for one-item lists.
pub(crate) fn string_list(field: &str, value: Option<&Value>) -> Result<Vec<String>, String> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                scalar_to_string(item)
                    .ok_or_else(|| format!("'{field}' must contain only scalar values"))
            })
            .collect(),
        Some(scalar) => scalar_to_string(scalar)
            .map(|item| vec![item])
            .ok_or_else(|| format!("'{field}' must be a sequence of strings")),
    }
}

pub(crate) fn string_map(
    field: &str,
    value: Option<&Map<String, Value>>,
) -> Result<BTreeMap<String, String>, String> {
    value.map_or_else(
        || Ok(BTreeMap::new()),
        |map| {
            map.iter()
                .map(|(key, value)| {
                    scalar_to_string(value)
                        .map(|value| (key.clone(), value))
                        .ok_or_else(|| format!("'{field}.{key}' must be a scalar value"))
                })
                .collect()
        },
    )
}
