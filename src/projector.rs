//! Projection of the unified server list into one host's native shape.

use crate::agent::{Agent, AgentDescriptor, DocumentShape};
use crate::codex_toml::render_block;
use crate::config::{string_array, string_object, Invocation, ServerEntry, UnifiedConfig};
use crate::paths::PathResolver;
use crate::DevstrapError;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

/// One server rendered as a TOML block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TomlBlock {
    pub name: String,
    pub text: String,
}

/// The managed part of a host document, ready to be merged.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetFragment {
    /// `name -> record` for hosts with a JSON server map.
    JsonMap(Map<String, Value>),
    /// Rendered `[mcp_servers.<name>]` blocks, in server order.
    TomlBlocks(Vec<TomlBlock>),
}

impl TargetFragment {
    fn empty(shape: DocumentShape) -> Self {
        match shape {
            DocumentShape::JsonMap { .. } => Self::JsonMap(Map::new()),
            DocumentShape::TomlTables { .. } => Self::TomlBlocks(Vec::new()),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::JsonMap(map) => map.keys().map(String::as_str).collect(),
            Self::TomlBlocks(blocks) => blocks.iter().map(|block| block.name.as_str()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::JsonMap(map) => map.len(),
            Self::TomlBlocks(blocks) => blocks.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
pub struct Projection {
    pub fragment: TargetFragment,
    /// Eligible entries that could not be rendered.
    pub skipped: Vec<DevstrapError>,
}

/// Render every enabled, eligible entry for `agent`, in unified order.
///
/// Entries without an invocation (build-only definitions) are reported in
/// `skipped` instead of being written.
pub fn project(config: &UnifiedConfig, agent: Agent, resolver: &PathResolver) -> Projection {
    let descriptor = agent.descriptor();
    let mut fragment = TargetFragment::empty(descriptor.shape);
    let mut skipped = Vec::new();

    for entry in config.servers() {
        if !entry.enabled {
            debug!("{}: '{}' is disabled", descriptor.display_name, entry.name);
            continue;
        }
        if !entry.is_eligible_for(agent) {
            trace!("{}: '{}' is restricted to {:?}", descriptor.display_name, entry.name, entry.agents);
            continue;
        }

        let record = match build_record(entry, descriptor, resolver) {
            Ok(record) => record,
            Err(e) => {
                warn!("{}: skipping entry: {e}", descriptor.display_name);
                skipped.push(e);
                continue;
            },
        };

        match (&mut fragment, descriptor.shape) {
            (TargetFragment::JsonMap(map), _) => {
                map.insert(entry.name.clone(), Value::Object(record));
            },
            (TargetFragment::TomlBlocks(blocks), DocumentShape::TomlTables { table }) => {
                blocks.push(TomlBlock {
                    name: entry.name.clone(),
                    text: render_block(table, &entry.name, &record),
                });
            },
            (TargetFragment::TomlBlocks(_), DocumentShape::JsonMap { .. }) => {},
        }
    }

    debug!("{}: projected {} server(s)", descriptor.display_name, fragment.len());
    Projection { fragment, skipped }
}

/// The host-native record for one entry, keys in emission order.
///
/// # Errors
///
/// Returns `DevstrapError::InvalidEntry` if the entry has no invocation.
pub fn build_record(
    entry: &ServerEntry,
    descriptor: &AgentDescriptor,
    resolver: &PathResolver,
) -> Result<Map<String, Value>, DevstrapError> {
    let mut record = Map::new();

    match &entry.invocation {
        Some(Invocation::Local { command, args, env }) => {
            record.insert("command".into(), Value::String(resolver.resolve(command)));
            if !args.is_empty() {
                let resolved: Vec<String> = args.iter().map(|arg| resolver.resolve(arg)).collect();
                record.insert("args".into(), string_array(&resolved));
            }
            if !env.is_empty() {
                record.insert("env".into(), string_object(env));
            }
        },
        Some(Invocation::Remote { url, headers }) => {
            record.insert(descriptor.url_key.into(), Value::String(url.clone()));
            if let Some(headers_key) = descriptor.headers_key.filter(|_| !headers.is_empty()) {
                record.insert(headers_key.into(), string_object(headers));
            }
        },
        None => {
            return Err(DevstrapError::invalid_entry(
                entry.name.as_str(),
                "neither url nor command is set",
            ))
        },
    }

    if descriptor.tuning_fields {
        let tuning = &entry.tuning;
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
    }

    Ok(record)
}
