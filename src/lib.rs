#![allow(missing_docs)]

pub mod agent;
pub mod agent_paths;
pub mod app_config;
pub mod bootstrap;
pub mod cli;
pub mod codex_toml;
pub mod config;
pub mod format;
pub mod merge;
pub mod migration;
pub mod paths;
pub mod projector;
pub mod sync_operations;
pub mod validation;

pub use agent::{Agent, AgentDescriptor};
pub use config::{ServerEntry, UnifiedConfig};
pub use merge::{merge_fragment, MergeReport};
pub use projector::{project, TargetFragment};

use format::Format;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DevstrapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse {}: {message}", path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error("Invalid server entry '{name}': {reason}")]
    InvalidEntry { name: String, reason: String },

    #[error("{format} support is unavailable, skipping {step}")]
    CapabilityUnavailable { format: Format, step: String },

    #[error("Failed to serialize {format}: {message}")]
    Serialize { format: Format, message: String },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DevstrapError {
    pub fn parse<P: Into<PathBuf>, M: std::fmt::Display>(path: P, message: M) -> Self {
        Self::ConfigParse { path: path.into(), message: message.to_string() }
    }

    pub fn invalid_entry<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        Self::InvalidEntry { name: name.into(), reason: reason.into() }
    }
}
