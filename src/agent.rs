//! Host applications ("agents") that receive the projected server list.

use crate::format::Format;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Agent {
    Cursor,
    Claude,
    Windsurf,
    Codex,
}

/// Where a host keeps its managed servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentShape {
    /// A JSON object with the servers under one top-level key.
    JsonMap { managed_key: &'static str },
    /// A TOML document with one `[<table>.<name>]` block per server.
    TomlTables { table: &'static str },
}

impl DocumentShape {
    pub const fn format(self) -> Format {
        match self {
            Self::JsonMap { .. } => Format::Json,
            Self::TomlTables { .. } => Format::Toml,
        }
    }
}

/// Everything the projector needs to know about one host's schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentDescriptor {
    pub agent: Agent,
    pub display_name: &'static str,
    /// Values of a server's `agents` list that select this host.
    pub tags: &'static [&'static str],
    pub shape: DocumentShape,
    /// Key remote endpoints are written under.
    pub url_key: &'static str,
    /// Key for remote-server headers; `None` means the host never receives them.
    pub headers_key: Option<&'static str>,
    /// Whether timeouts and tool allow/deny lists are emitted.
    pub tuning_fields: bool,
}

const CURSOR: AgentDescriptor = AgentDescriptor {
    agent: Agent::Cursor,
    display_name: "Cursor",
    tags: &["cursor"],
    shape: DocumentShape::JsonMap { managed_key: "mcpServers" },
    url_key: "url",
    headers_key: None,
    tuning_fields: false,
};

const CLAUDE: AgentDescriptor = AgentDescriptor {
    agent: Agent::Claude,
    display_name: "Claude Desktop",
    tags: &["claude", "claude-desktop"],
    shape: DocumentShape::JsonMap { managed_key: "mcpServers" },
    url_key: "url",
    headers_key: None,
    tuning_fields: false,
};

const WINDSURF: AgentDescriptor = AgentDescriptor {
    agent: Agent::Windsurf,
    display_name: "Windsurf",
    tags: &["windsurf"],
    shape: DocumentShape::JsonMap { managed_key: "mcpServers" },
    url_key: "serverUrl",
    headers_key: Some("headers"),
    tuning_fields: false,
};

const CODEX: AgentDescriptor = AgentDescriptor {
    agent: Agent::Codex,
    display_name: "Codex CLI",
    tags: &["codex"],
    shape: DocumentShape::TomlTables { table: "mcp_servers" },
    url_key: "url",
    headers_key: Some("http_headers"),
    tuning_fields: true,
};

impl Agent {
    pub const ALL: [Self; 4] = [Self::Cursor, Self::Claude, Self::Windsurf, Self::Codex];

    pub const fn descriptor(self) -> &'static AgentDescriptor {
        match self {
            Self::Cursor => &CURSOR,
            Self::Claude => &CLAUDE,
            Self::Windsurf => &WINDSURF,
            Self::Codex => &CODEX,
        }
    }

    pub const fn id(self) -> &'static str {
        match self {
            Self::Cursor => "cursor",
            Self::Claude => "claude",
            Self::Windsurf => "windsurf",
            Self::Codex => "codex",
        }
    }

    /// Case-insensitive match against this host's eligibility tags.
    pub fn matches_tag(self, tag: &str) -> bool {
        let tag = tag.trim();
        self.descriptor().tags.iter().any(|known| known.eq_ignore_ascii_case(tag))
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|agent| agent.matches_tag(tag))
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
