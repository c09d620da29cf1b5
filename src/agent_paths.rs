use crate::agent::Agent;
use crate::paths::HostEnvironment;
use std::path::{Path, PathBuf};

const CURSOR_CONFIG_ENV: &str = "DEVSTRAP_CURSOR_CONFIG";
const CLAUDE_CONFIG_ENV: &str = "DEVSTRAP_CLAUDE_CONFIG";
const WINDSURF_CONFIG_ENV: &str = "DEVSTRAP_WINDSURF_CONFIG";
const CODEX_CONFIG_ENV: &str = "DEVSTRAP_CODEX_CONFIG";
const CODEX_HOME_ENV: &str = "CODEX_HOME";

#[must_use]
pub const fn override_env_var(agent: Agent) -> &'static str {
    match agent {
        Agent::Cursor => CURSOR_CONFIG_ENV,
        Agent::Claude => CLAUDE_CONFIG_ENV,
        Agent::Windsurf => WINDSURF_CONFIG_ENV,
        Agent::Codex => CODEX_CONFIG_ENV,
    }
}

fn non_empty_env(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Where a host keeps its configuration when nothing overrides it.
#[must_use]
pub fn default_config_path(agent: Agent, env: &HostEnvironment) -> PathBuf {
    match agent {
        Agent::Cursor => env.home().join(".cursor").join("mcp.json"),
        Agent::Claude => env.config_dir().join("Claude").join("claude_desktop_config.json"),
        Agent::Windsurf => env.home().join(".codeium").join("windsurf").join("mcp_config.json"),
        Agent::Codex => non_empty_env(CODEX_HOME_ENV)
            .unwrap_or_else(|| env.home().join(".codex"))
            .join("config.toml"),
    }
}

/// Resolve a host's config path: explicit override, then the
/// `DEVSTRAP_<AGENT>_CONFIG` environment variable, then the default.
#[must_use]
pub fn config_path(agent: Agent, env: &HostEnvironment, explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| non_empty_env(override_env_var(agent)))
        .unwrap_or_else(|| default_config_path(agent, env))
}
