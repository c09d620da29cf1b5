use crate::agent::Agent;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct AppConfig {
    /// Team configuration repository used when `--repo` is not given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_dir: Option<String>,
    /// Default for `--backup`.
    #[serde(default)]
    pub backup: bool,
    /// Per-host settings keyed by host id (`cursor`, `claude`, `windsurf`, `codex`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub targets: BTreeMap<String, TargetConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TargetConfig {
    /// Replaces the host's default config path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self { path: None, enabled: true }
    }
}

const fn default_enabled() -> bool {
    true
}

impl AppConfig {
    /// Load the application configuration from the default path
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Unable to determine the config directory
    /// - Unable to read the config file (other than it not existing)
    /// - The config file contains invalid TOML
    pub fn load() -> Result<Option<Self>> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config at {}", config_path.display()))?;

        Ok(Some(config))
    }

    /// Get the path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if unable to determine the config directory
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
            Ok(PathBuf::from(config_home).join("devstrap").join("config.toml"))
        } else if let Some(proj_dirs) = ProjectDirs::from("", "", "devstrap") {
            Ok(proj_dirs.config_dir().join("config.toml"))
        } else {
            anyhow::bail!("Could not determine config directory")
        }
    }

    pub fn target(&self, agent: Agent) -> Option<&TargetConfig> {
        self.targets.get(agent.id())
    }

    pub fn is_target_enabled(&self, agent: Agent) -> bool {
        self.target(agent).map_or(true, |target| target.enabled)
    }

    pub fn target_path(&self, agent: Agent) -> Option<&PathBuf> {
        self.target(agent).and_then(|target| target.path.as_ref())
    }

    /// `[targets.<id>]` sections that name no known host.
    pub fn unknown_targets(&self) -> Vec<&str> {
        self.targets
            .keys()
            .filter(|id| !Agent::ALL.iter().any(|agent| agent.id() == id.as_str()))
            .map(String::as_str)
            .collect()
    }
}
