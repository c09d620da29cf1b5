//! Placeholder expansion for `command` and `args` values.

use anyhow::{anyhow, Result};
use regex::{NoExpand, Regex};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

/// Per-user directories placeholders expand to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnvironment {
    home: PathBuf,
    local_app_data: PathBuf,
    config_dir: PathBuf,
}

impl HostEnvironment {
    /// The roaming config directory defaults to `<home>/.config`.
    pub fn new<H: Into<PathBuf>, L: Into<PathBuf>>(home: H, local_app_data: L) -> Self {
        let home = home.into();
        let config_dir = home.join(".config");
        Self { home, local_app_data: local_app_data.into(), config_dir }
    }

    #[must_use]
    pub fn with_config_dir<P: Into<PathBuf>>(mut self, config_dir: P) -> Self {
        self.config_dir = config_dir.into();
        self
    }

    /// Detects the current user's home and local application-data directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn detect() -> Result<Self> {
        let dirs = directories::BaseDirs::new()
            .ok_or_else(|| anyhow!("Could not determine home directory"))?;
        Ok(Self::new(dirs.home_dir(), dirs.data_local_dir()).with_config_dir(dirs.config_dir()))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn local_app_data(&self) -> &Path {
        &self.local_app_data
    }

    /// Per-user roaming configuration directory (`%APPDATA%`, `~/Library/Application Support`,
    /// `$XDG_CONFIG_HOME`).
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}

/// Expands `~` and `{LOCALAPPDATA}` into absolute, OS-native paths.
///
/// Expanded strings no longer contain either placeholder, so resolving a value twice
/// yields the same result as resolving it once.
#[derive(Debug, Clone)]
pub struct PathResolver {
    env: HostEnvironment,
    local_app_data_token: Regex,
}

impl PathResolver {
    /// # Errors
    ///
    /// Returns an error if the placeholder pattern fails to compile.
    pub fn new(env: HostEnvironment) -> Result<Self> {
        let local_app_data_token = Regex::new(r"(?i)\{LOCALAPPDATA\}")?;
        Ok(Self { env, local_app_data_token })
    }

    pub const fn environment(&self) -> &HostEnvironment {
        &self.env
    }

    /// Resolve a single raw value. First matching rule wins:
    /// leading `~` (with or without a following separator), then `{LOCALAPPDATA}`
    /// anywhere in the string; anything else is returned unchanged.
    pub fn resolve(&self, raw: &str) -> String {
        if let Some(rest) = raw.strip_prefix('~') {
            let home = self.env.home.to_string_lossy();
            return normalize_separators(&format!("{home}{rest}"));
        }

        if self.local_app_data_token.is_match(raw) {
            let local = self.env.local_app_data.to_string_lossy();
            let replaced = self.local_app_data_token.replace_all(raw, NoExpand(local.as_ref()));
            return normalize_separators(&replaced);
        }

        raw.to_string()
    }
}

fn normalize_separators(path: &str) -> String {
    path.chars().map(|c| if c == '/' || c == '\\' { MAIN_SEPARATOR } else { c }).collect()
}
