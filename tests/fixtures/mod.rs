#![allow(dead_code)]

use devstrap::agent::Agent;
use devstrap::agent_paths::override_env_var;
use devstrap::app_config::{AppConfig, TargetConfig};
use devstrap::paths::{HostEnvironment, PathResolver};
use std::fs;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

/// Test fixture with a team repository and a fake home directory
pub struct TestFixture {
    /// Temporary directory that will be cleaned up on drop
    pub temp: TempDir,
    /// Team configuration repository
    pub repo: PathBuf,
    /// Home directory the host configs live under
    pub home: PathBuf,
    /// `XDG_CONFIG_HOME` for the app config and Claude Desktop
    pub config_home: PathBuf,
}

impl TestFixture {
    /// Create a new test fixture with temporary directories
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = tempdir()?;
        let repo = temp_dir.path().join("team");
        let home = temp_dir.path().join("home");
        let config_home = home.join(".config");

        fs::create_dir_all(&repo)?;
        fs::create_dir_all(&config_home)?;

        Ok(Self { temp: temp_dir, repo, home, config_home })
    }

    pub fn environment(&self) -> HostEnvironment {
        HostEnvironment::new(&self.home, self.home.join(".local").join("share"))
            .with_config_dir(&self.config_home)
    }

    pub fn resolver(&self) -> PathResolver {
        PathResolver::new(self.environment()).unwrap()
    }

    /// Host config location used by this fixture
    pub fn host_path(&self, agent: Agent) -> PathBuf {
        match agent {
            Agent::Cursor => self.home.join(".cursor").join("mcp.json"),
            Agent::Claude => self.config_home.join("Claude").join("claude_desktop_config.json"),
            Agent::Windsurf => self.home.join(".codeium").join("windsurf").join("mcp_config.json"),
            Agent::Codex => self.home.join(".codex").join("config.toml"),
        }
    }

    /// App config pinning every host to [`Self::host_path`]
    pub fn app_config(&self) -> AppConfig {
        let mut config = AppConfig::default();
        for agent in Agent::ALL {
            config.targets.insert(
                agent.id().to_string(),
                TargetConfig { path: Some(self.host_path(agent)), enabled: true },
            );
        }
        config
    }

    pub fn write_repo_file(&self, name: &str, content: &str) -> std::io::Result<PathBuf> {
        let path = self.repo.join(name);
        fs::write(&path, content)?;
        Ok(path)
    }

    pub fn write_host_file(&self, agent: Agent, content: &str) -> std::io::Result<PathBuf> {
        let path = self.host_path(agent);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    pub fn read_host_file(&self, agent: Agent) -> std::io::Result<String> {
        fs::read_to_string(self.host_path(agent))
    }

    /// `devstrap` binary with every path pointed into the fixture
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::new(env!("CARGO_BIN_EXE_devstrap"));
        cmd.current_dir(&self.repo)
            .env("HOME", &self.home)
            .env("XDG_CONFIG_HOME", &self.config_home)
            .env("XDG_DATA_HOME", self.home.join(".local").join("share"))
            .env_remove("CODEX_HOME")
            .env_remove("DEVSTRAP_REPO_DIR")
            .env_remove("DEVSTRAP_CONFIG")
            .env_remove("RUST_LOG");
        for agent in Agent::ALL {
            cmd.env(override_env_var(agent), self.host_path(agent));
        }
        cmd
    }
}
