use crate::fixtures::TestFixture;
use devstrap::agent::Agent;
use devstrap::agent_paths::override_env_var;
use devstrap::app_config::AppConfig;
use devstrap::sync_operations::target_path;
use serial_test::serial;
use std::path::PathBuf;

/// Restores the environment variables a test touched
struct EnvGuard {
    saved: Vec<(&'static str, Option<String>)>,
}

impl EnvGuard {
    fn new(names: &[&'static str]) -> Self {
        Self { saved: names.iter().map(|name| (*name, std::env::var(name).ok())).collect() }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, value) in &self.saved {
            match value {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial]
    fn test_app_config_path_is_resolved_against_home() {
        let _guard = EnvGuard::new(&[override_env_var(Agent::Codex), "CODEX_HOME"]);
        std::env::set_var(override_env_var(Agent::Codex), "/from/env/config.toml");
        let fixture = TestFixture::new().unwrap();
        let config: AppConfig =
            toml::from_str("[targets.codex]\npath = \"~/work/codex.toml\"\n").unwrap();

        let path = target_path(Agent::Codex, &fixture.resolver(), Some(&config));

        assert_eq!(path, fixture.home.join("work").join("codex.toml"));
    }

    #[test]
    #[serial]
    fn test_environment_override_then_default() {
        let _guard = EnvGuard::new(&[override_env_var(Agent::Cursor), override_env_var(Agent::Claude)]);
        std::env::remove_var(override_env_var(Agent::Claude));
        let fixture = TestFixture::new().unwrap();
        let resolver = fixture.resolver();

        std::env::set_var(override_env_var(Agent::Cursor), "/from/env/mcp.json");
        assert_eq!(target_path(Agent::Cursor, &resolver, None), PathBuf::from("/from/env/mcp.json"));

        std::env::remove_var(override_env_var(Agent::Cursor));
        assert_eq!(target_path(Agent::Cursor, &resolver, None), fixture.host_path(Agent::Cursor));
        assert_eq!(target_path(Agent::Claude, &resolver, None), fixture.host_path(Agent::Claude));
    }
}
