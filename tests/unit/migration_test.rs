use crate::fixtures::TestFixture;
use devstrap::agent::Agent;
use devstrap::config::reader::load_unified;
use devstrap::config::{Invocation, LEGACY_JSON_FILE_NAME, LEGACY_YAML_FILE_NAME, UNIFIED_FILE_NAME};
use devstrap::format::{Capabilities, Format};
use devstrap::migration::migrate_legacy;
use devstrap::sync_operations::{reconcile, SyncOptions};
use devstrap::DevstrapError;
use serde_json::Value;
use std::fs;

const LEGACY_JSON: &str = r#"{
  "mcpServers": {
    "github": {
      "command": "npx",
      "args": ["-y", "@modelcontextprotocol/server-github"],
      "env": {"GITHUB_TOKEN": "${GITHUB_TOKEN}"}
    },
    "local-tools": {
      "command": "~/bin/tools-mcp",
      "args": "--stdio"
    }
  }
}"#;

const LEGACY_YAML: &str = r"mcps:
  - name: local-tools
    repository: https://git.example.com/team/tools-mcp.git
    buildCommands:
      - cargo build --release
  - name: vendored
    repository: https://git.example.com/team/vendored.git
    buildCommands: make
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_merges_both_legacy_files() {
        let fixture = TestFixture::new().unwrap();
        fixture.write_repo_file(LEGACY_JSON_FILE_NAME, LEGACY_JSON).unwrap();
        fixture.write_repo_file(LEGACY_YAML_FILE_NAME, LEGACY_YAML).unwrap();

        let outcome = migrate_legacy(&fixture.repo, Capabilities::default()).unwrap();

        assert!(outcome.migrated);
        assert_eq!(outcome.imported, 3);
        assert!(outcome.issues.is_empty());

        let decoded = load_unified(&outcome.unified_path, Capabilities::default()).unwrap();
        let names: Vec<&str> =
            decoded.config.servers().iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names, vec!["github", "local-tools", "vendored"]);

        let tools = decoded.config.get("local-tools").unwrap();
        assert!(tools.enabled);
        assert!(tools.agents.is_empty());
        assert_eq!(
            tools.repository.as_deref(),
            Some("https://git.example.com/team/tools-mcp.git")
        );
        assert!(matches!(
            &tools.invocation,
            Some(Invocation::Local { args, .. }) if args == &vec!["--stdio".to_string()]
        ));

        let vendored = decoded.config.get("vendored").unwrap();
        assert!(vendored.invocation.is_none());
        assert_eq!(vendored.build_commands, vec!["make".to_string()]);
    }

    #[test]
    fn test_existing_unified_file_blocks_migration() {
        let fixture = TestFixture::new().unwrap();
        fixture.write_repo_file(LEGACY_JSON_FILE_NAME, LEGACY_JSON).unwrap();
        let unified = fixture.write_repo_file(UNIFIED_FILE_NAME, "servers: []\n").unwrap();

        let outcome = migrate_legacy(&fixture.repo, Capabilities::default()).unwrap();

        assert!(!outcome.migrated);
        assert_eq!(fs::read_to_string(unified).unwrap(), "servers: []\n");
    }

    #[test]
    fn test_sync_migrates_then_projects() {
        let fixture = TestFixture::new().unwrap();
        fixture.write_repo_file(LEGACY_JSON_FILE_NAME, LEGACY_JSON).unwrap();
        fixture.write_repo_file(LEGACY_YAML_FILE_NAME, LEGACY_YAML).unwrap();

        let summary = reconcile(
            &SyncOptions::new(&fixture.repo),
            Some(&fixture.app_config()),
            &fixture.resolver(),
        );

        assert!(summary.migration.as_ref().is_some_and(|m| m.migrated));
        assert!(fixture.repo.join(UNIFIED_FILE_NAME).exists());
        assert_eq!(summary.servers, 3);

        let cursor: Value =
            serde_json::from_str(&fixture.read_host_file(Agent::Cursor).unwrap()).unwrap();
        let servers = cursor["mcpServers"].as_object().unwrap();
        // The build-only entry never reaches a host.
        assert_eq!(servers.len(), 2);
        assert_eq!(
            servers["local-tools"]["command"],
            fixture.home.join("bin/tools-mcp").to_string_lossy().as_ref()
        );
        assert_eq!(servers["github"]["env"]["GITHUB_TOKEN"], "${GITHUB_TOKEN}");
    }

    #[test]
    fn test_dry_run_sync_reads_legacy_without_writing() {
        let fixture = TestFixture::new().unwrap();
        fixture.write_repo_file(LEGACY_JSON_FILE_NAME, LEGACY_JSON).unwrap();
        let mut options = SyncOptions::new(&fixture.repo);
        options.dry_run = true;

        let summary = reconcile(&options, Some(&fixture.app_config()), &fixture.resolver());

        assert!(summary.migration.is_none());
        assert_eq!(summary.servers, 2);
        assert_eq!(summary.count("would update"), 4);
        assert!(!fixture.repo.join(UNIFIED_FILE_NAME).exists());
        assert!(!fixture.host_path(Agent::Cursor).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_sync_uses_legacy_servers_when_unified_file_cannot_be_written() {
        let fixture = TestFixture::new().unwrap();
        fixture.write_repo_file(LEGACY_JSON_FILE_NAME, LEGACY_JSON).unwrap();
        // The unified path points below a plain file, so it reads as absent and cannot be written.
        fixture.write_repo_file("blocker", "").unwrap();
        std::os::unix::fs::symlink(
            fixture.repo.join("blocker").join(UNIFIED_FILE_NAME),
            fixture.repo.join(UNIFIED_FILE_NAME),
        )
        .unwrap();

        let summary = reconcile(
            &SyncOptions::new(&fixture.repo),
            Some(&fixture.app_config()),
            &fixture.resolver(),
        );

        assert!(summary.migration.is_none());
        assert!(summary.source_issues.iter().any(|e| matches!(e, DevstrapError::Write { .. })));
        assert_eq!(summary.servers, 2);
        let cursor: Value =
            serde_json::from_str(&fixture.read_host_file(Agent::Cursor).unwrap()).unwrap();
        let servers = cursor["mcpServers"].as_object().unwrap();
        assert!(servers.contains_key("github"));
        assert!(servers.contains_key("local-tools"));
    }

    #[test]
    fn test_legacy_yaml_is_skipped_without_yaml_support() {
        let fixture = TestFixture::new().unwrap();
        fixture.write_repo_file(LEGACY_JSON_FILE_NAME, LEGACY_JSON).unwrap();
        fixture.write_repo_file(LEGACY_YAML_FILE_NAME, LEGACY_YAML).unwrap();
        let caps = Capabilities::default().without(Format::Yaml);

        let outcome = migrate_legacy(&fixture.repo, caps).unwrap();

        assert!(outcome.migrated);
        assert_eq!(outcome.imported, 2);
        assert_eq!(outcome.issues.len(), 1);
        // Written line by line, still readable once YAML is available again.
        let decoded = load_unified(&outcome.unified_path, Capabilities::default()).unwrap();
        assert_eq!(decoded.config.len(), 2);
        assert!(decoded.config.get("local-tools").unwrap().repository.is_none());
    }
}
