use crate::fixtures::TestFixture;
use devstrap::agent::Agent;
use devstrap::config::UNIFIED_FILE_NAME;
use devstrap::sync_operations::{reconcile, SyncOptions, TargetStatus};
use devstrap::DevstrapError;
use std::fs;

const UNIFIED: &str = "servers:\n  - name: fs\n    command: fsd\n";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_failure_is_contained_to_one_host() {
        let fixture = TestFixture::new().unwrap();
        fixture.write_repo_file(UNIFIED_FILE_NAME, UNIFIED).unwrap();
        // A plain file where the parent directory should be.
        let parent = fixture.host_path(Agent::Windsurf).parent().unwrap().to_path_buf();
        fs::create_dir_all(parent.parent().unwrap()).unwrap();
        fs::write(&parent, "").unwrap();

        let summary = reconcile(
            &SyncOptions::new(&fixture.repo),
            Some(&fixture.app_config()),
            &fixture.resolver(),
        );

        assert!(summary.has_failures());
        let windsurf = summary.targets.iter().find(|t| t.agent == Agent::Windsurf).unwrap();
        assert!(matches!(windsurf.status, TargetStatus::Failed(_)));
        assert_eq!(summary.count("updated"), 3);
        assert!(fixture.read_host_file(Agent::Codex).unwrap().contains("[mcp_servers.fs]"));
    }

    #[test]
    fn test_misshapen_host_document_is_skipped() {
        let fixture = TestFixture::new().unwrap();
        fixture.write_repo_file(UNIFIED_FILE_NAME, UNIFIED).unwrap();
        let original = "{\"mcpServers\": [\"not\", \"a\", \"map\"]}";
        fixture.write_host_file(Agent::Claude, original).unwrap();

        let summary = reconcile(
            &SyncOptions::new(&fixture.repo),
            Some(&fixture.app_config()),
            &fixture.resolver(),
        );

        let claude = summary.targets.iter().find(|t| t.agent == Agent::Claude).unwrap();
        assert!(matches!(
            claude.status,
            TargetStatus::Skipped(DevstrapError::ConfigParse { .. })
        ));
        assert_eq!(fixture.read_host_file(Agent::Claude).unwrap(), original);
        assert!(!summary.has_failures());
        assert_eq!(summary.count("updated"), 3);
    }

    #[test]
    fn test_dry_run_then_real_run() {
        let fixture = TestFixture::new().unwrap();
        fixture.write_repo_file(UNIFIED_FILE_NAME, UNIFIED).unwrap();
        let app_config = fixture.app_config();
        let resolver = fixture.resolver();
        let mut options = SyncOptions::new(&fixture.repo);
        options.dry_run = true;
        options.agents = vec![Agent::Codex];

        let planned = reconcile(&options, Some(&app_config), &resolver);
        assert_eq!(planned.targets.len(), 1);
        assert_eq!(planned.count("would update"), 1);
        assert!(!fixture.host_path(Agent::Codex).exists());

        options.dry_run = false;
        let applied = reconcile(&options, Some(&app_config), &resolver);
        assert_eq!(applied.count("updated"), 1);
        let report = applied.targets[0].report.as_ref().unwrap();
        assert_eq!(report.added, vec!["fs".to_string()]);
    }
}
