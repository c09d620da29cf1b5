use crate::fixtures::TestFixture;
use devstrap::config::UNIFIED_FILE_NAME;
use serial_test::serial;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial]
    fn test_list_shows_eligibility_matrix() {
        let fixture = TestFixture::new().unwrap();
        fixture
            .write_repo_file(
                UNIFIED_FILE_NAME,
                "servers:
  - name: everywhere
    command: a
  - name: codex-only
    command: b
    agents: [codex]
  - name: off
    enabled: false
    command: c
",
            )
            .unwrap();

        let output = fixture.command().arg("list").output().unwrap();
        assert!(output.status.success());
        let stdout = String::from_utf8(output.stdout).unwrap();

        let row = |name: &str| {
            stdout
                .lines()
                .find(|line| line.starts_with(name))
                .map(|line| line.split_whitespace().skip(1).collect::<Vec<_>>())
                .unwrap()
        };
        assert_eq!(row("SERVER"), vec!["cursor", "claude", "windsurf", "codex"]);
        assert_eq!(row("everywhere"), vec!["✓", "✓", "✓", "✓"]);
        assert_eq!(row("codex-only"), vec!["-", "-", "-", "✓"]);
        assert_eq!(row("off"), vec!["-", "-", "-", "-"]);

        // Host paths follow the matrix.
        let codex_path = fixture.host_path(devstrap::agent::Agent::Codex);
        assert!(stdout.contains(codex_path.to_string_lossy().as_ref()));
        assert!(!codex_path.exists());
    }
}
