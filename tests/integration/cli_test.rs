use crate::fixtures::TestFixture;
use predicates::prelude::*;
use serial_test::serial;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial]
    fn test_cli_help() {
        let fixture = TestFixture::new().unwrap();
        fixture.command().arg("--help").assert().success().stdout(predicate::str::contains(
            "devstrap reconciles one team-wide list of MCP (Model Context Protocol) servers",
        ));
    }

    #[test]
    #[serial]
    fn test_cli_without_command_prints_help() {
        let fixture = TestFixture::new().unwrap();
        fixture
            .command()
            .assert()
            .success()
            .stdout(predicate::str::contains("Usage:").and(predicate::str::contains("sync")));
    }

    #[test]
    #[serial]
    fn test_cli_list_commands() {
        let fixture = TestFixture::new().unwrap();
        fixture.command().arg("--list-commands").assert().success().stdout(
            predicate::str::contains("Available commands:")
                .and(predicate::str::contains("sync"))
                .and(predicate::str::contains("migrate"))
                .and(predicate::str::contains("validate"))
                .and(predicate::str::contains("list"))
                .and(predicate::str::contains("init"))
                .and(predicate::str::contains("Use `devstrap <command> --help`")),
        );
    }

    #[test]
    #[serial]
    fn test_cli_version() {
        let fixture = TestFixture::new().unwrap();
        fixture
            .command()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    #[serial]
    fn test_cli_rejects_unknown_target() {
        let fixture = TestFixture::new().unwrap();
        fixture
            .command()
            .args(["sync", "--target", "vscode"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid value 'vscode'"));
    }

    #[test]
    #[serial]
    fn test_cli_rejects_malformed_app_config() {
        let fixture = TestFixture::new().unwrap();
        let dir = fixture.config_home.join("devstrap");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.toml"), "backup = [unclosed").unwrap();

        fixture
            .command()
            .arg("sync")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to load app configuration"));
    }
}
