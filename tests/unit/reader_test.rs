use assert_fs::prelude::*;
use devstrap::config::reader;
use devstrap::config::Invocation;
use devstrap::format::{Capabilities, Format};
use devstrap::DevstrapError;
use rstest::rstest;

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest]
    #[case(
        "mcp-servers.yaml",
        "servers:\n  - name: fs\n    command: fsd\n    args: [\"-v\"]\n"
    )]
    #[case(
        "servers.json",
        r#"{"servers": [{"name": "fs", "command": "fsd", "args": ["-v"]}]}"#
    )]
    #[case(
        "servers.toml",
        "[[servers]]\nname = \"fs\"\ncommand = \"fsd\"\nargs = [\"-v\"]\n"
    )]
    fn test_unified_list_loads_from_any_format(#[case] file_name: &str, #[case] content: &str) {
        let temp_dir = assert_fs::TempDir::new().unwrap();
        let file = temp_dir.child(file_name);
        file.write_str(content).unwrap();

        let decoded = reader::load_unified(file.path(), Capabilities::default()).unwrap();

        assert_eq!(decoded.config.len(), 1);
        let entry = decoded.config.get("fs").unwrap();
        assert!(entry.enabled);
        assert_eq!(
            entry.invocation,
            Some(Invocation::Local {
                command: "fsd".into(),
                args: vec!["-v".into()],
                env: std::collections::BTreeMap::new(),
            })
        );
    }

    #[test]
    fn test_missing_file_is_empty() {
        let temp_dir = assert_fs::TempDir::new().unwrap();

        let decoded = reader::load_unified(
            temp_dir.child("mcp-servers.yaml").path(),
            Capabilities::default(),
        )
        .unwrap();

        assert!(decoded.config.is_empty());
        assert!(decoded.issues.is_empty());
    }

    #[test]
    fn test_single_scalar_lists_are_restored() {
        let temp_dir = assert_fs::TempDir::new().unwrap();
        let file = temp_dir.child("mcp-servers.yaml");
        file.write_str(
            "servers:\n  - name: fs\n    command: fsd\n    args: --stdio\n    agents: codex\n",
        )
        .unwrap();

        let decoded = reader::load_unified(file.path(), Capabilities::default()).unwrap();
        let entry = decoded.config.get("fs").unwrap();

        assert_eq!(entry.agents, vec!["codex".to_string()]);
        assert!(matches!(
            &entry.invocation,
            Some(Invocation::Local { args, .. }) if args == &vec!["--stdio".to_string()]
        ));
    }

    #[test]
    fn test_last_duplicate_wins() {
        let temp_dir = assert_fs::TempDir::new().unwrap();
        let file = temp_dir.child("mcp-servers.yaml");
        file.write_str(
            "servers:\n  - name: fs\n    command: first\n  - name: other\n    url: https://o\n  - name: fs\n    command: second\n",
        )
        .unwrap();

        let decoded = reader::load_unified(file.path(), Capabilities::default()).unwrap();

        assert_eq!(decoded.config.len(), 2);
        assert_eq!(decoded.config.servers()[0].name, "fs");
        assert!(matches!(
            &decoded.config.get("fs").unwrap().invocation,
            Some(Invocation::Local { command, .. }) if command == "second"
        ));
    }

    #[test]
    fn test_invalid_entries_are_reported_not_fatal() {
        let temp_dir = assert_fs::TempDir::new().unwrap();
        let file = temp_dir.child("mcp-servers.yaml");
        file.write_str(
            "servers:\n  - name: both\n    url: https://x\n    command: y\n  - command: anonymous\n  - name: ok\n    url: https://ok\n",
        )
        .unwrap();

        let decoded = reader::load_unified(file.path(), Capabilities::default()).unwrap();

        assert_eq!(decoded.config.len(), 1);
        assert_eq!(decoded.issues.len(), 2);
        assert!(decoded
            .issues
            .iter()
            .all(|issue| matches!(issue, DevstrapError::InvalidEntry { .. })));
    }

    #[test]
    fn test_malformed_document_is_a_parse_error() {
        let temp_dir = assert_fs::TempDir::new().unwrap();
        let file = temp_dir.child("mcp-servers.yaml");
        file.write_str("servers: [unclosed\n").unwrap();

        let result = reader::load_unified(file.path(), Capabilities::default());

        assert!(matches!(result, Err(DevstrapError::ConfigParse { .. })));
    }

    #[test]
    fn test_unavailable_processor_is_reported() {
        let temp_dir = assert_fs::TempDir::new().unwrap();
        let file = temp_dir.child("servers.toml");
        file.write_str("servers = []\n").unwrap();

        let result =
            reader::load_unified(file.path(), Capabilities::default().without(Format::Toml));

        assert!(matches!(
            result,
            Err(DevstrapError::CapabilityUnavailable { format: Format::Toml, .. })
        ));
    }

    #[test]
    fn test_read_text_strips_byte_order_mark() {
        let temp_dir = assert_fs::TempDir::new().unwrap();
        let file = temp_dir.child("mcp.json");
        file.write_str("\u{feff}{}").unwrap();

        assert_eq!(reader::read_text(file.path()).unwrap().as_deref(), Some("{}"));
        assert_eq!(reader::read_text(temp_dir.child("absent.json").path()).unwrap(), None);
    }
}
