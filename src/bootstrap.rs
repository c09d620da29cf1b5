use crate::config::{unified_path, writer};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default mcp-servers.yaml template
const DEFAULT_UNIFIED: &str = r#"# MCP servers shared by the team. Projected into every host's config by devstrap.
#
# Each entry needs a name and exactly one of `url` or `command`.
#   enabled  - false keeps the entry out of every host (default: true)
#   agents   - restrict to some hosts: cursor, claude (claude-desktop), windsurf, codex
#   args     - `~` and {LOCALAPPDATA} are expanded in command and args
#   headers  - sent by hosts that support remote headers (windsurf, codex)
#   startup_timeout_sec, tool_timeout_sec, enabled_tools, disabled_tools - codex only
servers:
  - name: filesystem
    command: npx
    args:
      - -y
      - "@modelcontextprotocol/server-filesystem"
      - ~/src
  - name: docs
    enabled: false
    agents:
      - cursor
      - codex
    url: https://mcp.example.com/sse
"#;

/// Write a starter unified file into `repo_dir`.
///
/// Returns the path written, or `None` when a file exists and `force` is false.
///
/// # Errors
///
/// Returns an error if:
/// - Unable to create the repository directory
/// - Unable to write the file
pub fn bootstrap_unified<P: AsRef<Path>>(repo_dir: P, force: bool) -> Result<Option<PathBuf>> {
    let repo_dir = repo_dir.as_ref();
    let path = unified_path(repo_dir);

    if path.exists() && !force {
        info!("{} already exists, skipping", path.display());
        return Ok(None);
    }

    fs::create_dir_all(repo_dir)
        .with_context(|| format!("Failed to create directory: {}", repo_dir.display()))?;
    writer::write_atomic(&path, DEFAULT_UNIFIED)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Created {}", path.display());

    Ok(Some(path))
}
