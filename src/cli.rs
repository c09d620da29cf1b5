use crate::agent::Agent;
use crate::format::{Capabilities, Format};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "devstrap",
    about = "Developer environment bootstrap - reconcile the team's MCP servers into every host config",
    long_about = "devstrap reconciles one team-wide list of MCP (Model Context Protocol) servers
into the native configuration of each host application.

The team configuration repository holds:
  • mcp-servers.yaml: unified server list (source of truth)
  • mcp.json / mcps.yaml: legacy files, migrated once when no unified file exists

Target files:
  • Cursor: ~/.cursor/mcp.json
  • Claude Desktop: <config dir>/Claude/claude_desktop_config.json
  • Windsurf: ~/.codeium/windsurf/mcp_config.json
  • Codex CLI: ~/.codex/config.toml (or $CODEX_HOME/config.toml)

Entries you added to those files yourself are never removed.",
    version,
    author
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable debug output (shows INFO and DEBUG messages)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Enable trace output (shows all log messages including TRACE)
    #[arg(short = 't', long, global = true)]
    pub trace: bool,

    /// List available commands and exit
    #[arg(long = "list-commands", global = true)]
    pub list_commands: bool,
}

/// Format processors that can be switched off.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processor {
    Yaml,
    Toml,
}

impl From<Processor> for Format {
    fn from(processor: Processor) -> Self {
        match processor {
            Processor::Yaml => Self::Yaml,
            Processor::Toml => Self::Toml,
        }
    }
}

/// Where the server list comes from
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Team configuration repository
    #[arg(short, long, env = "DEVSTRAP_REPO_DIR", value_hint = clap::ValueHint::DirPath)]
    pub repo: Option<PathBuf>,

    /// Unified server list outside the repository (.yaml, .json or .toml)
    #[arg(short, long, env = "DEVSTRAP_CONFIG", value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Treat a format processor as unavailable
    #[arg(long, value_enum, value_name = "FORMAT")]
    pub without: Vec<Processor>,
}

impl SourceArgs {
    pub fn capabilities(&self) -> Capabilities {
        self.without
            .iter()
            .fold(Capabilities::default(), |caps, processor| caps.without((*processor).into()))
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Project the unified server list into every host config
    #[command(long_about = "Project the unified server list into every host config.

This command:
  1. Migrates mcp.json / mcps.yaml to mcp-servers.yaml if no unified file exists
  2. Loads mcp-servers.yaml, dropping invalid entries with a warning
  3. For each host, keeps the servers enabled for it, resolves ~ and {LOCALAPPDATA}
     in commands and arguments, and merges them into the host's config file

Servers already present in a host file but absent from the team list are kept.

Examples:
  # Sync every host
  devstrap sync --repo ~/src/team-config

  # Preview changes without writing
  devstrap sync --dry-run

  # Only Codex, backing up config.toml first
  devstrap sync --target codex --backup")]
    Sync(SyncArgs),

    /// Convert legacy mcp.json / mcps.yaml into mcp-servers.yaml
    #[command(long_about = "Convert legacy mcp.json / mcps.yaml into mcp-servers.yaml.

Nothing is written when mcp-servers.yaml already exists.")]
    Migrate(MigrateArgs),

    /// Check the unified server list
    Validate(ValidateArgs),

    /// Show which servers each host receives
    List(ListArgs),

    /// Write a starter mcp-servers.yaml
    #[command(long_about = "Write a starter mcp-servers.yaml into the repository.

By default an existing file is preserved. Use --force to overwrite it.

Examples:
  devstrap init --repo ~/src/team-config
  devstrap init --force")]
    Init(InitArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Preview changes without writing them
    #[arg(short, long)]
    pub dry_run: bool,

    /// Create timestamped backup of each host config before changing it
    #[arg(short, long)]
    pub backup: bool,

    /// Only sync these hosts (repeatable)
    #[arg(short = 'T', long = "target", value_enum)]
    pub targets: Vec<Agent>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Treat warnings (unknown fields, unknown agent tags) as errors
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct InitArgs {
    /// Team configuration repository
    #[arg(short, long, env = "DEVSTRAP_REPO_DIR", value_hint = clap::ValueHint::DirPath)]
    pub repo: Option<PathBuf>,

    /// Overwrite an existing unified file
    #[arg(short, long)]
    pub force: bool,
}
