use crate::agent::Agent;
use crate::agent_paths;
use crate::app_config::AppConfig;
use crate::config::{reader, unified_path, writer, UnifiedConfig};
use crate::format::Capabilities;
use crate::merge::{merge_fragment, MergeReport};
use crate::migration::{self, MigrationOutcome};
use crate::paths::PathResolver;
use crate::projector::project;
use crate::DevstrapError;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Options for one reconcile run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub repo_dir: PathBuf,
    /// Unified file outside the repository (`--config`); disables migration.
    pub unified_path: Option<PathBuf>,
    /// Explicit `--target` selection; empty means every enabled host.
    pub agents: Vec<Agent>,
    pub dry_run: bool,
    pub backup: bool,
    pub capabilities: Capabilities,
}

impl SyncOptions {
    pub fn new<P: Into<PathBuf>>(repo_dir: P) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            unified_path: None,
            agents: Vec::new(),
            dry_run: false,
            backup: false,
            capabilities: Capabilities::default(),
        }
    }

    pub fn source_path(&self) -> PathBuf {
        self.unified_path.clone().unwrap_or_else(|| unified_path(&self.repo_dir))
    }
}

#[derive(Debug)]
pub enum TargetStatus {
    /// The file was written.
    Updated,
    /// The merged text equals the file on disk.
    Unchanged,
    /// Dry run: the file would have been written.
    Planned,
    /// Not attempted, or left untouched because it could not be merged safely.
    Skipped(DevstrapError),
    /// Disabled in the application config.
    Disabled,
    /// The merged text could not be written.
    Failed(anyhow::Error),
}

impl TargetStatus {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
            Self::Planned => "would update",
            Self::Skipped(_) => "skipped",
            Self::Disabled => "disabled",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(Debug)]
pub struct TargetOutcome {
    pub agent: Agent,
    pub path: PathBuf,
    pub status: TargetStatus,
    pub report: Option<MergeReport>,
    /// Eligible entries the projector could not render for this host.
    pub skipped_entries: Vec<DevstrapError>,
    pub backup: Option<PathBuf>,
}

impl TargetOutcome {
    fn new(agent: Agent, path: PathBuf, status: TargetStatus) -> Self {
        Self { agent, path, status, report: None, skipped_entries: Vec::new(), backup: None }
    }
}

/// Everything one run did, for the final report.
#[derive(Debug, Default)]
pub struct ReconcileSummary {
    pub migration: Option<MigrationOutcome>,
    /// Problems with the unified or legacy sources.
    pub source_issues: Vec<DevstrapError>,
    pub servers: usize,
    pub targets: Vec<TargetOutcome>,
}

impl ReconcileSummary {
    pub fn has_failures(&self) -> bool {
        self.targets.iter().any(|target| matches!(target.status, TargetStatus::Failed(_)))
    }

    pub fn count(&self, label: &str) -> usize {
        self.targets.iter().filter(|target| target.status.label() == label).count()
    }
}

/// Config path for `agent`: app-config override, then environment, then default.
pub fn target_path(agent: Agent, resolver: &PathResolver, app_config: Option<&AppConfig>) -> PathBuf {
    let explicit = app_config
        .and_then(|config| config.target_path(agent))
        .map(|path| PathBuf::from(resolver.resolve(&path.to_string_lossy())));
    agent_paths::config_path(agent, resolver.environment(), explicit.as_deref())
}

/// Hosts a run should visit, in a stable order.
pub fn selected_agents(options: &SyncOptions) -> Vec<Agent> {
    if options.agents.is_empty() {
        return Agent::ALL.to_vec();
    }
    let mut agents = options.agents.clone();
    agents.sort();
    agents.dedup();
    agents
}

/// Read the unified list, migrating legacy files first when needed.
///
/// On a dry run the legacy import is used in memory and nothing is written. If the
/// unified file cannot be written the import is used the same way.
pub fn load_sources(options: &SyncOptions, summary: &mut ReconcileSummary) -> UnifiedConfig {
    if options.unified_path.is_none() && migration::needs_migration(&options.repo_dir) {
        if options.dry_run {
            info!("Dry run: using legacy configuration without writing the unified file");
            let import = migration::import_legacy(&options.repo_dir, options.capabilities);
            summary.source_issues.extend(import.issues);
            return import.config;
        }

        let mut import = migration::import_legacy(&options.repo_dir, options.capabilities);
        match migration::persist_import(&options.repo_dir, &mut import, options.capabilities) {
            Ok(outcome) => summary.migration = Some(outcome),
            Err(e) => {
                error!("Legacy migration failed, using the imported servers without saving them: {e}");
                summary.source_issues.extend(import.issues);
                summary.source_issues.push(e);
                return import.config;
            },
        }
    }

    let source = options.source_path();
    match reader::load_unified(&source, options.capabilities) {
        Ok(decoded) => {
            summary.source_issues.extend(decoded.issues);
            decoded.config
        },
        Err(e) => {
            warn!("Treating the unified server list as empty: {e}");
            summary.source_issues.push(e);
            UnifiedConfig::new()
        },
    }
}

/// Project and merge `config` into one host's config file.
pub fn sync_target(
    agent: Agent,
    path: &Path,
    config: &UnifiedConfig,
    options: &SyncOptions,
    resolver: &PathResolver,
) -> TargetOutcome {
    let descriptor = agent.descriptor();
    let skip = |e: DevstrapError| {
        warn!("{}: {e}; leaving {} untouched", descriptor.display_name, path.display());
        TargetOutcome::new(agent, path.to_path_buf(), TargetStatus::Skipped(e))
    };

    if let Err(e) = options.capabilities.require(descriptor.shape.format(), descriptor.display_name) {
        return skip(e);
    }

    let projection = project(config, agent, resolver);

    let existing = match reader::read_text(path) {
        Ok(existing) => existing,
        Err(e) => return skip(e),
    };
    let merged = match merge_fragment(existing.as_deref(), descriptor, &projection.fragment, path) {
        Ok(merged) => merged,
        Err(e) => return skip(e),
    };

    let mut outcome = TargetOutcome::new(agent, path.to_path_buf(), TargetStatus::Unchanged);
    outcome.skipped_entries = projection.skipped;
    outcome.report = Some(merged.report);

    if existing.as_deref() == Some(merged.text.as_str()) {
        debug!("{}: {} is up to date", descriptor.display_name, path.display());
        return outcome;
    }

    if options.dry_run {
        info!("Dry run: would write {}", path.display());
        outcome.status = TargetStatus::Planned;
        return outcome;
    }

    if options.backup {
        match writer::backup_file(path) {
            Ok(backup) => outcome.backup = backup,
            Err(e) => {
                error!("{}: backup of {} failed: {e}", descriptor.display_name, path.display());
                outcome.status = TargetStatus::Failed(e.context("Failed to create backup"));
                return outcome;
            },
        }
    }

    outcome.status = match writer::write_atomic(path, &merged.text) {
        Ok(()) => {
            info!("{}: wrote {}", descriptor.display_name, path.display());
            TargetStatus::Updated
        },
        Err(e) => {
            error!("{}: {e}", descriptor.display_name);
            TargetStatus::Failed(e.into())
        },
    };
    outcome
}

/// Run the whole pipeline. Every failure is contained in the summary.
pub fn reconcile(
    options: &SyncOptions,
    app_config: Option<&AppConfig>,
    resolver: &PathResolver,
) -> ReconcileSummary {
    let mut summary = ReconcileSummary::default();
    let config = load_sources(options, &mut summary);
    summary.servers = config.len();
    debug!("Reconciling {} server(s)", config.len());

    for agent in selected_agents(options) {
        let path = target_path(agent, resolver, app_config);

        let disabled = options.agents.is_empty()
            && app_config.is_some_and(|app_config| !app_config.is_target_enabled(agent));
        if disabled {
            debug!("{agent} is disabled in the application config");
            summary.targets.push(TargetOutcome::new(agent, path, TargetStatus::Disabled));
            continue;
        }

        summary.targets.push(sync_target(agent, &path, &config, options, resolver));
    }

    summary
}
