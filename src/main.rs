#![allow(missing_docs)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use devstrap::{
    agent::Agent,
    app_config::AppConfig,
    bootstrap,
    cli::{self, Cli, SourceArgs},
    config::{reader, unified_path},
    migration,
    paths::{HostEnvironment, PathResolver},
    projector::project,
    sync_operations::{reconcile, target_path, ReconcileSummary, SyncOptions, TargetStatus},
    validation::validate_unified,
};
use std::path::PathBuf;
use tracing::{debug, error, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(cli.debug, cli.trace);

    if cli.list_commands {
        print_available_commands();
        return Ok(());
    }

    let Some(command) = cli.command else {
        Cli::command().print_help().context("failed to print top-level help")?;
        println!();
        return Ok(());
    };

    let app_config = load_and_log_config()?;
    let resolver = PathResolver::new(HostEnvironment::detect()?)?;

    dispatch_command(command, app_config.as_ref(), &resolver)
}

/// Initialize tracing with the specified debug/trace flags
fn initialize_tracing(debug: bool, trace: bool) {
    let log_level = if trace {
        Level::TRACE
    } else if debug {
        Level::DEBUG
    } else {
        Level::WARN
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::builder().with_default_directive(log_level.into()).from_env_lossy())
        .init();
}

/// Load application configuration and log its status
fn load_and_log_config() -> Result<Option<AppConfig>> {
    let app_config = AppConfig::load().context("Failed to load app configuration")?;

    if let Some(ref config) = app_config {
        debug!("Loaded app configuration from: {}", AppConfig::config_path()?.display());
        for id in config.unknown_targets() {
            warn!("Ignoring unknown target '{id}' in app configuration");
        }
    } else {
        debug!("No app configuration file found at: {}", AppConfig::config_path()?.display());
    }

    Ok(app_config)
}

/// Dispatch to the appropriate command handler
fn dispatch_command(
    command: cli::Commands,
    app_config: Option<&AppConfig>,
    resolver: &PathResolver,
) -> Result<()> {
    match command {
        cli::Commands::Sync(args) => run_sync(args, app_config, resolver),
        cli::Commands::Migrate(args) => run_migrate(&args.source, app_config, resolver),
        cli::Commands::Validate(args) => run_validate(&args, app_config, resolver),
        cli::Commands::List(args) => run_list(&args.source, app_config, resolver),
        cli::Commands::Init(args) => run_init(args.repo, args.force, app_config, resolver),
    }
}

fn print_available_commands() {
    let root = Cli::command();
    println!("Available commands:");
    for subcommand in root.get_subcommands() {
        let name = subcommand.get_name();
        let about = subcommand
            .get_about()
            .or_else(|| subcommand.get_long_about())
            .map_or_else(|| String::from("(no description)"), std::string::ToString::to_string);
        println!("  {:<10} {}", name, about.trim());
    }
    println!();
    println!("Use `devstrap <command> --help` for detailed usage.");
}

/// Team repository: `--repo` / `DEVSTRAP_REPO_DIR`, then `repo-dir`, then the current directory.
fn resolve_repo_dir(
    repo: Option<PathBuf>,
    app_config: Option<&AppConfig>,
    resolver: &PathResolver,
) -> Result<PathBuf> {
    if let Some(repo) = repo {
        return Ok(repo);
    }
    if let Some(configured) = app_config.and_then(|config| config.repo_dir.as_deref()) {
        return Ok(PathBuf::from(resolver.resolve(configured)));
    }
    std::env::current_dir().context("Failed to get current directory")
}

fn sync_options(
    source: &SourceArgs,
    app_config: Option<&AppConfig>,
    resolver: &PathResolver,
) -> Result<SyncOptions> {
    let mut options = SyncOptions::new(resolve_repo_dir(source.repo.clone(), app_config, resolver)?);
    options.unified_path = source.config.clone();
    options.capabilities = source.capabilities();
    debug!("Team repository: {}", options.repo_dir.display());
    Ok(options)
}

fn run_sync(
    args: cli::SyncArgs,
    app_config: Option<&AppConfig>,
    resolver: &PathResolver,
) -> Result<()> {
    let mut options = sync_options(&args.source, app_config, resolver)?;
    options.dry_run = args.dry_run;
    options.backup = args.backup || app_config.is_some_and(|config| config.backup);
    options.agents = args.targets;

    let summary = reconcile(&options, app_config, resolver);
    print_summary(&summary, options.dry_run);
    Ok(())
}

fn print_summary(summary: &ReconcileSummary, dry_run: bool) {
    if let Some(migration) = summary.migration.as_ref().filter(|m| m.migrated) {
        println!(
            "Migrated {} server(s) from legacy files to {}",
            migration.imported,
            migration.unified_path.display()
        );
    }
    for issue in &summary.source_issues {
        println!("  ! {issue}");
    }

    println!("{} server(s) in the team list", summary.servers);
    for target in &summary.targets {
        println!(
            "{:<16} {:<13} {}",
            target.agent.descriptor().display_name,
            target.status.label(),
            target.path.display()
        );
        match &target.status {
            TargetStatus::Skipped(reason) => println!("    {reason}"),
            TargetStatus::Failed(e) => println!("    {e:#}"),
            _ => {},
        }
        if let Some(report) = &target.report {
            for (label, names) in [
                ("added", &report.added),
                ("updated", &report.updated),
                ("kept", &report.preserved),
            ] {
                if !names.is_empty() {
                    println!("    {label}: {}", names.join(", "));
                }
            }
        }
        if let Some(backup) = &target.backup {
            println!("    backup: {}", backup.display());
        }
        for entry in &target.skipped_entries {
            println!("    ! {entry}");
        }
    }

    if dry_run {
        println!("Dry run: no files were written");
    }
    if summary.has_failures() {
        error!("Some host configs could not be written");
    }
}

fn run_migrate(
    source: &SourceArgs,
    app_config: Option<&AppConfig>,
    resolver: &PathResolver,
) -> Result<()> {
    let options = sync_options(source, app_config, resolver)?;
    let outcome = migration::migrate_legacy(&options.repo_dir, options.capabilities)
        .context("Failed to write the unified server list")?;

    for issue in &outcome.issues {
        println!("  ! {issue}");
    }
    if outcome.migrated {
        println!("Migrated {} server(s) to {}", outcome.imported, outcome.unified_path.display());
    } else if outcome.unified_path.exists() {
        println!("{} already exists; nothing to migrate", outcome.unified_path.display());
    } else {
        println!("No legacy configuration found in {}", options.repo_dir.display());
    }
    Ok(())
}

fn run_validate(
    args: &cli::ValidateArgs,
    app_config: Option<&AppConfig>,
    resolver: &PathResolver,
) -> Result<()> {
    let options = sync_options(&args.source, app_config, resolver)?;
    let path = options.source_path();
    println!("Validating {}", path.display());

    let result = validate_unified(&path, options.capabilities)
        .with_context(|| format!("Failed to validate {}", path.display()))?;

    for message in &result.errors {
        println!("  ✗ {message}");
    }
    for message in &result.warnings {
        println!("  ! {message}");
    }

    if result.passed(args.strict) {
        println!("✓ {} server(s) valid", result.servers);
        Ok(())
    } else {
        anyhow::bail!(
            "Validation failed with {} error(s) and {} warning(s)",
            result.errors.len(),
            result.warnings.len()
        )
    }
}

fn run_list(
    source: &SourceArgs,
    app_config: Option<&AppConfig>,
    resolver: &PathResolver,
) -> Result<()> {
    let options = sync_options(source, app_config, resolver)?;
    let path = options.source_path();
    let decoded = reader::load_unified(&path, options.capabilities)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    let names: Vec<Vec<String>> = Agent::ALL
        .iter()
        .map(|agent| {
            project(&decoded.config, *agent, resolver)
                .fragment
                .names()
                .into_iter()
                .map(str::to_string)
                .collect()
        })
        .collect();

    print!("{:<24}", "SERVER");
    for agent in Agent::ALL {
        print!(" {:<9}", agent.id());
    }
    println!();
    for entry in decoded.config.servers() {
        print!("{:<24}", entry.name);
        for projected in &names {
            let mark = if projected.contains(&entry.name) { "✓" } else { "-" };
            print!(" {mark:<9}");
        }
        println!();
    }

    println!();
    for agent in Agent::ALL {
        println!("{:<9} {}", agent.id(), target_path(agent, resolver, app_config).display());
    }
    Ok(())
}

fn run_init(
    repo: Option<PathBuf>,
    force: bool,
    app_config: Option<&AppConfig>,
    resolver: &PathResolver,
) -> Result<()> {
    let repo_dir = resolve_repo_dir(repo, app_config, resolver)?;

    match bootstrap::bootstrap_unified(&repo_dir, force)? {
        Some(path) => {
            println!("Created {}", path.display());
            println!();
            println!("Next steps:");
            println!("  1. Edit the server list in: {}", path.display());
            println!("  2. Run 'devstrap validate' to check it");
            println!("  3. Run 'devstrap sync' to apply it to every host");
        },
        None => {
            println!(
                "{} already exists (use --force to overwrite)",
                unified_path(&repo_dir).display()
            );
        },
    }
    Ok(())
}
