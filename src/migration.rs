//! One-time upgrade from the two legacy files to the unified server list.

use crate::config::{
    decode_entry, reader, scalar_to_string, string_list, unified_path, writer, ServerEntry,
    UnifiedConfig, LEGACY_JSON_FILE_NAME, LEGACY_YAML_FILE_NAME,
};
use crate::format::{Capabilities, Format};
use crate::DevstrapError;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
pub struct MigrationOutcome {
    /// A unified file was written by this call.
    pub migrated: bool,
    pub unified_path: PathBuf,
    /// Entries in the written file.
    pub imported: usize,
    /// Legacy sources or entries that could not be used.
    pub issues: Vec<DevstrapError>,
}

/// A `mcps` item: a server that has to be cloned and built before use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyBuildEntry {
    pub name: String,
    pub repository: Option<String>,
    pub build_commands: Vec<String>,
}

/// Servers assembled from the legacy files, before anything is written.
#[derive(Debug, Default)]
pub struct LegacyImport {
    pub config: UnifiedConfig,
    /// Legacy files that existed and could be read.
    pub sources_read: usize,
    pub issues: Vec<DevstrapError>,
}

/// Whether `repo_dir` still needs migrating: no unified file, at least one legacy file.
pub fn needs_migration(repo_dir: &Path) -> bool {
    !unified_path(repo_dir).exists()
        && (repo_dir.join(LEGACY_JSON_FILE_NAME).exists()
            || repo_dir.join(LEGACY_YAML_FILE_NAME).exists())
}

/// Read both legacy sources into one unified list.
///
/// Entries from the JSON map come first, in file order. Each YAML item then attaches
/// `repository`/`buildCommands` to the entry with the same name, or is appended as a
/// build-only entry. A repeated YAML name overwrites the build fields set by the
/// earlier item.
pub fn import_legacy(repo_dir: &Path, capabilities: Capabilities) -> LegacyImport {
    let json_path = repo_dir.join(LEGACY_JSON_FILE_NAME);
    let yaml_path = repo_dir.join(LEGACY_YAML_FILE_NAME);
    let mut import = LegacyImport::default();

    if json_path.exists() {
        match read_legacy_json(&json_path) {
            Ok((entries, issues)) => {
                info!("Importing {} server(s) from {}", entries.len(), json_path.display());
                entries.into_iter().for_each(|entry| import.config.upsert(entry));
                import.issues.extend(issues);
                import.sources_read += 1;
            },
            Err(e) => {
                warn!("Skipping legacy source: {e}");
                import.issues.push(e);
            },
        }
    }

    if yaml_path.exists() {
        let builds = capabilities
            .require(Format::Yaml, "legacy YAML migration")
            .and_then(|()| read_legacy_yaml(&yaml_path));
        match builds {
            Ok(builds) => {
                info!("Importing {} build definition(s) from {}", builds.len(), yaml_path.display());
                for build in builds {
                    if let Err(e) = attach_build(&mut import.config, build) {
                        warn!("Skipping legacy entry: {e}");
                        import.issues.push(e);
                    }
                }
                import.sources_read += 1;
            },
            Err(e) => {
                warn!("Skipping legacy source: {e}");
                import.issues.push(e);
            },
        }
    }

    import
}

/// Create the unified file from the legacy sources in `repo_dir`.
///
/// Does nothing when the unified file already exists, when neither legacy file
/// does, or when no legacy file could be read.
///
/// # Errors
///
/// Returns `DevstrapError::Write` if the unified file cannot be written. Unreadable
/// legacy sources are reported in `issues` instead.
pub fn migrate_legacy(
    repo_dir: &Path,
    capabilities: Capabilities,
) -> Result<MigrationOutcome, DevstrapError> {
    if !needs_migration(repo_dir) {
        debug!("No migration needed in {}", repo_dir.display());
        return Ok(MigrationOutcome { unified_path: unified_path(repo_dir), ..Default::default() });
    }

    let mut import = import_legacy(repo_dir, capabilities);
    persist_import(repo_dir, &mut import, capabilities)
}

/// Write an already assembled import as the unified file of `repo_dir`.
///
/// On success the import's issues move into the outcome. On failure `import` is
/// left untouched so the caller can still use the servers it holds.
///
/// # Errors
///
/// Returns `DevstrapError::Write` if the unified file cannot be written.
pub fn persist_import(
    repo_dir: &Path,
    import: &mut LegacyImport,
    capabilities: Capabilities,
) -> Result<MigrationOutcome, DevstrapError> {
    let unified = unified_path(repo_dir);
    let mut outcome = MigrationOutcome { unified_path: unified.clone(), ..Default::default() };

    if import.sources_read == 0 {
        warn!("No legacy source could be read; leaving {} absent", unified.display());
        outcome.issues = std::mem::take(&mut import.issues);
        return Ok(outcome);
    }

    writer::write_unified(&unified, &import.config, capabilities)?;
    info!("Migrated {} server(s) to {}", import.config.len(), unified.display());

    outcome.migrated = true;
    outcome.imported = import.config.len();
    outcome.issues = std::mem::take(&mut import.issues);
    Ok(outcome)
}

fn attach_build(config: &mut UnifiedConfig, build: LegacyBuildEntry) -> Result<(), DevstrapError> {
    if let Some(existing) = config.get_mut(&build.name) {
        if build.repository.is_some() {
            existing.repository = build.repository;
        }
        if !build.build_commands.is_empty() {
            existing.build_commands = build.build_commands;
        }
        return Ok(());
    }

    // The unified loader rejects entries with no url, command or repository.
    if build.repository.is_none() {
        return Err(DevstrapError::invalid_entry(
            build.name,
            "no matching server and no repository to build",
        ));
    }

    let mut entry = ServerEntry::build_only(build.name);
    entry.repository = build.repository;
    entry.build_commands = build.build_commands;
    config.upsert(entry);
    Ok(())
}

/// Read the legacy `mcpServers` map. Every entry is enabled and unrestricted.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or its root is not an object.
pub fn read_legacy_json(
    path: &Path,
) -> Result<(Vec<ServerEntry>, Vec<DevstrapError>), DevstrapError> {
    let document = reader::read_document(path, Format::Json)?.unwrap_or(Value::Null);
    let servers = match document.get("mcpServers") {
        None | Some(Value::Null) => return Ok((Vec::new(), Vec::new())),
        Some(Value::Object(servers)) => servers,
        Some(_) => return Err(DevstrapError::parse(path, "'mcpServers' must be an object")),
    };

    let mut entries = Vec::new();
    let mut issues = Vec::new();
    for (index, (name, server)) in servers.iter().enumerate() {
        let Value::Object(fields) = server else {
            issues.push(DevstrapError::invalid_entry(name.as_str(), "entry is not an object"));
            continue;
        };
        let mut record = fields.clone();
        record.insert("name".into(), Value::String(name.clone()));

        match decode_entry(index, &Value::Object(record)) {
            Ok((mut entry, _)) => {
                entry.enabled = true;
                entry.agents.clear();
                entries.push(entry);
            },
            Err(e) => {
                warn!("Skipping legacy entry: {e}");
                issues.push(e);
            },
        }
    }

    Ok((entries, issues))
}

/// Read the legacy `mcps` build list.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or `mcps` is not a sequence.
pub fn read_legacy_yaml(path: &Path) -> Result<Vec<LegacyBuildEntry>, DevstrapError> {
    let document = reader::read_document(path, Format::Yaml)?.unwrap_or(Value::Null);
    let items = match document.get("mcps") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(DevstrapError::parse(path, "'mcps' must be a sequence")),
    };

    let mut builds = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let Some(name) = item.get("name").and_then(scalar_to_string) else {
            warn!("Skipping mcps[{index}] in {}: missing name", path.display());
            continue;
        };
        let repository = item
            .get("repository")
            .and_then(scalar_to_string)
            .filter(|repo| !repo.trim().is_empty());
        let build_commands = match string_list("buildCommands", item.get("buildCommands")) {
            Ok(commands) => commands,
            Err(reason) => {
                warn!("Skipping mcps[{index}] ({name}) in {}: {reason}", path.display());
                continue;
            },
        };
        builds.push(LegacyBuildEntry { name, repository, build_commands });
    }

    Ok(builds)
}
