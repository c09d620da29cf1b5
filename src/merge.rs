//! Reconciliation of a projected fragment with a host's existing document.
//!
//! The fragment wins for every name it carries. Names only present on disk are kept,
//! and nothing outside the managed section is touched.

use crate::agent::{AgentDescriptor, DocumentShape};
use crate::codex_toml::splice_blocks;
use crate::format::{emit_document, parse_document, Format};
use crate::projector::{TargetFragment, TomlBlock};
use crate::DevstrapError;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

/// Per-name outcome of one merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
    /// Names already on disk that the fragment does not carry.
    pub preserved: Vec<String>,
}

impl MergeReport {
    /// Whether the managed section would be left as it is.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty()
    }

    fn classify(&mut self, name: &str, existing: Option<&Value>, incoming: Option<&Value>) {
        let bucket = match existing {
            None => &mut self.added,
            Some(current) if Some(current) == incoming => &mut self.unchanged,
            Some(_) => &mut self.updated,
        };
        bucket.push(name.to_string());
    }

    fn collect_preserved<'a, I>(&mut self, existing: &Map<String, Value>, incoming: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let incoming: Vec<&str> = incoming.into_iter().collect();
        self.preserved = existing
            .keys()
            .filter(|name| !incoming.contains(&name.as_str()))
            .cloned()
            .collect();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Full document text to write.
    pub text: String,
    pub report: MergeReport,
}

/// Merge `fragment` into the host document `existing` (`None` when the file is absent).
///
/// When nothing is added or updated the existing text is returned as is, so a
/// reconciled file keeps the user's formatting.
///
/// # Errors
///
/// Returns an error if:
/// - The existing document does not parse
/// - Its root or managed section is not a table/object
/// - The merged TOML no longer parses
pub fn merge_fragment(
    existing: Option<&str>,
    descriptor: &AgentDescriptor,
    fragment: &TargetFragment,
    origin: &Path,
) -> Result<MergeOutcome, DevstrapError> {
    match (descriptor.shape, fragment) {
        (DocumentShape::JsonMap { managed_key }, TargetFragment::JsonMap(records)) => {
            merge_json(existing, managed_key, records, origin)
        },
        (DocumentShape::TomlTables { table }, TargetFragment::TomlBlocks(blocks)) => {
            merge_toml(existing, table, blocks, origin)
        },
        (shape, _) => Err(DevstrapError::Serialize {
            format: shape.format(),
            message: format!("fragment does not match the {} document shape", descriptor.display_name),
        }),
    }
}

fn managed_section(
    document: &Value,
    key: &str,
    origin: &Path,
) -> Result<Map<String, Value>, DevstrapError> {
    match document.get(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(section)) => Ok(section.clone()),
        Some(_) => Err(DevstrapError::parse(origin, format!("'{key}' is not a map"))),
    }
}

fn merge_json(
    existing: Option<&str>,
    managed_key: &str,
    records: &Map<String, Value>,
    origin: &Path,
) -> Result<MergeOutcome, DevstrapError> {
    let mut document = parse_document(Format::Json, existing.unwrap_or_default(), origin)?;
    let mut managed = managed_section(&document, managed_key, origin)?;
    let Value::Object(root) = &mut document else {
        return Err(DevstrapError::parse(origin, "expected a JSON object at the document root"));
    };

    let mut report = MergeReport::default();
    report.collect_preserved(&managed, records.keys().map(String::as_str));
    for (name, record) in records {
        report.classify(name, managed.get(name), Some(record));
        managed.insert(name.clone(), record.clone());
    }

    if let Some(text) = existing.filter(|_| report.is_noop()) {
        debug!("{}: managed section already up to date", origin.display());
        return Ok(MergeOutcome { text: text.to_string(), report });
    }

    root.insert(managed_key.to_string(), Value::Object(managed));
    let text = emit_document(Format::Json, &document)?;
    Ok(MergeOutcome { text, report })
}

fn merge_toml(
    existing: Option<&str>,
    table: &str,
    blocks: &[TomlBlock],
    origin: &Path,
) -> Result<MergeOutcome, DevstrapError> {
    let current_text = existing.unwrap_or_default();
    let document = parse_document(Format::Toml, current_text, origin)?;
    let managed = managed_section(&document, table, origin)?;

    let mut report = MergeReport::default();
    report.collect_preserved(&managed, blocks.iter().map(|block| block.name.as_str()));
    for block in blocks {
        let rendered = parse_document(Format::Toml, &block.text, origin)?;
        let incoming = rendered.get(table).and_then(|section| section.get(&block.name));
        report.classify(&block.name, managed.get(&block.name), incoming);
    }

    if let Some(text) = existing.filter(|_| report.is_noop()) {
        debug!("{}: managed blocks already up to date", origin.display());
        return Ok(MergeOutcome { text: text.to_string(), report });
    }

    let text = splice_blocks(
        current_text,
        table,
        blocks.iter().map(|block| (block.name.as_str(), block.text.as_str())),
    );

    // The splice is textual; make sure the result is still a valid document.
    parse_document(Format::Toml, &text, origin).map_err(|e| DevstrapError::Serialize {
        format: Format::Toml,
        message: format!("merged document no longer parses: {e}"),
    })?;

    Ok(MergeOutcome { text, report })
}
