//! Line-level handling of `[mcp_servers.<name>]` blocks in a Codex `config.toml`.
//!
//! Managed blocks are rendered by hand and spliced into the user's text, so comments,
//! key order and formatting outside those blocks survive untouched. The splice is
//! checked by re-parsing the result with the `toml` crate before anything is written.

use crate::format::json_to_toml_value;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt::Write as _;

const TRIPLE_BASIC: &str = "\"\"\"";
const TRIPLE_LITERAL: &str = "'''";

/// Quote a key unless it is a valid bare key.
pub fn toml_key(key: &str) -> String {
    let bare =
        !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if bare {
        key.to_string()
    } else {
        // JSON string escapes are a subset of TOML basic-string escapes.
        Value::String(key.to_string()).to_string()
    }
}

fn toml_inline(value: &Value) -> Option<String> {
    json_to_toml_value(value).map(|value| value.to_string())
}

/// Render one server as `[<table>.<name>]` followed by its scalar and array keys,
/// then one sub-table per object-valued key (`env`, `http_headers`).
///
/// Sub-tables must come last: a key written after `[<table>.<name>.env]` would be
/// read back as part of `env`.
pub fn render_block(table: &str, name: &str, record: &Map<String, Value>) -> String {
    let header = format!("{}.{}", toml_key(table), toml_key(name));
    let mut out = format!("[{header}]\n");

    for (key, value) in record.iter().filter(|(_, value)| !value.is_object()) {
        if let Some(encoded) = toml_inline(value) {
            let _ = writeln!(out, "{} = {encoded}", toml_key(key));
        }
    }

    for (key, value) in record {
        let Value::Object(entries) = value else {
            continue;
        };
        let _ = write!(out, "\n[{header}.{}]\n", toml_key(key));
        for (entry_key, entry_value) in entries {
            if let Some(encoded) = toml_inline(entry_value) {
                let _ = writeln!(out, "{} = {encoded}", toml_key(entry_key));
            }
        }
    }

    out
}

/// Key path of a `[table]` or `[[array]]` header line, `None` for any other line.
pub fn header_path(line: &str) -> Option<Vec<String>> {
    let line = line.trim();
    let (mut rest, array) = match line.strip_prefix("[[") {
        Some(rest) => (rest, true),
        None => (line.strip_prefix('[')?, false),
    };

    let mut keys = Vec::new();
    loop {
        rest = rest.trim_start();
        let (key, after) = if let Some(quoted) = rest.strip_prefix('"') {
            basic_key(quoted)?
        } else if let Some(quoted) = rest.strip_prefix('\'') {
            let end = quoted.find('\'')?;
            (quoted[..end].to_string(), &quoted[end + 1..])
        } else {
            let end = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
                .unwrap_or(rest.len());
            if end == 0 {
                return None;
            }
            (rest[..end].to_string(), &rest[end..])
        };
        keys.push(key);

        rest = after.trim_start();
        if let Some(next) = rest.strip_prefix('.') {
            rest = next;
            continue;
        }
        rest = rest.strip_prefix(']')?;
        if array {
            rest = rest.strip_prefix(']')?;
        }
        break;
    }

    let trailing = rest.trim_start();
    (trailing.is_empty() || trailing.starts_with('#')).then_some(keys)
}

/// A double-quoted key with the text after its closing quote.
fn basic_key(text: &str) -> Option<(String, &str)> {
    let mut key = String::new();
    let mut chars = text.char_indices();
    while let Some((index, c)) = chars.next() {
        match c {
            '"' => return Some((key, &text[index + 1..])),
            '\\' => match chars.next()?.1 {
                'n' => key.push('\n'),
                't' => key.push('\t'),
                'r' => key.push('\r'),
                other => key.push(other),
            },
            other => key.push(other),
        }
    }
    None
}

/// Tracks multi-line strings and arrays so a `[` inside a value is never taken for a
/// table header.
#[derive(Debug, Default)]
struct LineScanner {
    open_string: Option<&'static str>,
    depth: usize,
}

impl LineScanner {
    fn header(&mut self, line: &str) -> Option<Vec<String>> {
        if self.open_string.is_none() && self.depth == 0 {
            if let Some(path) = header_path(line) {
                return Some(path);
            }
        }
        self.consume(line);
        None
    }

    fn consume(&mut self, line: &str) {
        let bytes = line.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if let Some(delim) = self.open_string {
                match line.get(i..).and_then(|rest| rest.find(delim)) {
                    Some(end) => {
                        i += end + delim.len();
                        self.open_string = None;
                    },
                    None => return,
                }
                continue;
            }

            match bytes[i] {
                b'#' => return,
                quote @ (b'"' | b'\'') => {
                    let triple = if quote == b'"' { TRIPLE_BASIC } else { TRIPLE_LITERAL };
                    if line.get(i..).is_some_and(|rest| rest.starts_with(triple)) {
                        self.open_string = Some(triple);
                        i += triple.len();
                        continue;
                    }
                    i += 1;
                    while i < bytes.len() && bytes[i] != quote {
                        if quote == b'"' && bytes[i] == b'\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                    i += 1;
                },
                b'[' | b'{' => {
                    self.depth += 1;
                    i += 1;
                },
                b']' | b'}' => {
                    self.depth = self.depth.saturating_sub(1);
                    i += 1;
                },
                _ => i += 1,
            }
        }
    }
}

fn managed_name<'a>(path: &'a [String], table: &str) -> Option<&'a str> {
    match path {
        [first, name, ..] if first == table => Some(name.as_str()),
        _ => None,
    }
}

/// Drop every `[<table>.<name>]` block (and its `[<table>.<name>.*]` sub-tables) for
/// the given names. A block runs from its header to the next header; everything else
/// is returned byte for byte.
pub fn remove_managed_blocks(text: &str, table: &str, names: &BTreeSet<&str>) -> String {
    let mut scanner = LineScanner::default();
    let mut skipping = false;
    let mut out = String::with_capacity(text.len());

    for line in text.split_inclusive('\n') {
        if let Some(path) = scanner.header(line) {
            skipping = managed_name(&path, table).is_some_and(|name| names.contains(name));
        }
        if !skipping {
            out.push_str(line);
        }
    }

    out
}

/// Replace the blocks for `blocks`' names and append the new text after the preserved
/// content, one blank line between blocks. A CRLF document gets CRLF blocks.
pub fn splice_blocks<'a, I>(existing: &str, table: &str, blocks: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let blocks: Vec<(&str, &str)> = blocks.into_iter().collect();
    if blocks.is_empty() {
        return existing.to_string();
    }

    let names: BTreeSet<&str> = blocks.iter().map(|(name, _)| *name).collect();
    let preserved = remove_managed_blocks(existing, table, &names);
    let preserved = preserved.trim_end();

    let newline = if existing.contains("\r\n") { "\r\n" } else { "\n" };

    let mut out = String::new();
    if !preserved.is_empty() {
        out.push_str(preserved);
        out.push_str(newline);
        out.push_str(newline);
    }
    let rendered: Vec<String> =
        blocks.iter().map(|(_, text)| text.trim_end().replace('\n', newline)).collect();
    out.push_str(&rendered.join(newline.repeat(2).as_str()));
    out.push_str(newline);
    out
}
