//! Dump command implementation.

use super::state;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// One stored entry, prepared for display.
#[derive(Debug, Serialize, PartialEq)]
pub struct DumpEntry {
    /// Collection name.
    pub collection: String,
    /// Store key.
    pub key: String,
    /// Stored value parsed as JSON, or `null` when it is not JSON.
    pub value: Value,
    /// Stored value size in bytes.
    pub size: usize,
}

/// Collects every entry of the state file in collection and key order.
pub fn entries(path: &Path) -> Result<Vec<DumpEntry>, state::StateError> {
    let snapshot = state::load(path)?.snapshot();
    Ok(snapshot
        .collections
        .into_iter()
        .flat_map(|(collection, entries)| {
            entries.into_iter().map(move |(key, value)| DumpEntry {
                collection: collection.clone(),
                key,
                value: serde_json::from_slice(&value).unwrap_or(Value::Null),
                size: value.len(),
            })
        })
        .collect())
}

/// Runs the dump command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let entries = entries(path)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => print_text_output(&entries),
    }

    Ok(())
}

fn print_text_output(entries: &[DumpEntry]) {
    let mut current: Option<&str> = None;
    for entry in entries {
        if current != Some(entry.collection.as_str()) {
            println!("{}:", entry.collection);
            current = Some(entry.collection.as_str());
        }
        // Debug formatting makes composite key separators visible.
        println!("  {:?} ({} bytes) {}", entry.key, entry.size, entry.value);
    }
    if entries.is_empty() {
        println!("(empty)");
    }
}
