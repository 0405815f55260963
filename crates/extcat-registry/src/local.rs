//! Hand-maintained catalog entries kept next to the generated ones.

use std::{fs, path::Path};

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::{ErrorContext, Result};

/// Reads a YAML sequence of mappings and assigns each entry `id = offset + index`.
///
/// `index` counts every element of the sequence, so skipped elements leave gaps. A null or
/// empty document yields no entries. Syntax errors are logged and yield no entries;
/// only I/O failures are returned as errors.
pub fn parse_local_packages<P: AsRef<Path>>(offset: usize, path: P) -> Result<Vec<Value>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading local packages {}", path.display()))?;

    Ok(parse_local_str(offset, &content, path))
}

fn parse_local_str(offset: usize, content: &str, origin: &Path) -> Vec<Value> {
    let blank = content.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    });
    if blank {
        return Vec::new();
    }

    let document: serde_yaml::Value = match serde_yaml::from_str(content) {
        Ok(document) => document,
        Err(err) => {
            error!("Invalid YAML in {}: {err}", origin.display());
            return Vec::new();
        }
    };

    let entries = match document {
        serde_yaml::Value::Null => return Vec::new(),
        serde_yaml::Value::Sequence(entries) => entries,
        other => {
            warn!(
                "Expected a list of packages in {}, found {}",
                origin.display(),
                yaml_kind(&other)
            );
            return Vec::new();
        }
    };

    let mut items = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        if !entry.is_mapping() {
            warn!(
                "Skipping entry {index} in {}: expected a mapping, found {}",
                origin.display(),
                yaml_kind(&entry)
            );
            continue;
        }

        let mut item = match serde_json::to_value(&entry) {
            Ok(Value::Object(item)) => item,
            Ok(_) => continue,
            Err(err) => {
                warn!("Skipping entry {index} in {}: {err}", origin.display());
                continue;
            }
        };

        item.insert("id".into(), Value::from(offset + index));
        items.push(Value::Object(item));
    }

    debug!("Loaded {} local packages from {}", items.len(), origin.display());
    items
}

fn yaml_kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "a boolean",
        serde_yaml::Value::Number(_) => "a number",
        serde_yaml::Value::String(_) => "a string",
        serde_yaml::Value::Sequence(_) => "a list",
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Tagged(_) => "a tagged value",
    }
}
