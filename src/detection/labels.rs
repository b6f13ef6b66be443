//! Class label tables.
//!
//! YOLO exporters embed the label table in the ONNX metadata under `names`
//! as a Python dict literal, e.g. `{0: 'gir', 1: 'red sindhi'}`.

use crate::{Error, Result, config::ModelConfig};
use std::path::Path;
use tracing::{debug, warn};

pub const NAMES_METADATA_KEY: &str = "names";

/// Parses an exporter `names` value into a table indexed by class id.
/// Ids missing from the dict are filled with `class_<id>`.
pub fn parse_names_metadata(raw: &str) -> Result<Vec<String>> {
    let body = raw
        .trim()
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| Error::model(format!("names metadata is not a dict: {}", raw)))?;

    let mut entries = Vec::new();
    let mut rest = body.trim();

    while !rest.is_empty() {
        let (key, after_key) = rest
            .split_once(':')
            .ok_or_else(|| Error::model(format!("missing ':' in names metadata near '{}'", rest)))?;
        let id: usize = key
            .trim()
            .parse()
            .map_err(|_| Error::model(format!("invalid class id '{}'", key.trim())))?;

        let after_key = after_key.trim_start();
        let quote = after_key
            .chars()
            .next()
            .filter(|c| *c == '\'' || *c == '"')
            .ok_or_else(|| Error::model(format!("label for class {} is not quoted", id)))?;
        let value_and_rest = &after_key[1..];
        let end = value_and_rest
            .find(quote)
            .ok_or_else(|| Error::model(format!("unterminated label for class {}", id)))?;

        entries.push((id, value_and_rest[..end].to_string()));

        rest = value_and_rest[end + 1..].trim_start();
        rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
    }

    let len = entries.iter().map(|(id, _)| id + 1).max().unwrap_or(0);
    let mut labels: Vec<String> = (0..len).map(fallback_label).collect();
    for (id, name) in entries {
        labels[id] = name;
    }

    Ok(labels)
}

/// One label per non-empty line.
pub fn read_labels_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Picks the label table: explicit config list, then labels file, then the
/// model's embedded names.
pub fn resolve_labels(config: &ModelConfig, embedded: Option<&str>) -> Result<Vec<String>> {
    if !config.labels.is_empty() {
        debug!("Using {} labels from configuration", config.labels.len());
        return Ok(config.labels.clone());
    }

    if let Some(path) = &config.labels_path {
        let labels = read_labels_file(path)?;
        debug!("Loaded {} labels from {}", labels.len(), path.display());
        return Ok(labels);
    }

    match embedded {
        Some(raw) => parse_names_metadata(raw),
        None => {
            warn!("Model carries no label metadata, classes will be reported by index");
            Ok(Vec::new())
        }
    }
}

pub fn label_for(labels: &[String], class_id: usize) -> String {
    labels
        .get(class_id)
        .cloned()
        .unwrap_or_else(|| fallback_label(class_id))
}

fn fallback_label(class_id: usize) -> String {
    format!("class_{}", class_id)
}
