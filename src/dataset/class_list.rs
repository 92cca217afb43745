//! Class-list documents (`data.yaml`-style) shipped with annotated datasets.
//!
//! `names` is either an ordered list or an index -> name mapping; both flatten
//! into the positional label sequence.
use crate::error::PipelineError;
use anyhow::{anyhow, Context, Result};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const PREFERRED_CLASS_LIST: &str = "data.yaml";

/// Find the class-list document next to a dataset folder.
pub fn discover_class_list(dir: &Path) -> Result<PathBuf> {
    let preferred = dir.join(PREFERRED_CLASS_LIST);
    if preferred.is_file() {
        return Ok(preferred);
    }
    let mut candidates = Vec::new();
    if dir.is_dir() {
        for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
            let path = entry?.path();
            let is_yaml = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == "yaml" || ext == "yml");
            if path.is_file() && is_yaml {
                candidates.push(path);
            }
        }
    }
    candidates.sort();
    candidates.into_iter().next().ok_or_else(|| {
        PipelineError::NoClassListFound {
            dir: dir.to_path_buf(),
        }
        .into()
    })
}

pub fn load_class_list(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_class_list(&text).with_context(|| format!("parse class list {}", path.display()))
}

pub fn parse_class_list(text: &str) -> Result<Vec<String>> {
    let doc: Value = serde_yaml::from_str(text).context("parse YAML")?;
    let names = doc
        .get("names")
        .ok_or_else(|| anyhow!("missing `names` field"))?;
    match names {
        Value::Sequence(items) => items.iter().map(scalar_to_string).collect(),
        Value::Mapping(map) => {
            let mut by_index = BTreeMap::new();
            for (key, value) in map {
                let index = match key {
                    Value::Number(n) => n.as_u64(),
                    Value::String(s) => s.trim().parse::<u64>().ok(),
                    _ => None,
                }
                .ok_or_else(|| anyhow!("class index {key:?} is not a non-negative integer"))?;
                by_index.insert(index, scalar_to_string(value)?);
            }
            for (expected, index) in by_index.keys().enumerate() {
                if *index != expected as u64 {
                    return Err(anyhow!(
                        "class indices must be contiguous from 0 (missing {expected})"
                    ));
                }
            }
            Ok(by_index.into_values().collect())
        }
        other => Err(anyhow!("`names` must be a list or a mapping, found {other:?}")),
    }
}

fn scalar_to_string(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(anyhow!("class name {other:?} is not a scalar")),
    }
}
