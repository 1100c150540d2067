//! Loading run inputs from disk.
//!
//! Messages: a `.json` array (strings, or objects with a `question`,
//! `prompt` or `message` field), otherwise one message per non-blank line.
//! System prompts: a directory of `.txt`/`.md` files named by file stem, or
//! a YAML/JSON list of `{name, content}`.

use std::path::Path;

use serde_json::Value;

use crate::cache::SeedTriple;
use crate::errors::RunError;
use crate::model::SystemPrompt;

const MESSAGE_FIELDS: [&str; 3] = ["question", "prompt", "message"];

fn read(path: &Path) -> Result<String, RunError> {
    if !path.exists() {
        return Err(RunError::DatasetNotFound {
            path: path.display().to_string(),
        });
    }
    std::fs::read_to_string(path).map_err(|e| invalid(path, e.to_string()))
}

fn invalid(path: &Path, reason: impl Into<String>) -> RunError {
    RunError::InvalidDataset {
        path: path.display().to_string(),
        reason: reason.into(),
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

pub fn load_messages(path: &Path) -> Result<Vec<String>, RunError> {
    let raw = read(path)?;
    if !is_json(path) {
        return Ok(raw
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.trim_end().to_string())
            .collect());
    }

    let value: Value = serde_json::from_str(&raw).map_err(|e| invalid(path, e.to_string()))?;
    let Value::Array(items) = value else {
        return Err(invalid(path, "expected a JSON array"));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(s) => Ok(s),
            Value::Object(map) => MESSAGE_FIELDS
                .iter()
                .find_map(|f| map.get(*f).and_then(Value::as_str))
                .map(str::to_string)
                .ok_or_else(|| {
                    invalid(
                        path,
                        format!("item {i} has none of the fields {MESSAGE_FIELDS:?}"),
                    )
                }),
            other => Err(invalid(path, format!("item {i} is not text: {other}"))),
        })
        .collect()
}

pub fn load_prompts(path: &Path) -> Result<Vec<SystemPrompt>, RunError> {
    if path.is_dir() {
        return load_prompt_dir(path);
    }
    let raw = read(path)?;
    serde_yaml::from_str(&raw).map_err(|e| invalid(path, e.to_string()))
}

fn load_prompt_dir(dir: &Path) -> Result<Vec<SystemPrompt>, RunError> {
    let entries = std::fs::read_dir(dir).map_err(|e| invalid(dir, e.to_string()))?;
    let mut files = Vec::new();
    for entry in entries {
        let p = entry.map_err(|e| invalid(dir, e.to_string()))?.path();
        let ext = p.extension().and_then(|e| e.to_str());
        if p.is_file() && matches!(ext, Some("txt") | Some("md")) {
            files.push(p);
        }
    }
    files.sort();

    files
        .into_iter()
        .map(|p| {
            let name = p
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            let content = std::fs::read_to_string(&p).map_err(|e| invalid(&p, e.to_string()))?;
            Ok(SystemPrompt::new(name, content))
        })
        .collect()
}

/// Seed triples: a JSON or YAML list of `{question, prompt, answer}`.
pub fn load_seed_triples(path: &Path) -> Result<Vec<SeedTriple>, RunError> {
    let raw = read(path)?;
    serde_yaml::from_str(&raw).map_err(|e| invalid(path, e.to_string()))
}
