//! Append-only journal of store mutations.
//!
//! One JSON object per line. Each entry carries the SHA-256 of its own
//! canonical form and of the entry before it, so edits show up in `verify`.

use crate::constants;
use crate::util::fs as store_fs;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub actor: String,
    pub target: String,
    /// Clusters the action touched, for filtering.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clusters: Vec<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_hash: Option<String>,
}

fn detect_actor() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Append an entry for `action` on `target`. `error` marks a failed action.
pub fn record(
    path: &Path,
    action: &str,
    target: &str,
    clusters: &[&str],
    error: Option<String>,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        store_fs::ensure_dir(parent, constants::KUBE_DIR_MODE)?;
    }
    let mut entry = AuditEntry {
        timestamp: Utc::now(),
        action: action.to_string(),
        actor: detect_actor(),
        target: target.to_string(),
        clusters: clusters.iter().map(|c| c.to_string()).collect(),
        success: error.is_none(),
        error,
        prev_hash: last_entry_hash(path)?,
        entry_hash: None,
    };
    entry.entry_hash = Some(compute_entry_hash(&entry)?);

    let line = serde_json::to_string(&entry).context("serialize audit entry")?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open audit log {}", path.display()))?;
    writeln!(file, "{}", line).context("write audit entry")?;
    store_fs::set_permissions(path, constants::AUDIT_LOG_MODE)?;
    Ok(())
}

/// Hash of the entry without its `entry_hash`, over key-sorted JSON.
fn compute_entry_hash(entry: &AuditEntry) -> Result<String> {
    let mut value = serde_json::to_value(entry).context("serialize for hash")?;
    if let Some(obj) = value.as_object_mut() {
        obj.remove("entry_hash");
    }
    let canonical = serde_json::to_string(&canonicalize_value(&value))
        .context("serialize canonical json")?;
    Ok(format!("{:x}", Sha256::digest(canonical.as_bytes())))
}

fn canonicalize_value(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = serde_json::Map::new();
            for k in keys {
                out.insert(k.clone(), canonicalize_value(&map[k]));
            }
            serde_json::Value::Object(out)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(canonicalize_value).collect())
        }
        other => other.clone(),
    }
}

fn last_entry_hash(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("read audit log {}", path.display()))?;
    let last = content.lines().rev().find(|l| !l.trim().is_empty());
    Ok(last.map(|line| match serde_json::from_str::<AuditEntry>(line) {
        Ok(AuditEntry {
            entry_hash: Some(hash),
            ..
        }) => hash,
        _ => format!("{:x}", Sha256::digest(line.as_bytes())),
    }))
}

/// Read entries, keeping only the newest `limit` when given.
pub fn read_log(path: &Path, limit: Option<usize>) -> Result<Vec<AuditEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("read audit log {}", path.display()))?;
    let mut entries = Vec::new();
    let mut malformed = 0usize;
    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match serde_json::from_str::<AuditEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(_) => malformed += 1,
        }
    }
    if malformed > 0 {
        tracing::warn!(malformed, "skipped malformed audit entries");
    }
    if let Some(limit) = limit {
        if entries.len() > limit {
            entries = entries.split_off(entries.len() - limit);
        }
    }
    Ok(entries)
}

/// Check hashes and links. Returns (total, errors).
pub fn verify_chain(path: &Path) -> Result<(usize, Vec<String>)> {
    let entries = read_log(path, None)?;
    let mut errors = Vec::new();
    let mut prev: Option<String> = None;

    for (i, entry) in entries.iter().enumerate() {
        if i > 0 && entry.prev_hash != prev {
            errors.push(format!("entry {}: prev_hash does not match previous entry", i + 1));
        }
        match &entry.entry_hash {
            Some(stored) => {
                if compute_entry_hash(entry)? != *stored {
                    errors.push(format!("entry {}: entry_hash mismatch (tampered?)", i + 1));
                }
            }
            None => errors.push(format!("entry {}: missing entry_hash", i + 1)),
        }
        prev = entry.entry_hash.clone();
    }
    Ok((entries.len(), errors))
}
