// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-capped audit log for admission decisions and state changes.

use std::path::{Path, PathBuf};

use doppel_core::DoppelError;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Maximum entries retained on disk; older entries are dropped.
const MAX_ENTRIES: usize = 500;

/// One audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Epoch seconds.
    pub ts: i64,
    /// Short event tag, e.g. `blocked`, `rate_limited`, `enabled_changed`.
    pub event: String,
    /// Free-form detail, already PII-masked by the caller where needed.
    pub detail: String,
}

/// JSON-array audit file capped at [`MAX_ENTRIES`] entries.
pub struct AuditLog {
    path: PathBuf,
    entries: Mutex<Vec<AuditEntry>>,
}

impl AuditLog {
    /// Opens the log at `path`, loading existing entries if the file
    /// exists. A corrupt file is treated as empty rather than fatal.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DoppelError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, path = %path.display(), "audit log unreadable, starting fresh");
                Vec::new()
            })
        } else {
            Vec::new()
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends an entry and rewrites the file, dropping the oldest
    /// entries beyond the cap.
    pub async fn record(&self, event: &str, detail: &str) -> Result<(), DoppelError> {
        let mut entries = self.entries.lock().await;
        entries.push(AuditEntry {
            ts: chrono::Utc::now().timestamp(),
            event: event.to_string(),
            detail: detail.to_string(),
        });
        if entries.len() > MAX_ENTRIES {
            let excess = entries.len() - MAX_ENTRIES;
            entries.drain(..excess);
        }
        let json = serde_json::to_string_pretty(&*entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json.as_bytes()).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Returns the most recent `limit` entries, newest last.
    pub async fn tail(&self, limit: usize) -> Vec<AuditEntry> {
        let entries = self.entries.lock().await;
        let start = entries.len().saturating_sub(limit);
        entries[start..].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn records_persist_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.json");

        let log = AuditLog::open(&path).unwrap();
        log.record("blocked", "user_blacklisted user=42").await.unwrap();
        log.record("enabled_changed", "enabled=false").await.unwrap();

        let reopened = AuditLog::open(&path).unwrap();
        let tail = reopened.tail(10).await;
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].event, "blocked");
        assert_eq!(tail[1].event, "enabled_changed");
        assert!(tail[1].ts > 0);
    }

    #[tokio::test]
    async fn oldest_entries_are_dropped_past_the_cap() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::open(dir.path().join("audit.json")).unwrap();

        for i in 0..(MAX_ENTRIES + 5) {
            log.record("event", &format!("n={i}")).await.unwrap();
        }

        let tail = log.tail(usize::MAX).await;
        assert_eq!(tail.len(), MAX_ENTRIES);
        assert_eq!(tail[0].detail, "n=5");
        assert_eq!(tail.last().unwrap().detail, format!("n={}", MAX_ENTRIES + 4));
    }

    #[tokio::test]
    async fn corrupt_file_starts_fresh() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.json");
        std::fs::write(&path, "not json").unwrap();

        let log = AuditLog::open(&path).unwrap();
        assert!(log.tail(10).await.is_empty());
    }
}
