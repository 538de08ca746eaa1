// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only JSONL conversation log.
//!
//! Each completed exchange lands here as one record, after PII masking of
//! both sides. One JSON object per line; [`ConversationLog::export`]
//! snapshots the most recent records into a standalone pretty-printed
//! JSON file under the export directory.

use std::path::{Path, PathBuf};

use doppel_core::DoppelError;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::privacy::mask_pii;

/// Upper bound on records written by [`ConversationLog::export`].
const EXPORT_LIMIT: usize = 5000;

/// One user message plus the reply it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Epoch seconds.
    pub ts: i64,
    /// Scope key, e.g. `channel:123`.
    pub scope: String,
    pub user: u64,
    /// PII-masked inbound text.
    pub content: String,
    /// PII-masked reply text.
    pub reply: String,
    pub style: String,
    /// Router reason that picked the style.
    pub reason: String,
}

pub struct ConversationLog {
    path: PathBuf,
    export_dir: PathBuf,
    // Serializes appends so concurrent channels cannot interleave lines.
    write_lock: Mutex<()>,
}

impl ConversationLog {
    pub fn open(
        path: impl Into<PathBuf>,
        export_dir: impl Into<PathBuf>,
    ) -> Result<Self, DoppelError> {
        let path = path.into();
        let export_dir = export_dir.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::create_dir_all(&export_dir)?;
        Ok(Self {
            path,
            export_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Masks PII in both sides of the exchange and appends one JSONL
    /// record.
    pub async fn record(
        &self,
        scope: &str,
        user: u64,
        content: &str,
        reply: &str,
        style: &str,
        reason: &str,
    ) -> Result<(), DoppelError> {
        let record = LogRecord {
            ts: chrono::Utc::now().timestamp(),
            scope: scope.to_string(),
            user,
            content: mask_pii(content),
            reply: mask_pii(reply),
            style: style.to_string(),
            reason: reason.to_string(),
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Returns up to the last `limit` records, oldest first. Unparseable
    /// lines are skipped.
    pub async fn tail(&self, limit: usize) -> Result<Vec<LogRecord>, DoppelError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let mut records: Vec<LogRecord> = raw
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        if records.len() > limit {
            records.drain(..records.len() - limit);
        }
        Ok(records)
    }

    /// Writes the last 5000 records to
    /// `export_dir/conversation_export_<ts>.json` and returns the path.
    pub async fn export(&self) -> Result<PathBuf, DoppelError> {
        let records = self.tail(EXPORT_LIMIT).await?;
        let ts = chrono::Utc::now().timestamp();
        let export_path = self
            .export_dir
            .join(format!("conversation_export_{ts}.json"));
        let body = serde_json::to_string_pretty(&records)?;
        tokio::fs::write(&export_path, body).await?;
        Ok(export_path)
    }
}
