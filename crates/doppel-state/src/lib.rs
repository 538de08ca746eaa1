// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable runtime state: the on/off switch and manual style overrides.
//!
//! One process-wide [`RuntimeState`] instance lives behind a
//! [`StateStore`]; all load/save/mutate operations hold the same async
//! mutex, and every mutation is persisted immediately so it is visible to
//! the next `load()` regardless of caller (the admin surface shares the
//! file). Writes go to a temp file in the same directory followed by an
//! atomic rename, so readers never observe a partially written document.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use doppel_core::DoppelError;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

/// The persisted runtime state document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeState {
    /// Global on/off switch for the pipeline.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Manual style overrides keyed by scope key
    /// (`channel:<id>` / `guild:<id>` / `user:<id>`).
    #[serde(default)]
    pub manual_styles: BTreeMap<String, String>,

    /// Epoch seconds of the last mutation.
    #[serde(default)]
    pub updated_at: i64,
}

fn default_enabled() -> bool {
    true
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            enabled: true,
            manual_styles: BTreeMap::new(),
            updated_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Owner of the runtime state and its backing JSON file.
pub struct StateStore {
    path: PathBuf,
    state: Mutex<RuntimeState>,
}

impl StateStore {
    /// Creates a store over `path`. The parent directory is created; the
    /// file itself is only written on the first mutation or explicit save.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, DoppelError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            state: Mutex::new(RuntimeState::default()),
        })
    }

    /// The backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the backing file exists yet.
    pub fn persisted(&self) -> bool {
        self.path.exists()
    }

    /// Returns the current state, re-reading the backing file if present.
    pub async fn load(&self) -> Result<RuntimeState, DoppelError> {
        let mut state = self.state.lock().await;
        if self.path.exists() {
            let raw = tokio::fs::read_to_string(&self.path).await?;
            *state = serde_json::from_str(&raw)?;
        }
        Ok(state.clone())
    }

    /// Stamps `updated_at` and rewrites the full document atomically.
    pub async fn save(&self) -> Result<(), DoppelError> {
        let mut state = self.state.lock().await;
        state.updated_at = chrono::Utc::now().timestamp();
        Self::write_document(&self.path, &state).await
    }

    /// Flips the global switch and persists.
    pub async fn set_enabled(&self, enabled: bool) -> Result<RuntimeState, DoppelError> {
        let mut state = self.state.lock().await;
        state.enabled = enabled;
        state.updated_at = chrono::Utc::now().timestamp();
        Self::write_document(&self.path, &state).await?;
        debug!(enabled, "runtime state toggled");
        Ok(state.clone())
    }

    /// Pins (or with `None`, clears) a manual style for a scope key, then
    /// persists.
    pub async fn set_manual_style(
        &self,
        scope_key: &str,
        style_id: Option<&str>,
    ) -> Result<(), DoppelError> {
        let mut state = self.state.lock().await;
        match style_id {
            Some(style) => {
                state.manual_styles.insert(scope_key.to_string(), style.to_string());
            }
            None => {
                state.manual_styles.remove(scope_key);
            }
        }
        state.updated_at = chrono::Utc::now().timestamp();
        Self::write_document(&self.path, &state).await
    }

    /// Returns the first override found scanning `scope_keys` in the
    /// caller-supplied priority order.
    pub async fn resolve_manual_style(&self, scope_keys: &[String]) -> Option<String> {
        let state = self.state.lock().await;
        scope_keys
            .iter()
            .find_map(|key| state.manual_styles.get(key).cloned())
    }

    async fn write_document(path: &Path, state: &RuntimeState) -> Result<(), DoppelError> {
        let json = serde_json::to_string_pretty(state)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json.as_bytes()).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}
