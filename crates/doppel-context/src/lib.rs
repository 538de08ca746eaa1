// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-scope conversation history used to build backend context.
//!
//! Each scope owns an ordered sequence of turns, bounded to
//! `context.max_messages` and pruned by `context.expiry_minutes` on every
//! access. Empty scopes are removed entirely.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use doppel_config::model::ContextConfig;
use doppel_core::types::{ChatTurn, Role};

/// One recorded turn.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub role: Role,
    pub content: String,
    pub ts: Instant,
}

/// In-memory conversation store keyed by scope id.
///
/// Internally locked; `get` returns a snapshot copy, never internal storage.
pub struct ConversationStore {
    config: ContextConfig,
    contexts: Mutex<HashMap<String, Vec<MessageRecord>>>,
}

impl ConversationStore {
    pub fn new(config: ContextConfig) -> Self {
        Self {
            config,
            contexts: Mutex::new(HashMap::new()),
        }
    }

    fn cleanup(&self, contexts: &mut HashMap<String, Vec<MessageRecord>>, scope_id: &str) {
        let now = Instant::now();
        let expiry = Duration::from_secs(self.config.expiry_minutes * 60);
        let Some(records) = contexts.get_mut(scope_id) else {
            return;
        };
        records.retain(|r| now.duration_since(r.ts) <= expiry);
        if records.len() > self.config.max_messages {
            let excess = records.len() - self.config.max_messages;
            records.drain(..excess);
        }
        if records.is_empty() {
            contexts.remove(scope_id);
        }
    }

    /// Append a turn with the current timestamp, then prune.
    pub fn add(&self, scope_id: &str, role: Role, content: &str) {
        let mut contexts = self.contexts.lock().unwrap_or_else(|e| e.into_inner());
        contexts
            .entry(scope_id.to_string())
            .or_default()
            .push(MessageRecord {
                role,
                content: content.to_string(),
                ts: Instant::now(),
            });
        self.cleanup(&mut contexts, scope_id);
    }

    /// Prune, then return a snapshot of the scope's records in insertion order.
    pub fn get(&self, scope_id: &str) -> Vec<MessageRecord> {
        let mut contexts = self.contexts.lock().unwrap_or_else(|e| e.into_inner());
        self.cleanup(&mut contexts, scope_id);
        contexts.get(scope_id).cloned().unwrap_or_default()
    }

    /// Render the scope's history as role/content pairs, oldest first.
    pub fn history_for_llm(&self, scope_id: &str) -> Vec<ChatTurn> {
        self.get(scope_id)
            .into_iter()
            .map(|r| ChatTurn {
                role: r.role,
                content: r.content,
            })
            .collect()
    }
}
