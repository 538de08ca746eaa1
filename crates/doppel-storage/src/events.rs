// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory ring buffer of recent pipeline events.
//!
//! Feeds the status surface; nothing here touches disk.

use std::collections::VecDeque;
use std::sync::Mutex;

/// Events retained before the oldest is evicted.
const CAPACITY: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineEvent {
    /// Epoch seconds.
    pub ts: i64,
    pub kind: String,
    pub detail: String,
}

#[derive(Default)]
pub struct EventBuffer {
    events: Mutex<VecDeque<PipelineEvent>>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, kind: &str, detail: &str) {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        if events.len() == CAPACITY {
            events.pop_front();
        }
        events.push_back(PipelineEvent {
            ts: chrono::Utc::now().timestamp(),
            kind: kind.to_string(),
            detail: detail.to_string(),
        });
    }

    /// Snapshot of all buffered events, oldest first.
    pub fn snapshot(&self) -> Vec<PipelineEvent> {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.iter().cloned().collect()
    }

    /// The last `limit` events, oldest first. A zero limit yields nothing.
    pub fn recent(&self, limit: usize) -> Vec<PipelineEvent> {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        let skip = events.len().saturating_sub(limit);
        events.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_come_back_in_order() {
        let buf = EventBuffer::new();
        buf.push("replied", "channel=1");
        buf.push("blocked", "user=2");

        let events = buf.snapshot();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, "replied");
        assert_eq!(events[1].kind, "blocked");
    }

    #[test]
    fn recent_takes_the_tail() {
        let buf = EventBuffer::new();
        for i in 0..5 {
            buf.push("event", &format!("n={i}"));
        }
        let events = buf.recent(2);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].detail, "n=3");
        assert_eq!(events[1].detail, "n=4");

        assert!(buf.recent(0).is_empty());
        assert_eq!(buf.recent(100).len(), 5);
    }

    #[test]
    fn capacity_evicts_the_oldest() {
        let buf = EventBuffer::new();
        for i in 0..(CAPACITY + 3) {
            buf.push("event", &format!("n={i}"));
        }
        let events = buf.snapshot();
        assert_eq!(events.len(), CAPACITY);
        assert_eq!(events[0].detail, "n=3");
    }
}
