// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-channel short-term duplicate suppression.
//!
//! Keeps a bounded, time-ordered queue of normalized message fingerprints
//! per channel and rejects near-duplicate resends within the window.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use doppel_config::model::DedupConfig;
use tracing::trace;

/// Recent-fingerprint store with similarity-based duplicate detection.
///
/// Internally locked; callers may share it across concurrent pipelines.
pub struct Deduplicator {
    config: DedupConfig,
    records: Mutex<HashMap<u64, VecDeque<(Instant, String)>>>,
}

impl Deduplicator {
    pub fn new(config: DedupConfig) -> Self {
        Self {
            config,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Reports whether `content` is a near-duplicate of a recent message in
    /// this channel. Non-duplicates are recorded; duplicates are not.
    pub fn is_duplicate(&self, channel_id: u64, content: &str) -> bool {
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_seconds);
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let queue = records.entry(channel_id).or_default();

        while let Some((ts, _)) = queue.front() {
            if now.duration_since(*ts) > window {
                queue.pop_front();
            } else {
                break;
            }
        }

        let normalized = content.trim().to_lowercase();
        for (_, prev) in queue.iter() {
            let ratio = similarity_ratio(&normalized, prev);
            if ratio >= self.config.similarity {
                trace!(channel_id, ratio, "near-duplicate fingerprint");
                return true;
            }
        }

        queue.push_back((now, normalized));
        if queue.len() > self.config.max_items {
            queue.pop_front();
        }
        false
    }
}

/// Similarity of two strings as `2·LCS / (|a| + |b|)` over chars.
///
/// Symmetric, `ratio(x, x) == 1.0`, and 1.0 when both are empty. The DP is
/// O(n·m) per pair and every fingerprint in the window is scanned; that cost
/// is deliberately bounded by `max_items`, not assumed scalable.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    // Two-row LCS table.
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in &a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    let lcs = prev[b.len()];
    (2.0 * lcs as f64) / ((a.len() + b.len()) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dedup(window_seconds: u64) -> Deduplicator {
        Deduplicator::new(DedupConfig {
            window_seconds,
            similarity: 0.92,
            max_items: 50,
        })
    }

    #[test]
    fn first_sighting_is_not_duplicate_resend_is() {
        let d = dedup(120);
        assert!(!d.is_duplicate(1, "你今天吃了吗"));
        assert!(d.is_duplicate(1, "你今天吃了吗"));
    }

    #[test]
    fn normalization_catches_case_and_whitespace() {
        let d = dedup(120);
        assert!(!d.is_duplicate(1, "Hello World"));
        assert!(d.is_duplicate(1, "  hello world  "));
    }

    #[test]
    fn channels_are_independent() {
        let d = dedup(120);
        assert!(!d.is_duplicate(1, "same text"));
        assert!(!d.is_duplicate(2, "same text"));
    }

    #[test]
    fn expired_fingerprints_are_forgotten() {
        let d = dedup(0);
        assert!(!d.is_duplicate(1, "ephemeral"));
        std::thread::sleep(Duration::from_millis(20));
        // The zero-second window has elapsed, so the resend re-registers.
        assert!(!d.is_duplicate(1, "ephemeral"));
    }

    #[test]
    fn dissimilar_text_is_admitted() {
        let d = dedup(120);
        assert!(!d.is_duplicate(1, "部署脚本又挂了"));
        assert!(!d.is_duplicate(1, "周末去哪里玩"));
    }

    #[test]
    fn capacity_evicts_oldest() {
        let d = Deduplicator::new(DedupConfig {
            window_seconds: 120,
            similarity: 0.92,
            max_items: 2,
        });
        assert!(!d.is_duplicate(1, "first"));
        assert!(!d.is_duplicate(1, "second message"));
        assert!(!d.is_duplicate(1, "third thing entirely"));
        // "first" was evicted by capacity, so it re-registers.
        assert!(!d.is_duplicate(1, "first"));
    }

    #[test]
    fn ratio_is_symmetric_and_reflexive() {
        assert_eq!(similarity_ratio("abc", "abc"), 1.0);
        assert_eq!(similarity_ratio("", ""), 1.0);
        assert_eq!(similarity_ratio("abc", ""), 0.0);
        let ab = similarity_ratio("kitten", "sitting");
        let ba = similarity_ratio("sitting", "kitten");
        assert_eq!(ab, ba);
        assert!(ab > 0.0 && ab < 1.0);
    }

    #[test]
    fn near_duplicates_cross_the_threshold() {
        // One trailing char difference on a long string stays above 0.92.
        let d = dedup(120);
        assert!(!d.is_duplicate(1, "今天的会议改到下午三点开了吗"));
        assert!(d.is_duplicate(1, "今天的会议改到下午三点开了吗？"));
    }
}
