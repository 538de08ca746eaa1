// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-key sliding-window rate limiting.
//!
//! Each key owns a window of admission timestamps plus the one-shot
//! cooldown-notification marker, so the two never diverge in lifecycle.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use doppel_config::model::RateLimitConfig;

#[derive(Default)]
struct KeyWindow {
    admissions: VecDeque<Instant>,
    /// Set once per rejected period; cleared on the next admission.
    cooldown_notified: bool,
}

/// Sliding-window admission counter.
///
/// Internally locked; same-key calls serialize on the map lock while
/// unrelated keys only contend briefly.
pub struct RateLimiter {
    config: RateLimitConfig,
    keys: Mutex<HashMap<u64, KeyWindow>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            keys: Mutex::new(HashMap::new()),
        }
    }

    /// Admit or reject a call for `key`.
    ///
    /// Prunes timestamps outside the window first. A rejection records
    /// nothing; an admission records now and re-arms the cooldown notice.
    pub fn allow(&self, key: u64) -> bool {
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_seconds);
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        let entry = keys.entry(key).or_default();

        while let Some(ts) = entry.admissions.front() {
            if now.duration_since(*ts) > window {
                entry.admissions.pop_front();
            } else {
                break;
            }
        }

        if entry.admissions.len() >= self.config.max_messages {
            return false;
        }
        entry.admissions.push_back(now);
        entry.cooldown_notified = false;
        true
    }

    /// Claims the one-shot cooldown notice for `key`.
    ///
    /// Returns true exactly once per rejected period; subsequent calls
    /// return false until the next admission re-arms it.
    pub fn mark_notified(&self, key: u64) -> bool {
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        let entry = keys.entry(key).or_default();
        if entry.cooldown_notified {
            false
        } else {
            entry.cooldown_notified = true;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(window_seconds: u64, max_messages: usize) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            window_seconds,
            max_messages,
            ..RateLimitConfig::default()
        })
    }

    #[test]
    fn admits_up_to_max_then_rejects() {
        let rl = limiter(30, 3);
        assert!(rl.allow(1));
        assert!(rl.allow(1));
        assert!(rl.allow(1));
        assert!(!rl.allow(1));
        assert!(!rl.allow(1));
    }

    #[test]
    fn keys_are_independent() {
        let rl = limiter(30, 1);
        assert!(rl.allow(1));
        assert!(!rl.allow(1));
        assert!(rl.allow(2));
    }

    #[test]
    fn window_expiry_re_admits() {
        let rl = limiter(0, 1);
        assert!(rl.allow(1));
        std::thread::sleep(Duration::from_millis(20));
        assert!(rl.allow(1));
    }

    #[test]
    fn rejection_does_not_consume_window_slots() {
        let rl = limiter(30, 2);
        assert!(rl.allow(1));
        assert!(rl.allow(1));
        for _ in 0..10 {
            assert!(!rl.allow(1));
        }
        // Still exactly two admissions recorded, none added by rejections.
        let keys = rl.keys.lock().unwrap();
        assert_eq!(keys.get(&1).unwrap().admissions.len(), 2);
    }

    #[test]
    fn cooldown_notice_fires_once_per_period() {
        let rl = limiter(0, 1);
        assert!(rl.allow(1));
        assert!(rl.mark_notified(1));
        assert!(!rl.mark_notified(1));
        // An admission re-arms the notice.
        std::thread::sleep(Duration::from_millis(20));
        assert!(rl.allow(1));
        assert!(rl.mark_notified(1));
    }
}
