// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admission control for the Doppel pipeline: duplicate suppression and
//! per-channel rate limiting.

pub mod dedup;
pub mod rate;

pub use dedup::{similarity_ratio, Deduplicator};
pub use rate::RateLimiter;
