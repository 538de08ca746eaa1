// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply decoration: sprinkles emoji over generated text.

use rand::Rng;

const EMOJIS: &[&str] = &["😂", "🤔", "😅", "👍", "🙌", "😎", "🥲", "✨", "🫶", "❤️"];

/// Appends an emoji to each sentence with probability `density`.
///
/// Sentences are split on the full-width period; the input is trimmed
/// either way. A density of zero (or below) returns the trimmed text
/// untouched.
pub fn decorate_reply(text: &str, density: f64) -> String {
    let trimmed = text.trim();
    if density <= 0.0 || trimmed.is_empty() {
        return trimmed.to_string();
    }

    let mut rng = rand::thread_rng();
    let decorated: Vec<String> = trimmed
        .split('。')
        .map(|segment| {
            if !segment.trim().is_empty() && rng.gen_bool(density.min(1.0)) {
                let emoji = EMOJIS[rng.gen_range(0..EMOJIS.len())];
                format!("{segment}{emoji}")
            } else {
                segment.to_string()
            }
        })
        .collect();

    decorated.join("。").trim().to_string()
}
