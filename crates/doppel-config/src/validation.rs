// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as cross-field style references and numeric ranges.

use crate::model::DoppelConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<String>)` with all
/// collected validation errors (does not fail fast).
pub fn validate_config(config: &DoppelConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.styles.is_empty() {
        errors.push("styles must not be empty".to_string());
    }

    let style_map = config.style_map();
    for (field, id) in [
        ("router.default_style", &config.router.default_style),
        ("router.fallback_style", &config.router.fallback_style),
    ] {
        if !style_map.contains_key(id.as_str()) {
            errors.push(format!("{field} `{id}` does not match any [[styles]] id"));
        }
    }

    if !(0.0..=1.0).contains(&config.router.confidence_threshold) {
        errors.push(format!(
            "router.confidence_threshold must be in [0, 1], got {}",
            config.router.confidence_threshold
        ));
    }

    if !(0.0..=1.0).contains(&config.behavior.dedup.similarity) {
        errors.push(format!(
            "behavior.dedup.similarity must be in [0, 1], got {}",
            config.behavior.dedup.similarity
        ));
    }

    if config.behavior.min_reply_delay < 0.0 {
        errors.push(format!(
            "behavior.min_reply_delay must be non-negative, got {}",
            config.behavior.min_reply_delay
        ));
    }

    if config.behavior.max_reply_delay < config.behavior.min_reply_delay {
        errors.push(format!(
            "behavior.max_reply_delay ({}) must not be below behavior.min_reply_delay ({})",
            config.behavior.max_reply_delay, config.behavior.min_reply_delay
        ));
    }

    if config.behavior.rate_limit.max_messages == 0 {
        errors.push("behavior.rate_limit.max_messages must be positive".to_string());
    }

    if config.behavior.context.max_messages == 0 {
        errors.push("behavior.context.max_messages must be positive".to_string());
    }

    for style in &config.styles {
        if !(0.0..=1.0).contains(&style.emoji_density) {
            errors.push(format!(
                "styles `{}` emoji_density must be in [0, 1], got {}",
                style.id, style.emoji_density
            ));
        }
    }

    if config.asr.provider == "http" && config.asr.endpoint.is_none() {
        errors.push("asr.endpoint is required when asr.provider is `http`".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
