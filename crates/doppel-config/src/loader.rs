// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./doppel.toml` > `~/.config/doppel/doppel.toml`
//! > `/etc/doppel/doppel.toml` with environment variable overrides via the
//! `DOPPEL_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::DoppelConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/doppel/doppel.toml` (system-wide)
/// 3. `~/.config/doppel/doppel.toml` (user XDG config)
/// 4. `./doppel.toml` (local directory)
/// 5. `DOPPEL_*` environment variables
pub fn load_config() -> Result<DoppelConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DoppelConfig::default()))
        .merge(Toml::file("/etc/doppel/doppel.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("doppel/doppel.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("doppel.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from inline TOML only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<DoppelConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DoppelConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<DoppelConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DoppelConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `DOPPEL_OLLAMA_BASE_URL`
/// must map to `ollama.base_url`, not `ollama.base.url`.
fn env_provider() -> Env {
    Env::prefixed("DOPPEL_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: DOPPEL_OLLAMA_BASE_URL -> "ollama_base_url"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("app_", "app.", 1)
            .replacen("discord_", "discord.", 1)
            .replacen("behavior_", "behavior.", 1)
            .replacen("router_", "router.", 1)
            .replacen("ollama_", "ollama.", 1)
            .replacen("asr_", "asr.", 1);
        mapped.into()
    })
}
