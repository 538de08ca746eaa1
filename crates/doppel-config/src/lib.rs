// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Doppel agent.
//!
//! TOML model structs with strict key checking, a Figment-based layered
//! loader, and collected post-deserialization validation.

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    AppConfig, AsrConfig, BehaviorConfig, ContextConfig, DedupConfig, DiscordConfig,
    DoppelConfig, IdListConfig, OllamaConfig, RateLimitConfig, RouterConfig, StyleConfig,
};
pub use validation::validate_config;

use doppel_core::DoppelError;

/// Load from the standard hierarchy and validate in one step.
///
/// Validation failures are collapsed into a single [`DoppelError::Config`]
/// with one line per finding.
#[allow(clippy::result_large_err)]
pub fn load_and_validate() -> Result<DoppelConfig, DoppelError> {
    let config = load_config().map_err(|e| DoppelError::Config(e.to_string()))?;
    validate_config(&config).map_err(|errors| DoppelError::Config(errors.join("\n")))?;
    Ok(config)
}
