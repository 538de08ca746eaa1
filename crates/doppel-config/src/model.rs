// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Doppel agent.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::HashMap;

use doppel_core::types::ScopeMode;
use serde::{Deserialize, Serialize};

/// Top-level Doppel configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DoppelConfig {
    /// Process identity and logging settings.
    #[serde(default)]
    pub app: AppConfig,

    /// Platform access control (allow/deny lists, DM policy).
    #[serde(default)]
    pub discord: DiscordConfig,

    /// Admission and reply behavior settings.
    #[serde(default)]
    pub behavior: BehaviorConfig,

    /// Style router settings.
    #[serde(default)]
    pub router: RouterConfig,

    /// Persona style definitions, in declaration order.
    #[serde(default = "default_styles")]
    pub styles: Vec<StyleConfig>,

    /// Ollama backend settings.
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Speech-to-text backend settings.
    #[serde(default)]
    pub asr: AsrConfig,
}

impl Default for DoppelConfig {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            discord: DiscordConfig::default(),
            behavior: BehaviorConfig::default(),
            router: RouterConfig::default(),
            styles: default_styles(),
            ollama: OllamaConfig::default(),
            asr: AsrConfig::default(),
        }
    }
}

impl DoppelConfig {
    /// Styles keyed by id, for lookups after routing.
    pub fn style_map(&self) -> HashMap<&str, &StyleConfig> {
        self.styles.iter().map(|s| (s.id.as_str(), s)).collect()
    }
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Display name of the agent.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory for runtime state, audit, and conversation files.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_app_name() -> String {
    "doppel".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("doppel"))
        .unwrap_or_else(|| std::path::PathBuf::from("data"))
        .to_string_lossy()
        .into_owned()
}

/// An id-list triple used by both the whitelist and the blacklist.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdListConfig {
    #[serde(default)]
    pub guilds: Vec<u64>,

    #[serde(default)]
    pub channels: Vec<u64>,

    #[serde(default)]
    pub users: Vec<u64>,
}

/// Platform access control configuration.
///
/// The blacklist always wins; each whitelist dimension is only enforced
/// when it is non-empty.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiscordConfig {
    /// Respond to direct messages (no guild context).
    #[serde(default = "default_allow_dm")]
    pub allow_dm: bool,

    #[serde(default)]
    pub whitelist: IdListConfig,

    #[serde(default)]
    pub blacklist: IdListConfig,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            allow_dm: default_allow_dm(),
            whitelist: IdListConfig::default(),
            blacklist: IdListConfig::default(),
        }
    }
}

fn default_allow_dm() -> bool {
    true
}

/// Duplicate suppression configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DedupConfig {
    /// Seconds a fingerprint stays eligible for duplicate comparison.
    #[serde(default = "default_dedup_window_seconds")]
    pub window_seconds: u64,

    /// Similarity ratio in [0, 1] at or above which a resend is a duplicate.
    #[serde(default = "default_dedup_similarity")]
    pub similarity: f64,

    /// Maximum fingerprints retained per channel.
    #[serde(default = "default_dedup_max_items")]
    pub max_items: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            window_seconds: default_dedup_window_seconds(),
            similarity: default_dedup_similarity(),
            max_items: default_dedup_max_items(),
        }
    }
}

fn default_dedup_window_seconds() -> u64 {
    120
}

fn default_dedup_similarity() -> f64 {
    0.92
}

fn default_dedup_max_items() -> usize {
    50
}

/// Sliding-window rate limit configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_window_seconds")]
    pub window_seconds: u64,

    /// Maximum admissions per key within the window.
    #[serde(default = "default_rate_max_messages")]
    pub max_messages: usize,

    /// Message sent once per cooldown period when a channel is limited.
    #[serde(default = "default_cooldown_prompt")]
    pub cooldown_prompt: String,

    #[serde(default = "default_notify_when_limited")]
    pub notify_when_limited: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_seconds: default_rate_window_seconds(),
            max_messages: default_rate_max_messages(),
            cooldown_prompt: default_cooldown_prompt(),
            notify_when_limited: default_notify_when_limited(),
        }
    }
}

fn default_rate_window_seconds() -> u64 {
    30
}

fn default_rate_max_messages() -> usize {
    6
}

fn default_cooldown_prompt() -> String {
    "我这边处理有点多，稍后再回复你哦～".to_string()
}

fn default_notify_when_limited() -> bool {
    true
}

/// Conversation history configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    /// Granularity for history and manual overrides: channel, user, or thread.
    #[serde(default)]
    pub scope: ScopeMode,

    /// Most recent turns kept per scope.
    #[serde(default = "default_context_max_messages")]
    pub max_messages: usize,

    /// Minutes after which a turn expires from history.
    #[serde(default = "default_context_expiry_minutes")]
    pub expiry_minutes: u64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            scope: ScopeMode::default(),
            max_messages: default_context_max_messages(),
            expiry_minutes: default_context_expiry_minutes(),
        }
    }
}

fn default_context_max_messages() -> usize {
    12
}

fn default_context_expiry_minutes() -> u64 {
    120
}

/// Admission and reply behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BehaviorConfig {
    /// Initial enabled flag, applied only when no runtime state file exists.
    #[serde(default = "default_enabled_by_default")]
    pub enabled_by_default: bool,

    /// Respond to messages authored by other bots.
    #[serde(default)]
    pub respond_to_bots: bool,

    /// In guilds, only respond when the agent is mentioned.
    #[serde(default)]
    pub mention_only: bool,

    /// Lower bound of the randomized human-like reply delay, in seconds.
    #[serde(default = "default_min_reply_delay")]
    pub min_reply_delay: f64,

    /// Upper bound of the randomized human-like reply delay, in seconds.
    #[serde(default = "default_max_reply_delay")]
    pub max_reply_delay: f64,

    /// Show a typing indicator before replying.
    #[serde(default = "default_send_typing")]
    pub send_typing: bool,

    #[serde(default)]
    pub dedup: DedupConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub context: ContextConfig,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            enabled_by_default: default_enabled_by_default(),
            respond_to_bots: false,
            mention_only: false,
            min_reply_delay: default_min_reply_delay(),
            max_reply_delay: default_max_reply_delay(),
            send_typing: default_send_typing(),
            dedup: DedupConfig::default(),
            rate_limit: RateLimitConfig::default(),
            context: ContextConfig::default(),
        }
    }
}

fn default_enabled_by_default() -> bool {
    true
}

fn default_min_reply_delay() -> f64 {
    0.8
}

fn default_max_reply_delay() -> f64 {
    2.4
}

fn default_send_typing() -> bool {
    true
}

/// Style router configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    /// Style assumed before any rule scores; also the tie-break seed.
    #[serde(default = "default_default_style")]
    pub default_style: String,

    /// Style substituted on low confidence or an unknown winner.
    #[serde(default = "default_fallback_style")]
    pub fallback_style: String,

    /// Confidence in [0, 1] below which the fallback style is used.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_style: default_default_style(),
            fallback_style: default_fallback_style(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

fn default_default_style() -> String {
    "warm".to_string()
}

fn default_fallback_style() -> String {
    "warm".to_string()
}

fn default_confidence_threshold() -> f64 {
    0.35
}

/// A named persona: system prompt, model, and decoding parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StyleConfig {
    pub id: String,
    pub name: String,
    pub model: String,
    pub system_prompt: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default)]
    pub presence_penalty: f64,

    #[serde(default)]
    pub frequency_penalty: f64,

    /// Probability of an emoji after each sentence-like segment of the reply.
    #[serde(default = "default_emoji_density")]
    pub emoji_density: f64,

    /// Optional cap on generated tokens (`num_predict` on the wire).
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f64 {
    0.6
}

fn default_emoji_density() -> f64 {
    0.3
}

/// The four shipped personas, in declaration order (which is also the
/// router's tie-break order).
fn default_styles() -> Vec<StyleConfig> {
    let mk = |id: &str, name: &str, prompt: &str| StyleConfig {
        id: id.to_string(),
        name: name.to_string(),
        model: "qwen2.5:14b".to_string(),
        system_prompt: prompt.to_string(),
        temperature: default_temperature(),
        presence_penalty: 0.0,
        frequency_penalty: 0.0,
        emoji_density: default_emoji_density(),
        max_tokens: None,
    };
    vec![
        mk("techie", "技术宅", "你是一个冷静的技术型伙伴，回答简洁直接，偏好给出可执行的建议。"),
        mk("warm", "暖心", "你是一个温柔体贴的朋友，语气轻松亲切，多关心对方的感受。"),
        mk("snark", "毒舌", "你说话带点调侃和吐槽，但不刻薄，点到为止。"),
        mk("formal", "正式", "你用得体、礼貌、条理清晰的语气回复，适合工作场景。"),
    ]
}

/// Ollama backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_ollama_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            timeout_seconds: default_ollama_timeout_seconds(),
        }
    }
}

fn default_ollama_base_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_ollama_timeout_seconds() -> u64 {
    60
}

/// Speech-to-text backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AsrConfig {
    /// Provider name: "dummy" or "http".
    #[serde(default = "default_asr_provider")]
    pub provider: String,

    /// Endpoint for the "http" provider.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_asr_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            provider: default_asr_provider(),
            endpoint: None,
            timeout_seconds: default_asr_timeout_seconds(),
        }
    }
}

fn default_asr_provider() -> String {
    "dummy".to_string()
}

fn default_asr_timeout_seconds() -> u64 {
    30
}
