// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the pipeline, adapters, and stores.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A single attachment on an inbound message.
///
/// Attachment bytes are fetched lazily through the channel gateway; the core
/// only sees the declared metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: Option<String>,
    pub url: String,
}

/// An inbound chat event as delivered by the platform collaborator.
///
/// Immutable snapshot per event; the pipeline borrows it for the duration of
/// processing and never mutates it.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: u64,
    pub author_id: u64,
    pub channel_id: u64,
    pub guild_id: Option<u64>,
    pub thread_id: Option<u64>,
    pub content: String,
    pub attachments: Vec<Attachment>,
    pub author_is_bot: bool,
    /// User IDs mentioned in the message. Used by the mention-only gate.
    pub mentions: Vec<u64>,
}

/// Chat role in a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A role/content pair rendered for the LLM backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

/// Reason codes for access decisions. A closed set; `Allowed` is the only
/// non-rejecting value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    BotMessage,
    DmBlocked,
    GuildBlacklisted,
    ChannelBlacklisted,
    UserBlacklisted,
    GuildNotWhitelisted,
    ChannelNotWhitelisted,
    UserNotWhitelisted,
    NotMentioned,
    Allowed,
}

/// Result of the access policy check. Computed fresh per message, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: ReasonCode,
}

impl AccessDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: ReasonCode::Allowed,
        }
    }

    pub fn deny(reason: ReasonCode) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

/// The granularity at which history and manual style overrides are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeMode {
    Channel,
    User,
    Thread,
}

impl Default for ScopeMode {
    fn default() -> Self {
        ScopeMode::Channel
    }
}

/// A fully-resolved generation request handed to a [`crate::ReplyBackend`].
///
/// Carries the chosen style's prompt and decoding parameters so backends
/// stay independent of the configuration crate.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub system_prompt: String,
    pub history: Vec<ChatTurn>,
    pub user_content: String,
    pub temperature: f64,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
    pub max_tokens: Option<u32>,
    /// Probability of appending an emoji after each sentence-like segment.
    pub emoji_density: f64,
}
