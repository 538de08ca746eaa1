// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Doppel agent.
//!
//! This crate provides the error type, common message/decision types, and
//! the adapter traits behind which the platform client, the LLM backend,
//! and the speech-to-text backend live.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::DoppelError;
pub use traits::{ChannelGateway, ReplyBackend, Transcriber};
pub use types::{
    AccessDecision, Attachment, ChatTurn, GenerationRequest, InboundMessage, ReasonCode, Role,
    ScopeMode,
};
