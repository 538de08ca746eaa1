// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for Doppel's external collaborators.
//!
//! The platform client, speech-to-text backend, and LLM backend are external
//! to the core; the dispatcher only sees these traits. All use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod backend;
pub mod channel;
pub mod transcriber;

pub use backend::ReplyBackend;
pub use channel::ChannelGateway;
pub use transcriber::Transcriber;
