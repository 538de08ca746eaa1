// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama chat backend.
//!
//! Implements [`doppel_core::ReplyBackend`] over a local Ollama server's
//! `/api/chat` endpoint, with linear-backoff retry, connection recovery
//! after protocol errors, and emoji decoration of generated replies.

mod client;
mod decorate;
mod types;

pub use client::OllamaClient;
pub use decorate::decorate_reply;
