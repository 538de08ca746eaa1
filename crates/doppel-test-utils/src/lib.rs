// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock adapters for deterministic pipeline tests.
//!
//! No external services: the channel captures what would have been sent,
//! the backend pops canned replies from a FIFO queue, and the transcriber
//! returns a fixed result.

pub mod mock_backend;
pub mod mock_channel;
pub mod mock_transcriber;

pub use mock_backend::MockBackend;
pub use mock_channel::{MockChannel, SentMessage};
pub use mock_transcriber::MockTranscriber;

use doppel_core::InboundMessage;

/// Builds a plain text message from `author_id` in `channel_id`; the
/// common case in tests. Adjust fields on the result for anything else.
pub fn text_message(id: u64, author_id: u64, channel_id: u64, content: &str) -> InboundMessage {
    InboundMessage {
        id,
        author_id,
        channel_id,
        guild_id: None,
        thread_id: None,
        content: content.to_string(),
        attachments: Vec::new(),
        author_is_bot: false,
        mentions: Vec::new(),
    }
}
