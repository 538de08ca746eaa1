// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel gateway trait for the messaging-platform collaborator.

use async_trait::async_trait;

use crate::error::DoppelError;
use crate::types::Attachment;

/// Outbound operations exposed by the messaging platform.
///
/// The platform client owns connection management and event delivery; the
/// pipeline only sends replies, shows typing, and fetches attachment bytes
/// on demand.
#[async_trait]
pub trait ChannelGateway: Send + Sync {
    /// Sends a message to a channel, optionally as a reply to another message.
    async fn send_message(
        &self,
        channel_id: u64,
        text: &str,
        reply_to: Option<u64>,
    ) -> Result<(), DoppelError>;

    /// Shows a typing indicator in the channel.
    async fn show_typing(&self, channel_id: u64) -> Result<(), DoppelError>;

    /// Fetches the bytes of an attachment.
    async fn fetch_attachment(&self, attachment: &Attachment) -> Result<Vec<u8>, DoppelError>;
}
