// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel gateway that captures outbound traffic.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use doppel_core::{Attachment, ChannelGateway, DoppelError};

/// One captured `send_message` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub channel_id: u64,
    pub text: String,
    pub reply_to: Option<u64>,
}

/// Gateway that records sends and typing calls and serves attachment
/// bytes from an in-memory map keyed by URL.
pub struct MockChannel {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    typing: Arc<Mutex<Vec<u64>>>,
    attachments: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            typing: Arc::new(Mutex::new(Vec::new())),
            attachments: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Registers bytes to be returned for an attachment URL.
    pub async fn stage_attachment(&self, url: &str, bytes: Vec<u8>) {
        self.attachments.lock().await.insert(url.to_string(), bytes);
    }

    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Channel ids that received a typing indicator, in call order.
    pub async fn typing_calls(&self) -> Vec<u64> {
        self.typing.lock().await.clone()
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelGateway for MockChannel {
    async fn send_message(
        &self,
        channel_id: u64,
        text: &str,
        reply_to: Option<u64>,
    ) -> Result<(), DoppelError> {
        self.sent.lock().await.push(SentMessage {
            channel_id,
            text: text.to_string(),
            reply_to,
        });
        Ok(())
    }

    async fn show_typing(&self, channel_id: u64) -> Result<(), DoppelError> {
        self.typing.lock().await.push(channel_id);
        Ok(())
    }

    async fn fetch_attachment(&self, attachment: &Attachment) -> Result<Vec<u8>, DoppelError> {
        self.attachments
            .lock()
            .await
            .get(&attachment.url)
            .cloned()
            .ok_or_else(|| DoppelError::Channel {
                message: format!("no staged bytes for {}", attachment.url),
                source: None,
            })
    }
}
