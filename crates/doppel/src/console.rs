// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Console channel gateway for the REPL shell.
//!
//! Replies print to stdout; there is no attachment CDN, so fetches
//! resolve against local file paths to keep voice messages testable from
//! the shell.

use async_trait::async_trait;
use colored::Colorize;
use doppel_core::{Attachment, ChannelGateway, DoppelError};

pub struct ConsoleGateway;

#[async_trait]
impl ChannelGateway for ConsoleGateway {
    async fn send_message(
        &self,
        _channel_id: u64,
        text: &str,
        _reply_to: Option<u64>,
    ) -> Result<(), DoppelError> {
        println!("{} {text}", "doppel:".green().bold());
        Ok(())
    }

    async fn show_typing(&self, _channel_id: u64) -> Result<(), DoppelError> {
        println!("{}", "...".dimmed());
        Ok(())
    }

    async fn fetch_attachment(&self, attachment: &Attachment) -> Result<Vec<u8>, DoppelError> {
        tokio::fs::read(&attachment.url)
            .await
            .map_err(|e| DoppelError::Channel {
                message: format!("cannot read local file {}: {e}", attachment.url),
                source: Some(Box::new(e)),
            })
    }
}
