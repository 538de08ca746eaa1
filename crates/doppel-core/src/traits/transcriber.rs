// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcriber trait for the speech-to-text collaborator.

use async_trait::async_trait;

use crate::error::DoppelError;

/// Speech-to-text provider: binary in, text out.
///
/// `Ok(None)` signals a recoverable failure (the user is asked to retry in
/// text). The core never retries transcription; providers own their own
/// retry policy if any.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        audio: &[u8],
        filename: &str,
    ) -> Result<Option<String>, DoppelError>;
}
