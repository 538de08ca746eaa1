// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Voice transcription providers.
//!
//! Two implementations of [`doppel_core::Transcriber`]: an HTTP provider
//! that posts audio to an external ASR service, and a dummy provider that
//! emits a fixed placeholder transcript. A service that answers without a
//! recognizable text is not an error; only transport failures are.

use std::time::Duration;

use async_trait::async_trait;
use doppel_config::AsrConfig;
use doppel_core::{DoppelError, Transcriber};
use serde::Deserialize;
use tracing::{error, warn};

/// Transcript produced by [`DummyTranscriber`] for every audio message.
pub const PLACEHOLDER_TRANSCRIPT: &str = "（语音内容占位，未实际转写）";

/// Provider used when no ASR service is configured. It returns
/// [`PLACEHOLDER_TRANSCRIPT`] so voice messages still flow through the
/// pipeline instead of dead-ending in an apology.
pub struct DummyTranscriber;

#[async_trait]
impl Transcriber for DummyTranscriber {
    async fn transcribe(
        &self,
        _audio: &[u8],
        filename: &str,
    ) -> Result<Option<String>, DoppelError> {
        warn!(filename, "dummy transcriber, returning placeholder transcript");
        Ok(Some(PLACEHOLDER_TRANSCRIPT.to_string()))
    }
}

/// Expected response shape from the ASR endpoint.
#[derive(Debug, Deserialize)]
struct AsrResponse {
    text: Option<String>,
}

/// Provider that posts audio as multipart form data to an HTTP endpoint
/// and expects `{"text": "..."}` back.
pub struct HttpTranscriber {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTranscriber {
    pub fn new(endpoint: String, timeout_seconds: u64) -> Result<Self, DoppelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| DoppelError::Transcription {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(
        &self,
        audio: &[u8],
        filename: &str,
    ) -> Result<Option<String>, DoppelError> {
        let part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| DoppelError::Transcription {
                message: format!("ASR request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(filename, %status, body, "ASR service rejected the audio");
            return Ok(None);
        }

        let parsed: AsrResponse =
            response.json().await.map_err(|e| DoppelError::Transcription {
                message: format!("failed to parse ASR response: {e}"),
            })?;

        match parsed.text {
            Some(text) if !text.trim().is_empty() => Ok(Some(text.trim().to_string())),
            _ => {
                warn!(filename, "ASR service recognized no speech");
                Ok(None)
            }
        }
    }
}

/// Builds the transcriber named by the config. Unknown providers fall
/// back to the dummy with a warning; config validation already rejects an
/// HTTP provider without an endpoint.
pub fn build_transcriber(config: &AsrConfig) -> Result<Box<dyn Transcriber>, DoppelError> {
    match config.provider.as_str() {
        "http" => {
            let endpoint = config.endpoint.clone().ok_or_else(|| {
                DoppelError::Config("asr.endpoint is required for the http provider".into())
            })?;
            Ok(Box::new(HttpTranscriber::new(endpoint, config.timeout_seconds)?))
        }
        "dummy" => Ok(Box::new(DummyTranscriber)),
        other => {
            warn!(provider = other, "unknown ASR provider, using dummy");
            Ok(Box::new(DummyTranscriber))
        }
    }
}
