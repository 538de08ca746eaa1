// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Doppel agent core.

use thiserror::Error;

/// The primary error type used across all Doppel adapter traits and core operations.
///
/// Policy rejections and rate limiting are *not* errors -- they are expected
/// outcomes carried by [`crate::types::AccessDecision`] and the dispatcher's
/// outcome enum. Only genuinely failed operations surface here.
#[derive(Debug, Error)]
pub enum DoppelError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Channel gateway errors (send failure, attachment fetch failure).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// LLM backend errors (exhausted retries, fatal status, malformed response).
    #[error("backend error: {message}")]
    Backend {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Speech-to-text collaborator errors (transport failure, bad payload).
    #[error("transcription error: {message}")]
    Transcription { message: String },

    /// Persistence errors (runtime state, audit log, conversation log writes).
    #[error("persistence error: {source}")]
    Persistence {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for DoppelError {
    fn from(err: std::io::Error) -> Self {
        DoppelError::Persistence {
            source: Box::new(err),
        }
    }
}

impl From<serde_json::Error> for DoppelError {
    fn from(err: serde_json::Error) -> Self {
        DoppelError::Persistence {
            source: Box::new(err),
        }
    }
}
