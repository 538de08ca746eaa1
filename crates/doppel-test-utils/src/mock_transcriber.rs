// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock speech-to-text provider.

use std::sync::Mutex;

use async_trait::async_trait;

use doppel_core::{DoppelError, Transcriber};

/// What the next `transcribe` call should do.
enum Behavior {
    Text(String),
    NoRecognition,
    Error,
}

/// Transcriber with a fixed scripted behavior.
pub struct MockTranscriber {
    behavior: Mutex<Behavior>,
}

impl MockTranscriber {
    /// Recognizes every clip as `text`.
    pub fn recognizing(text: &str) -> Self {
        Self {
            behavior: Mutex::new(Behavior::Text(text.to_string())),
        }
    }

    /// Returns `Ok(None)` for every clip.
    pub fn hearing_nothing() -> Self {
        Self {
            behavior: Mutex::new(Behavior::NoRecognition),
        }
    }

    /// Fails every clip with a transcription error.
    pub fn failing() -> Self {
        Self {
            behavior: Mutex::new(Behavior::Error),
        }
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(
        &self,
        _audio: &[u8],
        _filename: &str,
    ) -> Result<Option<String>, DoppelError> {
        let behavior = self.behavior.lock().unwrap_or_else(|e| e.into_inner());
        match &*behavior {
            Behavior::Text(text) => Ok(Some(text.clone())),
            Behavior::NoRecognition => Ok(None),
            Behavior::Error => Err(DoppelError::Transcription {
                message: "mock transcriber failure".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_behaviors() {
        let ok = MockTranscriber::recognizing("明天见");
        assert_eq!(
            ok.transcribe(b"x", "a.ogg").await.unwrap().as_deref(),
            Some("明天见")
        );

        let none = MockTranscriber::hearing_nothing();
        assert!(none.transcribe(b"x", "a.ogg").await.unwrap().is_none());

        let err = MockTranscriber::failing();
        assert!(err.transcribe(b"x", "a.ogg").await.is_err());
    }
}
