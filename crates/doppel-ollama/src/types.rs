// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the Ollama `/api/chat` endpoint.

use serde::{Deserialize, Serialize};

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub options: ChatOptions,
}

/// One message in the chat history sent to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Sampling options forwarded to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOptions {
    pub temperature: f64,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// Response body for a non-streaming chat completion.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    pub content: String,
}
