// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply backend trait for the LLM collaborator.

use async_trait::async_trait;

use crate::error::DoppelError;
use crate::types::GenerationRequest;

/// A backend that turns a generation request into reply text.
///
/// Implementations own their retry policy; when `generate` returns an error
/// the request is terminal for that message and the dispatcher converts it
/// into a user-facing apology.
#[async_trait]
pub trait ReplyBackend: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, DoppelError>;
}
