// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock reply backend with a FIFO response queue.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use doppel_core::{DoppelError, GenerationRequest, ReplyBackend};

/// Backend that pops canned replies in order. When the queue is empty a
/// default reply is returned. `fail_next` makes generation fail once,
/// for error-path tests.
pub struct MockBackend {
    responses: Arc<Mutex<VecDeque<String>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
    calls: AtomicUsize,
    fail_next: AtomicBool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            requests: Arc::new(Mutex::new(Vec::new())),
            calls: AtomicUsize::new(0),
            fail_next: AtomicBool::new(false),
        }
    }

    pub async fn add_response(&self, text: &str) {
        self.responses.lock().await.push_back(text.to_string());
    }

    /// Makes the next `generate` call return an error.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request seen by `generate`, in call order.
    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplyBackend for MockBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, DoppelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());

        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(DoppelError::Backend {
                message: "mock backend failure".into(),
                source: None,
            });
        }

        Ok(self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| "mock reply".to_string()))
    }
}
