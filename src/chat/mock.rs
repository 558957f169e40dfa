//! Mock backend for tests and demos without a live model server.

use super::{Backend, ChatRequest, ChatResponse};
use crate::error::ChatError;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A test backend that returns canned responses in order.
///
/// Cycles back to the beginning once all responses have been consumed, so a
/// single-response mock can serve any number of calls.
///
/// # Examples
///
/// ```
/// use llm_harvest::chat::{ChatClient, MockBackend};
/// use std::sync::Arc;
///
/// let client = ChatClient::builder("http://unused")
///     .backend(Arc::new(MockBackend::fixed("<booklist></booklist>")))
///     .build();
/// ```
#[derive(Debug)]
pub struct MockBackend {
    responses: Vec<String>,
    index: AtomicUsize,
}

impl MockBackend {
    /// Create a mock backend with the given canned responses.
    ///
    /// Panics when `responses` is empty; a mock with nothing to say is
    /// always a bug in the test.
    pub fn new(responses: Vec<String>) -> Self {
        assert!(
            !responses.is_empty(),
            "MockBackend requires at least one response"
        );
        Self {
            responses,
            index: AtomicUsize::new(0),
        }
    }

    /// Create a mock that always returns the same response.
    pub fn fixed(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    fn next_response(&self) -> String {
        let i = self.index.fetch_add(1, Ordering::SeqCst) % self.responses.len();
        self.responses[i].clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn complete(
        &self,
        _client: &Client,
        _base_url: &str,
        _request: &ChatRequest,
    ) -> Result<ChatResponse, ChatError> {
        Ok(ChatResponse {
            text: self.next_response(),
            status: 200,
            metadata: None,
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
