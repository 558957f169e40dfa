//! Chat transport: fetching raw model text for the harvest pipeline.
//!
//! [`ChatClient`] sends an ordered, role-tagged conversation to a model
//! server and returns the text completion. The [`Backend`] trait abstracts
//! the provider; built-ins are [`OllamaBackend`] (non-streaming `/api/chat`)
//! and [`MockBackend`] (canned responses for tests and demos). Transient
//! HTTP failures retry per [`BackoffConfig`], and each retry is announced as
//! a [`TransportRetry`](crate::observe::Event::TransportRetry) event.
//!
//! Everything downstream of the transport is synchronous and pure; this
//! module is the only place the crate touches the network.

pub mod backoff;
pub mod mock;
pub mod ollama;

pub use backoff::BackoffConfig;
pub use mock::MockBackend;
pub use ollama::OllamaBackend;

use crate::error::ChatError;
use crate::observe::{emit, Event, EventHandler};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// The role of the message author.
    pub role: Role,
    /// The message content.
    pub content: String,
}

impl ChatMessage {
    /// A system-role message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// A user-role message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// An assistant-role message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// System instructions.
    System,
    /// User input.
    User,
    /// Assistant (model) response.
    Assistant,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Generation settings applied to each request.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Sampling temperature. Default: 0.7.
    pub temperature: f64,
    /// Maximum tokens to generate. Default: 2048.
    pub max_tokens: u32,
    /// Extra provider options merged into the request verbatim.
    pub options: Option<Value>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2048,
            options: None,
        }
    }
}

impl LlmConfig {
    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the token budget.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Merge extra provider options into every request.
    pub fn with_options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }
}

/// A normalized chat request, provider-agnostic.
///
/// [`ChatClient`] builds this; the [`Backend`] translates it into the
/// provider-specific HTTP request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier (e.g. `"llama3.2"`, `"llama3.2:1b"`).
    pub model: String,
    /// The conversation, in order.
    pub messages: Vec<ChatMessage>,
    /// Generation settings.
    pub config: LlmConfig,
}

/// A normalized chat response.
#[derive(Debug)]
pub struct ChatResponse {
    /// The completion text.
    pub text: String,
    /// HTTP status code (for diagnostics/logging).
    pub status: u16,
    /// Provider-specific metadata (token counts, timing, model info).
    /// Stored as raw JSON; each provider returns different fields.
    pub metadata: Option<Value>,
}

/// Abstraction over chat providers.
///
/// Implementors translate between the normalized [`ChatRequest`]/
/// [`ChatResponse`] and the provider's HTTP API.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn Backend>`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Execute a chat call and return the completion.
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &ChatRequest,
    ) -> Result<ChatResponse, ChatError>;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}

/// Check whether a [`ChatError`] is retryable under the backoff config.
///
/// Retryable conditions:
/// - [`ChatError::Http`] with a status in `config.retryable_statuses`
/// - [`ChatError::Request`] (connection/transport errors)
pub fn is_retryable(error: &ChatError, config: &BackoffConfig) -> bool {
    match error {
        ChatError::Http { status, .. } => config.retryable_statuses.contains(status),
        ChatError::Request(_) => true,
        _ => false,
    }
}

/// Execute a backend call with transport-level retry and exponential backoff.
///
/// Retries transient failures (429, 5xx, connection errors) per the
/// [`BackoffConfig`], honoring `Retry-After` hints when configured. Each
/// upcoming retry is announced as a
/// [`TransportRetry`](Event::TransportRetry) event before the delay.
/// Returns the first successful response, or the last error once retries
/// are exhausted.
pub async fn send_with_backoff(
    backend: &Arc<dyn Backend>,
    client: &Client,
    base_url: &str,
    request: &ChatRequest,
    config: &BackoffConfig,
    events: &Option<Arc<dyn EventHandler>>,
) -> Result<ChatResponse, ChatError> {
    let mut last_error: Option<ChatError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = match &last_error {
                Some(ChatError::Http {
                    retry_after: Some(ra),
                    ..
                }) if config.respect_retry_after => *ra,
                _ => config.delay_for_attempt(attempt - 1),
            };

            let reason = last_error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_default();

            emit(
                events,
                Event::TransportRetry {
                    attempt,
                    delay_ms: delay.as_millis() as u64,
                    reason,
                },
            );

            tokio::time::sleep(delay).await;
        }

        match backend.complete(client, base_url, request).await {
            Ok(response) => return Ok(response),
            Err(e) => {
                if attempt < config.max_retries && is_retryable(&e, config) {
                    last_error = Some(e);
                    continue;
                }
                return Err(e);
            }
        }
    }

    // Should not reach here, but just in case
    Err(last_error.unwrap_or(ChatError::Other(
        "backoff loop exited unexpectedly".into(),
    )))
}

/// Client for a chat-capable model server.
///
/// Owns the HTTP client, endpoint, backend, retry policy, and optional
/// event handler. Construct once with [`ChatClient::builder`] and reuse.
///
/// # Example
///
/// ```
/// use llm_harvest::chat::{BackoffConfig, ChatClient};
///
/// let client = ChatClient::builder("http://localhost:11434")
///     .backoff(BackoffConfig::standard())
///     .build();
/// ```
pub struct ChatClient {
    /// HTTP client (cheap to clone; uses `Arc` internally).
    pub http: Client,
    /// Base URL of the model server (e.g. `http://localhost:11434`).
    pub base_url: String,
    /// Chat backend. Default: [`OllamaBackend`].
    pub backend: Arc<dyn Backend>,
    /// Transport retry configuration. Default: [`BackoffConfig::none()`].
    pub backoff: BackoffConfig,
    /// Generation settings applied to every request.
    pub config: LlmConfig,
    /// Optional event handler, notified of transport retries.
    pub events: Option<Arc<dyn EventHandler>>,
}

impl ChatClient {
    /// Create a builder for the given base URL.
    pub fn builder(base_url: impl Into<String>) -> ChatClientBuilder {
        ChatClientBuilder {
            http: None,
            base_url: base_url.into(),
            backend: None,
            backoff: None,
            config: LlmConfig::default(),
            events: None,
            timeout: None,
        }
    }

    /// Send a conversation and return the model's completion text.
    ///
    /// Fails with [`ChatError::EmptyResponse`] when the model answers with
    /// nothing but whitespace; transport failures retry per the configured
    /// backoff before surfacing.
    pub async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String, ChatError> {
        let response = self.send(model, messages).await?;
        if response.text.trim().is_empty() {
            return Err(ChatError::EmptyResponse);
        }
        Ok(response.text)
    }

    /// Send a conversation and return the full [`ChatResponse`], provider
    /// metadata included. Unlike [`complete`](Self::complete), an empty
    /// completion is returned as-is.
    pub async fn send(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<ChatResponse, ChatError> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            config: self.config.clone(),
        };
        send_with_backoff(
            &self.backend,
            &self.http,
            &self.base_url,
            &request,
            &self.backoff,
            &self.events,
        )
        .await
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.base_url)
            .field("backend", &self.backend.name())
            .field("backoff", &self.backoff)
            .field("has_event_handler", &self.events.is_some())
            .finish()
    }
}

/// Builder for [`ChatClient`].
pub struct ChatClientBuilder {
    http: Option<Client>,
    base_url: String,
    backend: Option<Arc<dyn Backend>>,
    backoff: Option<BackoffConfig>,
    config: LlmConfig,
    events: Option<Arc<dyn EventHandler>>,
    timeout: Option<Duration>,
}

impl ChatClientBuilder {
    /// Use a pre-built HTTP client instead of constructing one.
    pub fn http(mut self, client: Client) -> Self {
        self.http = Some(client);
        self
    }

    /// Set the chat backend. Default: [`OllamaBackend`].
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the transport retry configuration. Default: [`BackoffConfig::none()`].
    pub fn backoff(mut self, config: BackoffConfig) -> Self {
        self.backoff = Some(config);
        self
    }

    /// Set the generation settings applied to every request.
    pub fn config(mut self, config: LlmConfig) -> Self {
        self.config = config;
        self
    }

    /// Install an event handler for transport retry events.
    pub fn events(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.events = Some(handler);
        self
    }

    /// Set the request timeout. Default: 60 seconds. Ignored when a custom
    /// client was supplied via [`http`](Self::http); that client's own
    /// timeout applies.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> ChatClient {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(60));
        let http = self.http.unwrap_or_else(|| {
            Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client")
        });

        ChatClient {
            http,
            base_url: normalize_base_url(&self.base_url),
            backend: self.backend.unwrap_or_else(|| Arc::new(OllamaBackend)),
            backoff: self.backoff.unwrap_or_default(),
            config: self.config,
            events: self.events,
        }
    }
}

/// Strip known provider path suffixes from a base URL so backends can append
/// their own paths without double-pathing.
/// e.g. `http://localhost:11434/api/chat` becomes `http://localhost:11434`.
fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    for suffix in ["/api/chat", "/api/generate", "/api", "/v1"] {
        if let Some(stripped) = trimmed.strip_suffix(suffix) {
            return stripped.to_string();
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::FnEventHandler;
    use std::sync::Mutex;

    // ── message and config types ──

    #[test]
    fn test_role_wire_names() {
        assert_eq!(Role::System.as_str(), "system");
        assert_eq!(Role::User.as_str(), "user");
        assert_eq!(Role::Assistant.as_str(), "assistant");
    }

    #[test]
    fn test_message_constructors() {
        let msg = ChatMessage::system("be brief");
        assert_eq!(msg.role, Role::System);
        assert_eq!(msg.content, "be brief");
        assert_eq!(ChatMessage::user("hi").role, Role::User);
        assert_eq!(ChatMessage::assistant("hello").role, Role::Assistant);
    }

    #[test]
    fn test_llm_config_defaults_and_builders() {
        let config = LlmConfig::default();
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.max_tokens, 2048);
        assert!(config.options.is_none());

        let tuned = LlmConfig::default()
            .with_temperature(0.0)
            .with_max_tokens(256)
            .with_options(serde_json::json!({"seed": 7}));
        assert_eq!(tuned.temperature, 0.0);
        assert_eq!(tuned.max_tokens, 256);
        assert_eq!(tuned.options.unwrap()["seed"], 7);
    }

    // ── retry classification ──

    fn http_error(status: u16) -> ChatError {
        ChatError::Http {
            status,
            body: "error body".into(),
            retry_after: None,
        }
    }

    #[test]
    fn test_is_retryable_429_and_503() {
        let config = BackoffConfig::standard();
        assert!(is_retryable(&http_error(429), &config));
        assert!(is_retryable(&http_error(503), &config));
    }

    #[test]
    fn test_is_retryable_400_not_retried() {
        assert!(!is_retryable(&http_error(400), &BackoffConfig::standard()));
    }

    #[test]
    fn test_is_retryable_other_errors_not_retried() {
        let config = BackoffConfig::standard();
        assert!(!is_retryable(&ChatError::Other("x".into()), &config));
        assert!(!is_retryable(&ChatError::EmptyResponse, &config));
    }

    // ── client ──

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("http://localhost:11434"), "http://localhost:11434");
        assert_eq!(normalize_base_url("http://localhost:11434/"), "http://localhost:11434");
        assert_eq!(normalize_base_url("http://localhost:11434/api/chat"), "http://localhost:11434");
        assert_eq!(normalize_base_url("http://localhost:11434/api"), "http://localhost:11434");
        assert_eq!(normalize_base_url("https://host/v1"), "https://host");
    }

    #[test]
    fn test_builder_defaults() {
        let client = ChatClient::builder("http://localhost:11434/api/chat").build();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.backend.name(), "ollama");
        assert_eq!(client.backoff.max_retries, 0);
        assert!(client.events.is_none());
    }

    #[tokio::test]
    async fn test_complete_through_mock_backend() {
        let client = ChatClient::builder("http://unused")
            .backend(Arc::new(MockBackend::fixed("<booklist></booklist>")))
            .build();

        let text = client
            .complete("llama3.2", &[ChatMessage::user("books please")])
            .await
            .unwrap();
        assert_eq!(text, "<booklist></booklist>");
    }

    #[tokio::test]
    async fn test_blank_completion_is_empty_response() {
        let client = ChatClient::builder("http://unused")
            .backend(Arc::new(MockBackend::fixed("   \n")))
            .build();

        let err = client
            .complete("llama3.2", &[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::EmptyResponse));
        // send() hands the blank text back untouched.
        let response = client
            .send("llama3.2", &[ChatMessage::user("hi")])
            .await
            .unwrap();
        assert_eq!(response.text, "   \n");
    }

    #[tokio::test]
    async fn test_mock_responses_cycle_in_order() {
        let client = ChatClient::builder("http://unused")
            .backend(Arc::new(MockBackend::new(vec![
                "one".to_string(),
                "two".to_string(),
            ])))
            .build();
        let messages = [ChatMessage::user("go")];

        assert_eq!(client.complete("m", &messages).await.unwrap(), "one");
        assert_eq!(client.complete("m", &messages).await.unwrap(), "two");
        assert_eq!(client.complete("m", &messages).await.unwrap(), "one");
    }

    #[tokio::test]
    async fn test_retry_emits_transport_events() {
        struct FlakyBackend {
            calls: Mutex<u32>,
        }

        #[async_trait]
        impl Backend for FlakyBackend {
            async fn complete(
                &self,
                _client: &Client,
                _base_url: &str,
                _request: &ChatRequest,
            ) -> Result<ChatResponse, ChatError> {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                if *calls == 1 {
                    return Err(ChatError::Http {
                        status: 503,
                        body: "busy".into(),
                        retry_after: None,
                    });
                }
                Ok(ChatResponse {
                    text: "recovered".into(),
                    status: 200,
                    metadata: None,
                })
            }

            fn name(&self) -> &'static str {
                "flaky"
            }
        }

        let retries = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&retries);
        let handler = Arc::new(FnEventHandler(move |event: Event| {
            if let Event::TransportRetry { attempt, reason, .. } = event {
                sink.lock().unwrap().push((attempt, reason));
            }
        }));

        let client = ChatClient::builder("http://unused")
            .backend(Arc::new(FlakyBackend {
                calls: Mutex::new(0),
            }))
            .backoff(BackoffConfig {
                max_retries: 2,
                initial_delay: Duration::from_millis(1),
                jitter: backoff::JitterStrategy::None,
                ..BackoffConfig::standard()
            })
            .events(handler)
            .build();

        let text = client
            .complete("m", &[ChatMessage::user("go")])
            .await
            .unwrap();
        assert_eq!(text, "recovered");

        let seen = retries.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, 1);
        assert!(seen[0].1.contains("503"));
    }

    #[tokio::test]
    async fn test_no_retry_when_backoff_none() {
        struct AlwaysBusy;

        #[async_trait]
        impl Backend for AlwaysBusy {
            async fn complete(
                &self,
                _client: &Client,
                _base_url: &str,
                _request: &ChatRequest,
            ) -> Result<ChatResponse, ChatError> {
                Err(ChatError::Http {
                    status: 503,
                    body: "busy".into(),
                    retry_after: None,
                })
            }

            fn name(&self) -> &'static str {
                "busy"
            }
        }

        let client = ChatClient::builder("http://unused")
            .backend(Arc::new(AlwaysBusy))
            .build();

        let err = client
            .complete("m", &[ChatMessage::user("go")])
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Http { status: 503, .. }));
    }
}
