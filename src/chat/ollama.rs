//! Backend for Ollama's native chat API.
//!
//! [`OllamaBackend`] translates normalized [`ChatRequest`]s into Ollama's
//! `/api/chat` endpoint, non-streaming. This is the default backend.

use super::{Backend, ChatRequest, ChatResponse};
use crate::error::ChatError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Backend for Ollama's native `/api/chat` endpoint (non-streaming).
///
/// The whole conversation travels in each request; Ollama holds no state
/// between calls.
#[derive(Debug, Clone)]
pub struct OllamaBackend;

impl OllamaBackend {
    /// Build the Ollama `options` object from the request config.
    fn build_options(request: &ChatRequest) -> Value {
        let mut opts = json!({
            "temperature": request.config.temperature,
            "num_predict": request.config.max_tokens,
        });
        if let Some(ref custom) = request.config.options {
            if let (Some(base), Some(extra)) = (opts.as_object_mut(), custom.as_object()) {
                for (k, v) in extra {
                    base.insert(k.clone(), v.clone());
                }
            }
        }
        opts
    }

    /// Build the JSON body for `/api/chat`.
    fn build_body(request: &ChatRequest) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|msg| json!({"role": msg.role.as_str(), "content": msg.content}))
            .collect();

        json!({
            "model": request.model,
            "messages": messages,
            "stream": false,
            "options": Self::build_options(request),
        })
    }

    /// Parse a Retry-After header value as seconds.
    fn parse_retry_after(value: &str) -> Option<std::time::Duration> {
        value
            .trim()
            .parse::<u64>()
            .ok()
            .map(std::time::Duration::from_secs)
    }

    /// Extract provider metadata (timing, token counts) from a response.
    fn extract_metadata(json_resp: &Value) -> Option<Value> {
        let mut meta = serde_json::Map::new();
        for key in [
            "model",
            "total_duration",
            "eval_count",
            "eval_duration",
            "prompt_eval_count",
        ] {
            if let Some(v) = json_resp.get(key) {
                meta.insert(key.to_string(), v.clone());
            }
        }
        if meta.is_empty() {
            None
        } else {
            Some(Value::Object(meta))
        }
    }
}

#[async_trait]
impl Backend for OllamaBackend {
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &ChatRequest,
    ) -> Result<ChatResponse, ChatError> {
        let url = format!("{}/api/chat", base_url.trim_end_matches('/'));
        let body = Self::build_body(request);

        let resp = client.post(&url).json(&body).send().await.map_err(|e| {
            ChatError::Other(format!("Failed to connect to model at {}: {}", url, e))
        })?;

        let status = resp.status().as_u16();

        if !resp.status().is_success() {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(Self::parse_retry_after);
            let text = resp.text().await.unwrap_or_default();
            return Err(ChatError::Http {
                status,
                body: text,
                retry_after,
            });
        }

        let json_resp: Value = resp.json().await?;
        let text = json_resp
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        Ok(ChatResponse {
            text,
            status,
            metadata: Self::extract_metadata(&json_resp),
        })
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}
