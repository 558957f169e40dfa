use std::time::Duration;
use thiserror::Error;

/// Errors produced by the harvest pipeline.
///
/// Every fallible core operation fails with exactly one of these kinds;
/// there are no partial results. Silent defaulting happens in just two
/// places, and neither is an error: absent record fields become `"Unknown"`,
/// and parameters without a raw value are omitted from synthesized
/// arguments.
#[derive(Error, Debug)]
pub enum HarvestError {
    /// The opening payload delimiter was not found, or no closing delimiter
    /// follows it.
    #[error("no <{tag}>...</{tag}> payload found in response")]
    PayloadNotFound {
        /// The delimiter tag name that was searched for.
        tag: String,
    },

    /// The payload could not be parsed as markup, or a required structural
    /// attribute is missing.
    #[error("malformed payload: {reason}")]
    MalformedPayload {
        /// What was wrong with the payload.
        reason: String,
    },

    /// A parameter declared a type outside the conversion table
    /// (`int`, `float`, `str`, `bool`).
    #[error("unsupported parameter type '{declared}'")]
    UnsupportedType {
        /// The declared type name as it appeared in the descriptor.
        declared: String,
    },

    /// A raw value did not parse as its declared numeric type.
    #[error("cannot convert '{raw}' to {declared}")]
    ValueConversion {
        /// The declared type name.
        declared: &'static str,
        /// The raw value that failed to parse.
        raw: String,
    },

    /// A proposed call named a function that is not in the whitelist.
    #[error("function '{name}' is not whitelisted")]
    UnknownFunction {
        /// The candidate function name.
        name: String,
    },

    /// The call syntax was malformed, arguments did not bind, or the
    /// whitelisted callable itself failed.
    #[error("invocation failed: {reason}")]
    Invocation {
        /// Description of the failure.
        reason: String,
    },
}

/// Errors produced by the chat transport.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Low-level HTTP transport failure (connection refused, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing failed at the serde level.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error with status code, response body, and optional Retry-After hint.
    ///
    /// Returned by [`Backend`](crate::chat::Backend) implementations when
    /// the provider returns a non-success status code. The `retry_after` field
    /// is populated from the `Retry-After` response header when present.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code (e.g. 429, 500, 503).
        status: u16,
        /// Response body text.
        body: String,
        /// Parsed `Retry-After` header value, if present.
        retry_after: Option<Duration>,
    },

    /// The model answered with an empty or whitespace-only completion.
    #[error("empty completion from model")]
    EmptyResponse,

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for ChatError {
    fn from(err: anyhow::Error) -> Self {
        ChatError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
