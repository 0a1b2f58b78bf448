//! Error types for the vmeste API client.
//!
//! # Design
//! Callers need to tell "the request could not be built", "the server was
//! unreachable" and "the server answered with something we cannot read"
//! apart, so each gets its own variant. A registration the server rejects is
//! not an error here: it decodes into a `RegistrationResult` with
//! `accepted == false`.

use thiserror::Error;

/// Errors settled through a `ResponseEnvelope`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be built; nothing was sent.
    #[error("request construction failed: {0}")]
    Construction(String),

    /// The network round-trip failed (connect, DNS, TLS, timeout, reset).
    #[error("transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body does not match the expected shape.
    #[error("decoding HTTP {status} response ({}) failed: {source}", content_type.as_deref().unwrap_or("no content type"))]
    Decode {
        status: u16,
        content_type: Option<String>,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    pub fn is_construction(&self) -> bool {
        matches!(self, ApiError::Construction(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, ApiError::Decode { .. })
    }

    /// HTTP status of the response that failed to decode.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Decode { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// `Content-Type` of the response that failed to decode.
    pub fn content_type(&self) -> Option<&str> {
        match self {
            ApiError::Decode { content_type, .. } => content_type.as_deref(),
            _ => None,
        }
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        ApiError::Construction(format!("invalid url: {err}"))
    }
}

/// Single-settlement outcome of one API call.
pub type ResponseEnvelope<T> = Result<T, ApiError>;
