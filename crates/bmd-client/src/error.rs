//! Client error types.
//!
//! The taxonomy matters to callers: the sync engine skips or terminates on
//! `Business`, treats `Transport`/`Http` as routine-aborting, and handles
//! `Decode` per call site. The client itself never retries.

use thiserror::Error;

/// Client error types.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Connection, DNS, or timeout failure before a response arrived.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx HTTP status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// HTTP 200 with a non-success business code in the envelope.
    #[error("Business error {code}: {message}")]
    Business { code: String, message: String },

    /// Malformed JSON or an unexpected response shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Request signature could not be computed.
    #[error("Signing error: {0}")]
    Signing(String),
}

impl ClientError {
    /// True for application-level failures signaled inside a successful
    /// transport response.
    pub fn is_business(&self) -> bool {
        matches!(self, Self::Business { .. })
    }
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
