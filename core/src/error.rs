//! Error types for the task-list API client.
//!
//! # Design
//! `Transport` means no response was received at all. Everything else is a
//! response the client could not accept. `Unauthorized` is split out because
//! the login flow surfaces the server's message verbatim. `NotFound` gets its
//! own variant because callers distinguish "no such todo" from other statuses.

use thiserror::Error;

pub type ApiResult<T = ()> = Result<T, ApiError>;

/// Errors returned by `ApiClient` parse methods, transports and storage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No response was received (connection refused, DNS, TLS, ...).
    #[error("network error: {0}")]
    Transport(String),

    /// The server rejected the credentials or token (400/401/403).
    #[error("HTTP {status}: {}", message.as_deref().unwrap_or("unauthorized"))]
    Unauthorized { status: u16, message: Option<String> },

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// Any other non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Reading or writing persisted state failed.
    #[error("storage failed: {0}")]
    Storage(String),
}

impl ApiError {
    /// HTTP status carried by the error, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { status, .. } | ApiError::Http { status, .. } => Some(*status),
            ApiError::NotFound => Some(404),
            _ => None,
        }
    }
}
