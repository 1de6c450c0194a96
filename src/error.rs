//! Error type shared by transports, the cache, and the decoding layer.

use thiserror::Error;

use crate::http::StatusCode;

/// Errors surfaced by a fetch.
///
/// A coalesced request settles once and every caller awaiting its key gets a
/// clone of the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The transport could not complete the request (connection refused, DNS, TLS, ...).
    #[error("transport error for {target}: {message}")]
    Transport { target: String, message: String },

    /// The response settled with a non-success status. Only the decoding
    /// layer produces this; the cache itself hands unsuccessful responses back
    /// untouched after evicting them.
    #[error("unsuccessful response: {status}")]
    Status { status: StatusCode },

    /// The body could not be decoded.
    #[error("failed to decode response body: {0}")]
    Decode(String),
}

impl FetchError {
    /// Convenience constructor for transport failures.
    pub fn transport(target: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Returns the status code carried by a [`FetchError::Status`].
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
