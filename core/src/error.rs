//! Error types for the student portal client.
//!
//! # Design
//! Callers mostly need to answer one question: did the server reject the
//! request, or did something else break? `Api` is the only variant produced
//! from a server response carrying a non-2xx status; everything else is a
//! local or transport failure. 401/403 responses are additionally surfaced
//! through `needs_reauth` so every protected call can apply the same forced
//! logout policy.

use thiserror::Error;

/// Errors returned by the portal client, transport and session layers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No response was received (connection refused, DNS failure, timeout).
    #[error("could not connect to server: {message}")]
    Transport { message: String },

    /// The server responded with a non-2xx status.
    #[error("{message}")]
    Api { message: String, status: u16 },

    /// A 2xx response carried a body that is not the expected JSON.
    #[error("failed to parse JSON response from {url} (HTTP {status})")]
    Parse { url: String, status: u16 },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The caller passed an argument the request cannot be built from.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A protected call was attempted without a stored session.
    #[error("not logged in")]
    NotAuthenticated,

    /// The persisted session could not be read or written.
    #[error("token store error: {0}")]
    TokenStore(String),
}

impl ApiError {
    /// HTTP status attached to the error, if the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } | ApiError::Parse { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the server answered and rejected the request.
    pub fn is_server_rejection(&self) -> bool {
        matches!(self, ApiError::Api { .. })
    }

    /// Returns true if the stored session must be dropped and the user sent
    /// back to the login entry point.
    pub fn needs_reauth(&self) -> bool {
        match self {
            ApiError::Api { status, .. } => matches!(status, 401 | 403),
            ApiError::NotAuthenticated => true,
            _ => false,
        }
    }

    /// Short title for a user-facing notification; the `Display` output is
    /// the matching message.
    pub fn title(&self) -> &'static str {
        match self {
            ApiError::Transport { .. } => "Connection Error",
            ApiError::Api { .. } if self.needs_reauth() => "Session Expired",
            ApiError::Api { .. } => "Request Failed",
            ApiError::Parse { .. } => "Unexpected Response",
            ApiError::Serialization(_) | ApiError::InvalidArgument(_) => "Invalid Input",
            ApiError::NotAuthenticated => "Authentication Error",
            ApiError::TokenStore(_) => "Storage Error",
        }
    }
}

impl From<ureq::Error> for ApiError {
    fn from(err: ureq::Error) -> Self {
        ApiError::Transport {
            message: err.to_string(),
        }
    }
}
