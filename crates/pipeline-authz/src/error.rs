//! Error types for the reconciler and the build client.

use std::fmt;
use std::time::Duration;

/// Lifecycle operation that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Reconciler errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Local record or wire reference is structurally invalid.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The remote call failed. The source text is kept verbatim.
    #[error(
        "{operation} resource authorization for {resource_id} in project {project_id} failed: {source}"
    )]
    Remote {
        operation: Operation,
        project_id: String,
        resource_id: String,
        #[source]
        source: ClientError,
    },

    /// Remote state contradicts the one-relationship-per-triple assumption.
    #[error("invariant violation: {message}")]
    InvariantViolation { message: String },
}

impl AuthzError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Whether retrying the same lifecycle call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Remote { source, .. } => source.is_retryable(),
            Self::Validation { .. } | Self::InvariantViolation { .. } => false,
        }
    }
}

/// Result type for reconciler operations.
pub type AuthzResult<T> = Result<T, AuthzError>;

/// Errors raised by the remote client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Authentication failed or token invalid.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Project or route not found.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Rate limit exceeded.
    #[error("rate limited: {message} (retry after {retry_after:?})")]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },

    /// Request rejected by the service (4xx other than 401/403/404/429).
    #[error("request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// Network error or server-side failure (5xx).
    #[error("network error: {message}")]
    Network { message: String },

    /// Response body could not be understood.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl ClientError {
    /// Whether the error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network { .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
