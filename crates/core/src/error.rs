use std::result::Result as StdResult;

use thiserror::Error;

/// Errors surfaced by fitfind operations.
///
/// Every failure reaching a resource or a caller is classified into one of
/// these variants. The classification decides whether an operation is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FitFindError {
    /// 401/403: the request needs a valid session.
    #[error("authentication required: {0}")]
    AuthRequired(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// 400/422: the server rejected the input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The item already exists where it was being added.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Transport failure (connection refused, timeout, reset).
    #[error("network error: {0}")]
    Network(String),

    /// The client is offline and the operation was not attempted.
    #[error("client is offline")]
    Offline,

    /// Any other non-success status.
    #[error("HTTP status {status}: {message}")]
    Http { status: u16, message: String },

    /// The response did not have the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),

    /// The owning scope was cancelled before the operation finished.
    #[error("operation cancelled")]
    Cancelled,

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl FitFindError {
    /// Classify an HTTP error status with the message the server sent.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::AuthRequired(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            400 | 422 if is_conflict_message(&message) => Self::Conflict(message),
            400 | 422 => Self::Validation(message),
            _ => Self::Http { status, message },
        }
    }

    /// Whether the operation may succeed if attempted again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Http { status, .. } => matches!(status, 408 | 429 | 500..=599),
            _ => false,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Short message suitable for showing next to a failed action.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthRequired(_) => "Please sign in to continue.".to_owned(),
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::Network(_) => "Network error. Check your connection and try again.".to_owned(),
            Self::Offline => "You are offline. Changes will sync when you reconnect.".to_owned(),
            Self::Http { status, .. } if *status >= 500 => {
                "The server had a problem. Please try again.".to_owned()
            },
            Self::Http { message, .. } => message.clone(),
            Self::Decode(_) | Self::Unexpected(_) => {
                "Something went wrong. Please try again.".to_owned()
            },
            Self::Cancelled => "The operation was cancelled.".to_owned(),
        }
    }
}

fn is_conflict_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("already in") || lower.contains("already exists")
}

pub type Result<T> = StdResult<T, FitFindError>;
