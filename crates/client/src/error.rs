//! Typed error enum for the HTTP client crate.

use fitfind_core::FitFindError;
use thiserror::Error;

/// Errors from FitFind API requests.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),
    #[error("HTTP status {code}: {message}")]
    HttpStatus { code: u16, message: String },
    /// 2xx response whose envelope says `success: false`.
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("JSON parse error in {context}: {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("missing field in response: {0}")]
    MissingField(String),
    #[error("client initialization failed: {0}")]
    ClientInit(String),
}

impl From<ClientError> for FitFindError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::HttpRequest(e) if e.is_decode() => Self::Decode(e.to_string()),
            ClientError::HttpRequest(e) if e.is_builder() => Self::Unexpected(e.to_string()),
            ClientError::HttpRequest(e) => Self::Network(e.to_string()),
            ClientError::HttpStatus { code, message } => Self::from_status(code, message),
            ClientError::Rejected(message) => Self::from_status(400, message),
            ClientError::JsonParse { context, source } => {
                Self::Decode(format!("{context}: {source}"))
            },
            ClientError::MissingField(field) => Self::Decode(format!("missing field `{field}`")),
            ClientError::ClientInit(message) => Self::Unexpected(message),
        }
    }
}
