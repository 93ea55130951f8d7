use std::time::Duration;

use reqwest::{Method, RequestBuilder};

use crate::envelope::{Envelope, status_message};
use crate::error::ClientError;

/// Default API base URL for local development.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client for the FitFind REST API.
pub struct ApiClient {
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) token: Option<String>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("client", &self.client)
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ApiClient {
    /// Creates a new API client for the given base URL.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built (TLS backend failure).
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::ClientInit(e.to_string()))?;
        Ok(Self { client, base_url, token })
    }

    /// Creates a client from `FITFIND_API_URL`, `FITFIND_API_TOKEN` and
    /// `FITFIND_HTTP_TIMEOUT_SECS`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, ClientError> {
        let base_url = fitfind_core::env_non_empty("FITFIND_API_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let token = fitfind_core::env_non_empty("FITFIND_API_TOKEN");
        let timeout =
            fitfind_core::env_duration_secs("FITFIND_HTTP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);
        Self::new(&base_url, token, timeout)
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub const fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{path}", self.base_url));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request once and decode the response envelope.
    ///
    /// # Errors
    /// Returns an error if the request fails, the status is not 2xx, or the
    /// body is not a successful envelope.
    pub(crate) async fn execute(
        &self,
        builder: RequestBuilder,
        context: &str,
    ) -> Result<Envelope, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let code = status.as_u16();
            tracing::debug!(context, code, "API request failed");
            return Err(ClientError::HttpStatus { code, message: status_message(&body) });
        }

        Envelope::parse(&body, context)
    }
}

/// Truncates a string to the given maximum length at a char boundary.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        s
    } else {
        let mut end = max_len;
        while end > 0 && !s.is_char_boundary(end) {
            end = end.saturating_sub(1);
        }
        s.get(..end).unwrap_or("")
    }
}
