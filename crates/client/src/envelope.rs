//! Decoding of the `{success, error?, ...payload}` response envelope.
//!
//! Every endpoint answers with a JSON object. Payloads are pulled out by key
//! and deserialized into concrete types here, so nothing downstream ever sees
//! an untyped value.

use fitfind_core::{Page, Pagination};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::client::truncate;
use crate::error::ClientError;

#[derive(Debug)]
pub(crate) struct Envelope {
    body: Map<String, Value>,
}

impl Envelope {
    /// Parse a 2xx body. A body with `success: false` is rejected.
    pub(crate) fn parse(body: &str, context: &str) -> Result<Self, ClientError> {
        let value: Value = serde_json::from_str(body).map_err(|e| ClientError::JsonParse {
            context: format!("{context} (body: {})", truncate(body, 200)),
            source: e,
        })?;
        let Value::Object(body) = value else {
            return Err(ClientError::MissingField(format!("{context}: response is not an object")));
        };
        if body.get("success").and_then(Value::as_bool) == Some(false) {
            let message = error_message(&body).unwrap_or_else(|| "request failed".to_owned());
            return Err(ClientError::Rejected(message));
        }
        Ok(Self { body })
    }

    /// Take and deserialize the payload stored under `key`.
    pub(crate) fn take<T: DeserializeOwned>(&mut self, key: &str) -> Result<T, ClientError> {
        let value = self.body.remove(key).ok_or_else(|| ClientError::MissingField(key.to_owned()))?;
        serde_json::from_value(value)
            .map_err(|e| ClientError::JsonParse { context: format!("field `{key}`"), source: e })
    }

    /// Take a list payload together with its `pagination` block.
    pub(crate) fn take_page<T: DeserializeOwned>(
        &mut self,
        key: &str,
    ) -> Result<Page<T>, ClientError> {
        let items: Vec<T> = self.take(key)?;
        let pagination: Pagination = self.take("pagination")?;
        Ok(Page::new(items, pagination))
    }

    /// Deserialize the whole body, for endpoints that return the payload flat.
    pub(crate) fn into_flat<T: DeserializeOwned>(self, context: &str) -> Result<T, ClientError> {
        serde_json::from_value(Value::Object(self.body))
            .map_err(|e| ClientError::JsonParse { context: context.to_owned(), source: e })
    }
}

/// Extract the message of an error body, if it has one.
pub(crate) fn error_message(body: &Map<String, Value>) -> Option<String> {
    body.get("error")
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

/// Best-effort message for a non-2xx response body.
pub(crate) fn status_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => {
            error_message(&map).unwrap_or_else(|| truncate(body, 200).to_owned())
        },
        _ => truncate(body, 200).to_owned(),
    }
}
