use reqwest::Client;
use serde_json::Value;
use shared::protocol::CallRequest;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{CallForm, FormError, StatusSink, StatusText};

#[derive(Debug, Error)]
pub enum CallClientError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("{0}")]
    Decode(#[from] serde_json::Error),
}

/// Submits the call form to a server's `/initiate_call`. One request per submission,
/// with no retry and no timeout.
#[derive(Debug, Clone)]
pub struct CallClient {
    http: Client,
    server_url: String,
}

impl CallClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_http(Client::new(), server_url)
    }

    pub fn with_http(http: Client, server_url: impl Into<String>) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        Self { http, server_url }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Runs one click of the form. An empty phone raises the alert and sends nothing;
    /// otherwise the status goes to in-progress and then to the rendered reply.
    pub async fn submit(
        &self,
        form: &CallForm,
        sink: &dyn StatusSink,
    ) -> Result<StatusText, FormError> {
        let request = match form.assemble() {
            Ok(request) => request,
            Err(err) => {
                sink.alert(&err.to_string());
                return Err(err);
            }
        };

        sink.set_status(&StatusText::InProgress);
        let status = match self.post(&request).await {
            Ok(status) => status,
            Err(err) => {
                warn!(error = %err, "call request failed");
                StatusText::Failed(err.to_string())
            }
        };
        sink.set_status(&status);
        Ok(status)
    }

    /// Posts `request` and interprets whatever JSON comes back, regardless of HTTP status.
    pub async fn post(&self, request: &CallRequest) -> Result<StatusText, CallClientError> {
        let url = format!("{}/initiate_call", self.server_url);
        debug!(%url, "posting call request");
        let response = self.http.post(&url).json(request).send().await?;
        let http_status = response.status();
        let body = response.bytes().await?;
        let status = interpret_response(&serde_json::from_slice(&body)?);
        info!(%http_status, %status, "call request answered");
        Ok(status)
    }
}

/// Error text for a `null` reply body, which has no fields to read.
pub const NULL_REPLY: &str = "TypeError: Cannot read properties of null (reading 'error')";

/// Maps a reply body to a status line: a truthy `error` wins, anything else counts as
/// an initiated call. A `null` body fails outright; other non-object bodies simply
/// have no fields.
pub fn interpret_response(body: &Value) -> StatusText {
    if body.is_null() {
        return StatusText::Failed(NULL_REPLY.to_string());
    }
    match body.get("error").filter(|v| is_truthy(v)) {
        Some(error) => StatusText::Failed(display_value(error)),
        None => StatusText::Initiated {
            call_sid: body.get("call_sid").map(display_value),
        },
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// String coercion as the page applies it when building the status text.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(_) => "[object Object]".to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => display_value(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/client_tests.rs"]
mod tests;
