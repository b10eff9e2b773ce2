//! Function-call dispatch to the external handler endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::core::realtime::FunctionCallRecord;

/// Errors from a single function-call dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request could not be sent or the body could not be read
    #[error("Function handler request failed: {0}")]
    Request(String),

    /// The handler answered with a non-success status
    #[error("Function handler returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The handler did not answer in time
    #[error("Function handler timed out after {0:?}")]
    Timeout(Duration),
}

/// Resolves a function call to the output sent back upstream.
#[async_trait]
pub trait FunctionCallHandler: Send + Sync {
    async fn handle(&self, call: &FunctionCallRecord) -> Result<Value, DispatchError>;
}

/// Posts the full function-call event to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpFunctionCallHandler {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpFunctionCallHandler {
    pub fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }

    /// Get URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FunctionCallHandler for HttpFunctionCallHandler {
    async fn handle(&self, call: &FunctionCallRecord) -> Result<Value, DispatchError> {
        debug!(url = %self.url, call_id = ?call.id(), "Dispatching function call");

        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(call.payload())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DispatchError::Timeout(self.timeout)
                } else {
                    DispatchError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                DispatchError::Timeout(self.timeout)
            } else {
                DispatchError::Request(e.to_string())
            }
        })?;

        if !status.is_success() {
            return Err(DispatchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Non-JSON bodies are passed along as a string
        let body = serde_json::from_str(&body).unwrap_or(Value::String(body));
        Ok(extract_output(body))
    }
}

/// Pick the function output out of a handler response body.
///
/// The body's `response` field wins when it holds a meaningful value
/// (anything but null, false, zero or an empty string); otherwise the whole
/// body is the output.
pub fn extract_output(body: Value) -> Value {
    match body {
        Value::Object(mut map) => match map.remove("response") {
            Some(response) if is_meaningful(&response) => response,
            Some(response) => {
                map.insert("response".to_string(), response);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

fn is_meaningful(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_output_prefers_response_field() {
        assert_eq!(
            extract_output(json!({"response": "It is sunny", "status": "ok"})),
            json!("It is sunny")
        );
        assert_eq!(
            extract_output(json!({"response": {"temp": 21}})),
            json!({"temp": 21})
        );
    }

    #[test]
    fn test_extract_output_falls_back_to_body() {
        assert_eq!(
            extract_output(json!({"result": 42})),
            json!({"result": 42})
        );
        assert_eq!(
            extract_output(json!({"response": "", "note": "empty"})),
            json!({"response": "", "note": "empty"})
        );
        assert_eq!(
            extract_output(json!({"response": null})),
            json!({"response": null})
        );
        assert_eq!(extract_output(json!("plain text")), json!("plain text"));
        assert_eq!(extract_output(json!([1, 2])), json!([1, 2]));
    }

    #[test]
    fn test_http_handler_builder() {
        let handler = HttpFunctionCallHandler::new(
            reqwest::Client::new(),
            "https://hooks.example.com/ai",
            Duration::from_secs(3),
        );
        assert_eq!(handler.url(), "https://hooks.example.com/ai");
    }
}
