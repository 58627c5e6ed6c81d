use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// What the client keeps of a failed call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub message: String,
    pub code: String,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
        }
    }
}

/// One request to the school_desk API. Any 2xx body is returned as-is;
/// everything else becomes an `ErrorInfo`.
#[async_trait]
pub trait Api: Send + Sync {
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ErrorInfo>;
}

pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Api for HttpApi {
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ErrorInfo> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "api call");

        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        if status.is_success() {
            Ok(body)
        } else {
            Err(status_error(status, &body))
        }
    }
}

fn status_error(status: StatusCode, body: &Value) -> ErrorInfo {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| status.canonical_reason())
        .unwrap_or("Request failed");
    let code = if status.is_server_error() {
        "ERR_BAD_RESPONSE"
    } else if status.is_client_error() {
        "ERR_BAD_REQUEST"
    } else {
        "UNKNOWN_ERROR"
    };
    ErrorInfo::new(message, code)
}

fn transport_error(err: reqwest::Error) -> ErrorInfo {
    let code = if err.is_timeout() {
        "ECONNABORTED"
    } else if err.is_connect() || err.is_request() {
        "ERR_NETWORK"
    } else {
        "UNKNOWN_ERROR"
    };
    ErrorInfo::new(err.to_string(), code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_error_codes() {
        let err = status_error(StatusCode::NOT_FOUND, &json!({"message": "No teacher found"}));
        assert_eq!(err, ErrorInfo::new("No teacher found", "ERR_BAD_REQUEST"));

        let err = status_error(StatusCode::INTERNAL_SERVER_ERROR, &Value::Null);
        assert_eq!(err.code, "ERR_BAD_RESPONSE");
        assert_eq!(err.message, "Internal Server Error");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_network_error() {
        let api = HttpApi::new("http://127.0.0.1:9/");
        let err = api.send(Method::GET, "/health", None).await.unwrap_err();
        assert_eq!(err.code, "ERR_NETWORK");
    }
}
