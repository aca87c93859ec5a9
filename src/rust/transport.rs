use std::future::Future;
use std::time::Duration;

use log::debug;
use reqwest::{Client, StatusCode};

use crate::config::ClassifierConfig;
use crate::model_client::ModelError;

/// A single HTTP exchange with the model-serving endpoint.
///
/// Implementations make exactly one attempt per call; retrying is the job of
/// [`crate::RetryPolicy`]. A non-success status must be reported as
/// [`ModelError::Server`], and the successful response body is returned raw.
pub trait Transport {
    fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> impl Future<Output = Result<Vec<u8>, ModelError>> + Send;

    fn get(&self, path: &str) -> impl Future<Output = Result<Vec<u8>, ModelError>> + Send;
}

/// `reqwest`-backed transport with a bounded per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| ModelError::Connection {
                endpoint: config.base_url.clone(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            timeout: config.request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn map_error(&self, err: reqwest::Error) -> ModelError {
        if err.is_timeout() {
            ModelError::Timeout { timeout: self.timeout }
        } else if err.is_decode() {
            ModelError::MalformedResponse(err.to_string())
        } else {
            ModelError::Connection {
                endpoint: self.base_url.clone(),
                reason: err.to_string(),
            }
        }
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<Vec<u8>, ModelError> {
        let status = response.status();
        debug!("Response status: {}", status);
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Server {
                status: status.as_u16(),
                message: server_message(status, &body),
            });
        }
        let bytes = response.bytes().await.map_err(|e| self.map_error(e))?;
        debug!("Received {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}

impl Transport for HttpTransport {
    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<Vec<u8>, ModelError> {
        let url = self.url(path);
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;
        self.read_body(response).await
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, ModelError> {
        let url = self.url(path);
        debug!("GET {}", url);
        let response = self.client.get(&url).send().await.map_err(|e| self.map_error(e))?;
        self.read_body(response).await
    }
}

/// Prefers the `{"error": "..."}` message Ollama sends with failures, then
/// the raw body, then the status reason.
fn server_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string));
    match from_json {
        Some(message) => message,
        None if !body.trim().is_empty() => body.trim().chars().take(200).collect(),
        None => status.canonical_reason().unwrap_or("unknown status").to_string(),
    }
}
