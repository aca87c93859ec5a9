use std::future::Future;
use std::time::Duration;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::config::{ClassifierConfig, GENERATE_PATH, TAGS_PATH};
use crate::prompt::Prompt;
use crate::retry::{Backoff, RetryPolicy};
use crate::transport::{HttpTransport, Transport};

const SERVICE_HINT: &str = "Please ensure the local model service is running (`ollama serve`)";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Request to the local model service timed out after {timeout:?}. {}", SERVICE_HINT)]
    Timeout { timeout: Duration },
    #[error("Cannot connect to the local model service at {endpoint}: {reason}. {}", SERVICE_HINT)]
    Connection { endpoint: String, reason: String },
    #[error("Model service returned HTTP {status}: {message}")]
    Server { status: u16, message: String },
    #[error("Model service returned an unusable payload: {0}")]
    MalformedResponse(String),
}

impl ModelError {
    /// Whether the failure may go away on a retry: timeouts, connection
    /// failures and overload statuses (429, 503).
    pub fn is_transient(&self) -> bool {
        match self {
            ModelError::Timeout { .. } | ModelError::Connection { .. } => true,
            ModelError::Server { status, .. } => matches!(status, 429 | 503),
            ModelError::MalformedResponse(_) => false,
        }
    }
}

/// The raw completion plus the metadata the endpoint reported with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReply {
    pub text: String,
    pub model: String,
    pub eval_count: u64,
    pub total_duration_ns: u64,
}

impl ModelReply {
    pub fn new(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
            eval_count: 0,
            total_duration_ns: 0,
        }
    }
}

/// Anything that can turn a prompt into a completion.
///
/// The orchestrator depends only on this, so it can run against a scripted
/// implementation in tests.
pub trait LanguageModel {
    fn complete(
        &self,
        prompt: &Prompt,
    ) -> impl Future<Output = Result<ModelReply, ModelError>> + Send;

    /// Identifier of the model answering the prompts.
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub num_predict: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    eval_count: Option<u64>,
    #[serde(default)]
    total_duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Client for the Ollama completion API with bounded retries.
#[derive(Debug, Clone)]
pub struct ModelClient<T = HttpTransport> {
    transport: T,
    model: String,
    options: GenerateOptions,
    retry: RetryPolicy,
}

impl ModelClient<HttpTransport> {
    /// Creates a client talking HTTP to `config.base_url`.
    pub fn new(config: &ClassifierConfig) -> Result<Self, ModelError> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport + Sync> ModelClient<T> {
    /// Creates a client over an arbitrary transport. The retry budget comes
    /// from `config.max_retries` with the default backoff.
    pub fn with_transport(config: &ClassifierConfig, transport: T) -> Self {
        info!("Initialized model client with model: {}", config.model);
        Self {
            transport,
            model: config.model.clone(),
            options: GenerateOptions {
                temperature: config.temperature,
                num_predict: config.max_tokens,
            },
            retry: RetryPolicy::default().with_max_attempts(config.max_retries),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.retry.backoff = backoff;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Body of `POST /api/generate`. Streaming is off so the whole
    /// completion arrives as one JSON object.
    fn request_body(&self, prompt: &Prompt) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "prompt": prompt.as_str(),
            "stream": false,
            "options": self.options,
        })
    }

    fn decode_reply(&self, body: &[u8]) -> Result<ModelReply, ModelError> {
        let payload: GenerateResponse = serde_json::from_slice(body).map_err(|e| {
            error!("Failed to decode completion payload: {}", e);
            ModelError::MalformedResponse(format!(
                "expected a JSON object with a string 'response' field ({})",
                e
            ))
        })?;
        Ok(ModelReply {
            text: payload.response,
            model: payload.model.unwrap_or_else(|| self.model.clone()),
            eval_count: payload.eval_count.unwrap_or(0),
            total_duration_ns: payload.total_duration.unwrap_or(0),
        })
    }

    /// Lists the models installed on the endpoint. Makes a single attempt.
    pub async fn check_health(&self) -> Result<Vec<String>, ModelError> {
        let body = self.transport.get(TAGS_PATH).await.map_err(|e| {
            error!("Model service health check failed: {}", e);
            e
        })?;
        let tags: TagsResponse = serde_json::from_slice(&body)
            .map_err(|e| ModelError::MalformedResponse(format!("invalid model list: {}", e)))?;
        info!("Model service is healthy ({} models installed)", tags.models.len());
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

impl<T: Transport + Sync> LanguageModel for ModelClient<T> {
    async fn complete(&self, prompt: &Prompt) -> Result<ModelReply, ModelError> {
        let body = self.request_body(prompt);
        info!("Sending request to model endpoint {}", GENERATE_PATH);
        debug!("Prompt length: {} characters", prompt.as_str().chars().count());

        let raw = self
            .retry
            .execute(|_| self.transport.post_json(GENERATE_PATH, &body))
            .await?;
        let reply = self.decode_reply(&raw)?;

        info!("Successfully received response from model");
        debug!("Response: {}...", reply.text.chars().take(100).collect::<String>());
        Ok(reply)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
