use std::env;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;

/// Path of the completion endpoint, relative to the configured base URL.
pub const GENERATE_PATH: &str = "/api/generate";
/// Path listing the models installed on the serving endpoint.
pub const TAGS_PATH: &str = "/api/tags";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Base URL must be set")]
    MissingBaseUrl,
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("Model identifier must be set")]
    MissingModel,
    #[error("Request timeout must be greater than zero")]
    ZeroTimeout,
    #[error("At least one request attempt is required")]
    ZeroAttempts,
    #[error("Temperature must be between 0.0 and 2.0, got {0}")]
    InvalidTemperature(f32),
    #[error("Invalid validation limits: {0}")]
    InvalidLimits(String),
    #[error("Invalid value '{value}' for {var}")]
    InvalidEnvValue { var: &'static str, value: String },
}

/// Process-wide settings for talking to the model-serving endpoint.
///
/// Built once at start-up and shared by reference; nothing in the crate
/// mutates a config after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    pub base_url: String,
    pub model: String,
    pub request_timeout: Duration,
    /// Total number of attempts per classification, including the first one.
    pub max_retries: u32,
    pub temperature: f32,
    pub max_tokens: u32,
    pub log_level: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3:8b".to_string(),
            request_timeout: Duration::from_secs(120),
            max_retries: 3,
            temperature: 0.1,
            max_tokens: 500,
            log_level: "info".to_string(),
        }
    }
}

impl ClassifierConfig {
    /// Reads the configuration from the environment, falling back to the
    /// defaults for unset variables.
    ///
    /// Recognised variables: `OLLAMA_BASE_URL`, `OLLAMA_MODEL`,
    /// `REQUEST_TIMEOUT` (seconds), `MAX_RETRIES`, `TEMPERATURE`,
    /// `MAX_TOKENS` and `LOG_LEVEL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            base_url: env::var("OLLAMA_BASE_URL").unwrap_or(defaults.base_url),
            model: env::var("OLLAMA_MODEL").unwrap_or(defaults.model),
            request_timeout: env_parse::<u64>("REQUEST_TIMEOUT")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_retries: env_parse("MAX_RETRIES")?.unwrap_or(defaults.max_retries),
            temperature: env_parse("TEMPERATURE")?.unwrap_or(defaults.temperature),
            max_tokens: env_parse("MAX_TOKENS")?.unwrap_or(defaults.max_tokens),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Checks the invariants every downstream component relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parsed_base_url()?;
        if self.model.trim().is_empty() {
            return Err(ConfigError::MissingModel);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_retries == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }
        log::info!("Configuration validated successfully");
        log::info!("Using model: {}", self.model);
        log::info!("Model endpoint: {}", self.endpoint_url(GENERATE_PATH));
        Ok(())
    }

    pub fn parsed_base_url(&self) -> Result<Url, ConfigError> {
        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        let url = Url::parse(trimmed).map_err(|e| ConfigError::InvalidBaseUrl {
            url: trimmed.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: trimmed.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        Ok(url)
    }

    /// Joins `path` onto the base URL without doubling the slash.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim().trim_end_matches('/'), path)
    }
}

fn env_parse<T: FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvValue { var, value }),
        Err(_) => Ok(None),
    }
}
