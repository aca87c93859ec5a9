use log::info;

use super::classifier::Classifier;
use super::error::ClassificationError;
use crate::config::ClassifierConfig;
use crate::model_client::{LanguageModel, ModelClient};
use crate::preprocessing::{TextPreprocessor, ValidationLimits};
use crate::retry::RetryPolicy;
use crate::transport::{HttpTransport, Transport};

/// A builder for constructing a Classifier with a fluent interface.
#[derive(Debug, Clone, Default)]
pub struct ClassifierBuilder {
    config: ClassifierConfig,
    limits: ValidationLimits,
    retry: Option<RetryPolicy>,
}

impl ClassifierBuilder {
    /// Creates a builder with the default configuration and limits
    ///
    /// # Example
    /// ```
    /// use newscheck::ClassifierBuilder;
    ///
    /// let builder = ClassifierBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the endpoint, model and request settings
    ///
    /// # Example
    /// ```
    /// use newscheck::{ClassifierBuilder, ClassifierConfig};
    ///
    /// let builder = ClassifierBuilder::new()
    ///     .with_config(ClassifierConfig::default().with_model("mistral:7b"));
    /// ```
    pub fn with_config(mut self, config: ClassifierConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the input validation thresholds
    pub fn with_limits(mut self, limits: ValidationLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Overrides the retry policy derived from `max_retries`
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Builds a classifier that talks HTTP to the configured endpoint
    ///
    /// # Errors
    /// A `Configuration` error when the config or limits are invalid, or a
    /// `Connection` error when the HTTP client cannot be created.
    pub fn build(self) -> Result<Classifier<ModelClient<HttpTransport>>, ClassificationError> {
        self.config.validate()?;
        let client = ModelClient::new(&self.config)?;
        self.build_with_client(client)
    }

    /// Builds a classifier whose model client uses a custom transport
    pub fn build_with_transport<T: Transport + Sync>(
        self,
        transport: T,
    ) -> Result<Classifier<ModelClient<T>>, ClassificationError> {
        self.config.validate()?;
        let client = ModelClient::with_transport(&self.config, transport);
        self.build_with_client(client)
    }

    /// Builds a classifier around any [`LanguageModel`]. The endpoint
    /// settings of the config are not used.
    pub fn build_with_model<M: LanguageModel + Sync>(
        self,
        model: M,
    ) -> Result<Classifier<M>, ClassificationError> {
        self.limits.validate()?;
        Ok(Classifier::from_parts(TextPreprocessor::new(self.limits), model))
    }

    fn build_with_client<T: Transport + Sync>(
        self,
        client: ModelClient<T>,
    ) -> Result<Classifier<ModelClient<T>>, ClassificationError> {
        let client = match self.retry {
            Some(ref retry) => client.with_retry_policy(retry.clone()),
            None => client,
        };
        info!(
            "Building classifier: {} attempts, {:?} timeout",
            client.retry_policy().max_attempts,
            self.config.request_timeout
        );
        self.build_with_model(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::time::Duration;

    #[test]
    fn test_build_with_default_config() {
        let classifier = ClassifierBuilder::new().build().unwrap();
        assert_eq!(classifier.model().retry_policy().max_attempts, 3);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = ClassifierBuilder::new()
            .with_config(ClassifierConfig::default().with_base_url("localhost"))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_invalid_limits_are_rejected() {
        let limits = ValidationLimits { min_letter_ratio: -0.1, ..Default::default() };
        let err = ClassifierBuilder::new().with_limits(limits).build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_retry_policy_override() {
        let retry = RetryPolicy::new(5, crate::Backoff::Fixed(Duration::from_millis(10)));
        let classifier = ClassifierBuilder::new().with_retry_policy(retry.clone()).build().unwrap();
        assert_eq!(classifier.model().retry_policy(), &retry);
    }
}
