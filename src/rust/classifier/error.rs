use std::fmt;

use serde::Serialize;

use crate::config::ConfigError;
use crate::model_client::ModelError;
use crate::preprocessing::ValidationError;

/// The category of a terminal classification failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input; the caller may resubmit corrected text.
    Validation,
    Timeout,
    Connection,
    /// The endpoint rejected the request.
    Server,
    MalformedResponse,
    Configuration,
}

impl ErrorKind {
    /// Whether the failure concerns reaching the model service.
    pub fn is_network(&self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::Connection)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Connection => "connection error",
            ErrorKind::Server => "server error",
            ErrorKind::MalformedResponse => "malformed response",
            ErrorKind::Configuration => "configuration error",
        };
        f.write_str(name)
    }
}

/// The upstream error a [`ClassificationError`] wraps.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErrorCause {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Terminal failure surfaced to the caller when no verdict can be produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ClassificationError {
    kind: ErrorKind,
    message: String,
    #[source]
    cause: ErrorCause,
}

impl ClassificationError {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> &ErrorCause {
        &self.cause
    }
}

impl From<ValidationError> for ClassificationError {
    fn from(err: ValidationError) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: format!("Invalid input: {}", err),
            cause: err.into(),
        }
    }
}

impl From<ModelError> for ClassificationError {
    fn from(err: ModelError) -> Self {
        let kind = match &err {
            ModelError::Timeout { .. } => ErrorKind::Timeout,
            ModelError::Connection { .. } => ErrorKind::Connection,
            ModelError::Server { .. } => ErrorKind::Server,
            ModelError::MalformedResponse(_) => ErrorKind::MalformedResponse,
        };
        Self {
            kind,
            message: err.to_string(),
            cause: err.into(),
        }
    }
}

impl From<ConfigError> for ClassificationError {
    fn from(err: ConfigError) -> Self {
        Self {
            kind: ErrorKind::Configuration,
            message: format!("Invalid configuration: {}", err),
            cause: err.into(),
        }
    }
}
