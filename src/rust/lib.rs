//! Classifies news text as REAL or FAKE by delegating the judgement to a
//! locally hosted large language model served through the Ollama API.
//!
//! A classification runs four steps in order, stopping at the first failure:
//! the input is cleaned and validated ([`TextPreprocessor`]), rendered into a
//! fact-checking prompt ([`build_prompt`]), sent to the model with bounded
//! retries ([`ModelClient`]), and the free-form reply is parsed into a typed
//! [`Verdict`] ([`ResponseParser`]).
//!
//! # Basic Usage
//!
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use newscheck::{Classifier, ClassifierConfig};
//!
//! let classifier = Classifier::builder()
//!     .with_config(ClassifierConfig::default().with_model("llama3:8b"))
//!     .build()?;
//!
//! let verdict = classifier
//!     .classify("NASA confirms the Perseverance rover landed in Jezero crater")
//!     .await?;
//! println!("{}: {}", verdict, verdict.reasoning);
//! # Ok(())
//! # }
//! ```
//!
//! # Offline Usage
//!
//! Anything implementing [`LanguageModel`] can stand in for the HTTP client:
//!
//! ```
//! use newscheck::{Classifier, LanguageModel, ModelError, ModelReply, Prompt, Label};
//!
//! struct Scripted;
//!
//! impl LanguageModel for Scripted {
//!     async fn complete(&self, _prompt: &Prompt) -> Result<ModelReply, ModelError> {
//!         Ok(ModelReply::new("CLASSIFICATION: REAL\nCONFIDENCE: 91%", "scripted"))
//!     }
//!
//!     fn model_name(&self) -> &str {
//!         "scripted"
//!     }
//! }
//!
//! let classifier = Classifier::builder().build_with_model(Scripted).unwrap();
//! let verdict = tokio_test::block_on(
//!     classifier.classify("The city council approved the new library budget"),
//! ).unwrap();
//! assert_eq!(verdict.label, Label::Real);
//! assert_eq!(verdict.confidence, 91);
//! ```

pub mod classifier;
pub mod config;
pub mod model_client;
pub mod parser;
pub mod preprocessing;
pub mod prompt;
pub mod retry;
pub mod transport;
pub mod verdict;

pub use classifier::{
    ClassificationError, ClassificationReport, Classifier, ClassifierBuilder, ErrorCause, ErrorKind,
    Stage,
};
pub use config::{ClassifierConfig, ConfigError};
pub use model_client::{LanguageModel, ModelClient, ModelError, ModelReply};
pub use parser::ResponseParser;
pub use preprocessing::{
    CleanedText, TextFeatures, TextPreprocessor, ValidationError, ValidationLimits,
};
pub use prompt::{build_prompt, Prompt, EVALUATION_CRITERIA};
pub use retry::{Backoff, RetryPolicy};
pub use transport::{HttpTransport, Transport};
pub use verdict::{Label, LabelSource, Verdict};

/// Initializes `env_logger`, using `default_level` unless `RUST_LOG` is set.
pub fn init_logger(default_level: &str) {
    let env = env_logger::Env::default().default_filter_or(default_level);
    let _ = env_logger::Builder::from_env(env).try_init();
}
