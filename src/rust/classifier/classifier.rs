use std::fmt;
use std::time::Instant;

use log::{debug, error, info};
use serde::Serialize;

use super::builder::ClassifierBuilder;
use super::error::ClassificationError;
use crate::model_client::{LanguageModel, ModelClient};
use crate::parser::ResponseParser;
use crate::preprocessing::{TextFeatures, TextPreprocessor};
use crate::prompt::build_prompt;
use crate::verdict::Verdict;

/// Steps of a single classification. A failure in any step is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Prompting,
    Requesting,
    Parsing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::Prompting => "prompting",
            Stage::Requesting => "requesting",
            Stage::Parsing => "parsing",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// A verdict plus the diagnostics gathered while producing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub verdict: Verdict,
    pub features: TextFeatures,
    pub model: String,
    pub eval_count: u64,
    pub elapsed_ms: u64,
}

/// Classifies news text as REAL or FAKE by asking a language model.
///
/// The classifier holds no per-call state, so one instance can serve any
/// number of concurrent callers behind a shared reference or an `Arc`.
///
/// ```no_run
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// use newscheck::{Classifier, ClassifierConfig};
///
/// let classifier = Classifier::builder()
///     .with_config(ClassifierConfig::from_env()?)
///     .build()?;
///
/// let verdict = classifier
///     .classify("Scientists confirm the city water supply meets all safety standards")
///     .await?;
/// println!("{} ({}%): {}", verdict.label, verdict.confidence, verdict.reasoning);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Classifier<M = ModelClient> {
    preprocessor: TextPreprocessor,
    model: M,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<Classifier>();
    }
};

impl Classifier {
    /// Creates a ClassifierBuilder for fluent construction
    pub fn builder() -> ClassifierBuilder {
        ClassifierBuilder::new()
    }
}

impl<M: LanguageModel + Sync> Classifier<M> {
    pub(crate) fn from_parts(preprocessor: TextPreprocessor, model: M) -> Self {
        info!("Classifier initialized with model: {}", model.model_name());
        Self { preprocessor, model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn preprocessor(&self) -> &TextPreprocessor {
        &self.preprocessor
    }

    /// Classifies `raw` and returns the parsed verdict.
    ///
    /// # Errors
    /// A [`ClassificationError`] of kind `Validation` when the text is
    /// rejected, or of the matching network kind when the model endpoint
    /// cannot produce a reply.
    pub async fn classify(&self, raw: &str) -> Result<Verdict, ClassificationError> {
        self.classify_detailed(raw).await.map(|report| report.verdict)
    }

    /// Same as [`Classifier::classify`], but also returns lexical features
    /// and reply metadata.
    pub async fn classify_detailed(
        &self,
        raw: &str,
    ) -> Result<ClassificationReport, ClassificationError> {
        let started = Instant::now();
        info!("Starting classification process");

        let mut stage = Stage::Validating;
        let result = self.run(raw, &mut stage, started).await;
        result.map_err(|err| {
            error!("Classification failed while {}: {}", stage, err);
            err
        })
    }

    async fn run(
        &self,
        raw: &str,
        stage: &mut Stage,
        started: Instant,
    ) -> Result<ClassificationReport, ClassificationError> {
        debug!("Stage: {}", stage);
        let cleaned = self.preprocessor.clean_and_validate(raw)?;
        let features = TextPreprocessor::extract_features(&cleaned);

        *stage = Stage::Prompting;
        debug!("Stage: {}", stage);
        let prompt = build_prompt(&cleaned);
        drop(cleaned);

        *stage = Stage::Requesting;
        debug!("Stage: {} ({} byte prompt)", stage, prompt.len());
        let reply = self.model.complete(&prompt).await?;

        *stage = Stage::Parsing;
        debug!("Stage: {}", stage);
        let verdict = ResponseParser::parse(&reply);

        *stage = Stage::Done;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!("Classification completed successfully in {} ms: {}", elapsed_ms, verdict);
        Ok(ClassificationReport {
            verdict,
            features,
            model: reply.model,
            eval_count: reply.eval_count,
            elapsed_ms,
        })
    }
}
