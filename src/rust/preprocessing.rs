use std::fmt;

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::config::ConfigError;

lazy_static! {
    /// Anything that is not a word character (letters, marks, digits in any
    /// script), whitespace or basic punctuation.
    static ref DISALLOWED_CHARS: Regex = Regex::new(r#"[^\w\s.,!?;:'"%\-]"#).unwrap();
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Text cannot be empty")]
    Empty,
    #[error("Text too short. Minimum {min} characters required, got {actual}")]
    TooShort { min: usize, actual: usize },
    #[error("Text too long. Maximum {max} characters allowed, got {actual}")]
    TooLong { max: usize, actual: usize },
    #[error(
        "Text does not look like natural language: {:.0}% letters, minimum {:.0}%",
        .ratio * 100.0,
        .min_ratio * 100.0
    )]
    NotLinguistic { ratio: f64, min_ratio: f64 },
}

/// Thresholds applied to cleaned text before it may reach the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationLimits {
    /// Minimum length in characters (Unicode scalar values).
    pub min_chars: usize,
    pub max_chars: usize,
    /// Minimum share of letters among the non-whitespace characters.
    pub min_letter_ratio: f64,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            min_chars: 10,
            max_chars: 10_000,
            min_letter_ratio: 0.5,
        }
    }
}

impl ValidationLimits {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_chars == 0 {
            return Err(ConfigError::InvalidLimits("minimum length must be at least 1".into()));
        }
        if self.max_chars < self.min_chars {
            return Err(ConfigError::InvalidLimits(format!(
                "maximum length {} is below minimum length {}",
                self.max_chars, self.min_chars
            )));
        }
        if !(0.0..=1.0).contains(&self.min_letter_ratio) {
            return Err(ConfigError::InvalidLimits(format!(
                "letter ratio {} is outside 0.0..=1.0",
                self.min_letter_ratio
            )));
        }
        Ok(())
    }
}

/// Normalized text that has passed validation.
///
/// The only way to obtain one is [`TextPreprocessor::clean_and_validate`], so
/// holding a `CleanedText` is proof the limits were met.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedText(String);

impl CleanedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

impl AsRef<str> for CleanedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CleanedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lexical statistics of the input, for diagnostics only. They never
/// influence the verdict.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TextFeatures {
    pub char_count: usize,
    pub word_count: usize,
    pub exclamation_count: usize,
    pub question_count: usize,
    pub uppercase_ratio: f64,
    pub letter_ratio: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TextPreprocessor {
    limits: ValidationLimits,
}

impl TextPreprocessor {
    pub fn new(limits: ValidationLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ValidationLimits {
        &self.limits
    }

    /// Normalizes `raw` and checks it against the configured limits.
    ///
    /// Checks run in this order: empty, letter ratio, minimum length,
    /// maximum length. The first failing check is reported.
    pub fn clean_and_validate(&self, raw: &str) -> Result<CleanedText, ValidationError> {
        if raw.trim().is_empty() {
            return Err(ValidationError::Empty);
        }

        let cleaned = Self::clean(raw);
        if cleaned.is_empty() {
            return Err(ValidationError::Empty);
        }

        let ratio = letter_ratio(&cleaned);
        if ratio < self.limits.min_letter_ratio {
            return Err(ValidationError::NotLinguistic {
                ratio,
                min_ratio: self.limits.min_letter_ratio,
            });
        }

        let length = cleaned.chars().count();
        if length < self.limits.min_chars {
            return Err(ValidationError::TooShort {
                min: self.limits.min_chars,
                actual: length,
            });
        }
        if length > self.limits.max_chars {
            return Err(ValidationError::TooLong {
                max: self.limits.max_chars,
                actual: length,
            });
        }

        debug!("Input validation passed ({} chars, letter ratio {:.2})", length, ratio);
        Ok(CleanedText(cleaned))
    }

    /// NFKC-normalizes the text, drops symbols outside the allowed set,
    /// squeezes repeated punctuation and collapses whitespace.
    pub fn clean(raw: &str) -> String {
        let normalized: String = raw.nfkc().collect();
        let stripped = DISALLOWED_CHARS.replace_all(&normalized, "");
        let squeezed = squeeze_punctuation(&stripped);
        WHITESPACE_RUN.replace_all(&squeezed, " ").trim().to_string()
    }

    pub fn extract_features(text: &CleanedText) -> TextFeatures {
        let text = text.as_str();
        let char_count = text.chars().count();
        let uppercase = text.chars().filter(|c| c.is_uppercase()).count();

        let features = TextFeatures {
            char_count,
            word_count: text.split_whitespace().count(),
            exclamation_count: text.matches('!').count(),
            question_count: text.matches('?').count(),
            uppercase_ratio: if char_count == 0 {
                0.0
            } else {
                uppercase as f64 / char_count as f64
            },
            letter_ratio: letter_ratio(text),
        };
        debug!("Extracted features: {:?}", features);
        features
    }
}

/// Share of alphabetic characters among the non-whitespace ones. Uses the
/// Unicode `Alphabetic` property, so Cyrillic, Devanagari or CJK text counts
/// as letters just like Latin.
pub fn letter_ratio(text: &str) -> f64 {
    let (letters, total) = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .fold((0usize, 0usize), |(letters, total), c| {
            (letters + usize::from(c.is_alphabetic()), total + 1)
        });
    if total == 0 {
        0.0
    } else {
        letters as f64 / total as f64
    }
}

// `regex` has no backreferences, so runs like "!!!" are squeezed by hand.
fn squeeze_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous: Option<char> = None;
    for c in text.chars() {
        if matches!(c, '.' | ',' | '!' | '?' | ';' | ':') && previous == Some(c) {
            continue;
        }
        out.push(c);
        previous = Some(c);
    }
    out
}
