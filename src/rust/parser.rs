//! Recovery of a typed [`Verdict`] from free-form model output.
//!
//! Parsing never fails. The rules, in order of precedence:
//!
//! 1. **Label.** A labeled line (`Classification:`, `Verdict:`, `Label:`,
//!    `Answer:`, `Prediction:` or `Result:`) followed by a REAL or FAKE
//!    synonym wins; a `not` before the synonym flips it. Otherwise the whole
//!    reply is scanned for the strong keywords `real`/`authentic`/`genuine`
//!    and `fake`/`fabricated`/`hoax`, where a negated keyword (`not real`,
//!    `isn't fake`) counts for the other side. If exactly one side occurs it
//!    wins. Otherwise the label is [`FALLBACK_LABEL`] (FAKE): a reply without
//!    a clear signal is treated as suspicious.
//! 2. **Confidence.** A number after `Confidence:` first, then the first
//!    percentage anywhere in the reply. Fractions written as `0.85` without a
//!    percent sign are read as 85. The value is rounded and clamped to
//!    `0..=100`; without a match it is [`DEFAULT_CONFIDENCE`]. A fallback
//!    label caps the confidence at [`FALLBACK_CONFIDENCE_CAP`].
//! 3. **Reasoning.** Text after `Reasoning:`/`Explanation:`/`Justification:`/
//!    `Rationale:`; otherwise the reply with its verdict and confidence tokens
//!    cut out; if nothing is left, [`NO_RATIONALE`].

use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;

use crate::model_client::ModelReply;
use crate::verdict::{Label, LabelSource, Verdict};

pub const FALLBACK_LABEL: Label = Label::Fake;
pub const DEFAULT_CONFIDENCE: u8 = 50;
pub const FALLBACK_CONFIDENCE_CAP: u8 = 40;
pub const NO_RATIONALE: &str = "The model did not provide an explicit rationale.";

lazy_static! {
    static ref LABELED_VERDICT: Regex = Regex::new(concat!(
        r"(?i)\b(?:classification|verdict|label|answer|prediction|result)\b",
        r#"[\s*_]*(?::|-|=|is\b)[\s*_\["'`]*"#,
        r"(?:(?:most\s+likely|likely|probably|mostly)\s+)?(not\s+)?",
        r"(real|fake|authentic|genuine|legitimate|true|",
        r"fabricated|false|hoax|misinformation|misleading)\b",
    ))
    .unwrap();
    static ref REAL_KEYWORD: Regex = Regex::new(r"(?i)\b(?:real|authentic|genuine)\b").unwrap();
    static ref FAKE_KEYWORD: Regex = Regex::new(r"(?i)\b(?:fake|fabricated|hoax)\b").unwrap();
    static ref NEGATED_KEYWORD: Regex = Regex::new(concat!(
        r"(?i)(?:\bnot|\bnever|n['’]t)\s+(?:(?:a|an|really|entirely|truly)\s+)?",
        r"(real|authentic|genuine|fake|fabricated|hoax)\b",
    ))
    .unwrap();
    static ref LABELED_CONFIDENCE: Regex = Regex::new(concat!(
        r"(?i)\bconfidence(?:\s+(?:level|score))?\b[\s*_]*(?::|-|=|\bof\b|\bis\b)?",
        r"[\s*_]*(\d+(?:\.\d+)?)\s*(%|percent\b)?",
    ))
    .unwrap();
    static ref PERCENTAGE: Regex = Regex::new(r"(\d+(?:\.\d+)?)\s*(%|percent\b)").unwrap();
    static ref LABELED_REASONING: Regex = Regex::new(
        r"(?is)\b(?:reasoning|explanation|justification|rationale)\b[\s*_]*[:\-][\s*_]*(.*)"
    )
    .unwrap();
}

/// Turns model replies into verdicts. See the module docs for the rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser;

impl ResponseParser {
    pub fn parse(reply: &ModelReply) -> Verdict {
        Self::parse_text(&reply.text)
    }

    pub fn parse_text(text: &str) -> Verdict {
        let (label, source) = match extract_label(text) {
            Some(found) => found,
            None => {
                warn!("No clear verdict in model reply, defaulting to {}", FALLBACK_LABEL);
                (FALLBACK_LABEL, LabelSource::Fallback)
            }
        };

        let mut confidence = extract_confidence(text).unwrap_or_else(|| {
            debug!("No confidence value in model reply, using {}", DEFAULT_CONFIDENCE);
            DEFAULT_CONFIDENCE
        });
        if source == LabelSource::Fallback {
            confidence = confidence.min(FALLBACK_CONFIDENCE_CAP);
        }

        let reasoning = extract_reasoning(text);

        info!("Parsed classification: {} ({}%)", label, confidence);
        Verdict {
            label,
            confidence,
            reasoning,
            source,
        }
    }
}

fn label_from_token(token: &str) -> Label {
    match token.to_lowercase().as_str() {
        "real" | "authentic" | "genuine" | "legitimate" | "true" => Label::Real,
        _ => Label::Fake,
    }
}

fn extract_label(text: &str) -> Option<(Label, LabelSource)> {
    if let Some(caps) = LABELED_VERDICT.captures(text) {
        let label = label_from_token(&caps[2]);
        let label = if caps.get(1).is_some() { label.opposite() } else { label };
        return Some((label, LabelSource::Labeled));
    }
    match keyword_votes(text) {
        (true, false) => Some((Label::Real, LabelSource::Keyword)),
        (false, true) => Some((Label::Fake, LabelSource::Keyword)),
        _ => None,
    }
}

/// Which sides the unlabeled keywords speak for, as `(real, fake)`.
fn keyword_votes(text: &str) -> (bool, bool) {
    let mut real = false;
    let mut fake = false;
    for caps in NEGATED_KEYWORD.captures_iter(text) {
        match label_from_token(&caps[1]) {
            Label::Real => fake = true,
            Label::Fake => real = true,
        }
    }
    let rest = NEGATED_KEYWORD.replace_all(text, " ");
    real |= REAL_KEYWORD.is_match(&rest);
    fake |= FAKE_KEYWORD.is_match(&rest);
    (real, fake)
}

fn extract_confidence(text: &str) -> Option<u8> {
    if let Some(caps) = LABELED_CONFIDENCE.captures(text) {
        let has_percent = caps.get(2).is_some();
        return to_percentage(&caps[1], has_percent);
    }
    PERCENTAGE
        .captures(text)
        .and_then(|caps| to_percentage(&caps[1], true))
}

fn to_percentage(number: &str, has_percent: bool) -> Option<u8> {
    let mut value: f64 = number.parse().ok()?;
    if !has_percent && number.contains('.') && value <= 1.0 {
        value *= 100.0;
    }
    Some(value.round().clamp(0.0, 100.0) as u8)
}

fn extract_reasoning(text: &str) -> String {
    if let Some(caps) = LABELED_REASONING.captures(text) {
        let reasoning = trim_markup(&caps[1]);
        if !reasoning.is_empty() {
            return reasoning;
        }
    }

    let without_verdict = LABELED_VERDICT.replace_all(text, "");
    let without_confidence = LABELED_CONFIDENCE.replace_all(&without_verdict, "");
    let remainder = without_confidence
        .lines()
        .map(|line| line.trim_start_matches(is_separator).trim_end())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let remainder = trim_markup(&remainder);
    if remainder.is_empty() {
        NO_RATIONALE.to_string()
    } else {
        remainder
    }
}

// Punctuation left dangling once the verdict and confidence tokens are cut.
fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '.' | ',' | ';' | ':' | '-' | '|' | '*' | '_')
}

fn trim_markup(text: &str) -> String {
    text.trim()
        .trim_matches(|c: char| c == '*' || c == '_' || c.is_whitespace())
        .to_string()
}
