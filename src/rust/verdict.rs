use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    Real,
    Fake,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Real => "REAL",
            Label::Fake => "FAKE",
        }
    }

    pub fn opposite(self) -> Label {
        match self {
            Label::Real => Label::Fake,
            Label::Fake => Label::Real,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the label was recovered from the model's reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    /// A labeled line such as `CLASSIFICATION: FAKE`.
    Labeled,
    /// An unambiguous keyword elsewhere in the reply.
    Keyword,
    /// No usable signal; the documented default was applied.
    Fallback,
}

/// Final outcome of a classification. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub label: Label,
    /// Always within `0..=100`.
    pub confidence: u8,
    pub reasoning: String,
    pub source: LabelSource,
}

impl Verdict {
    pub fn is_fake(&self) -> bool {
        self.label == Label::Fake
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}% confidence)", self.label, self.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_opposite() {
        assert_eq!(Label::Real.opposite(), Label::Fake);
        assert_eq!(Label::Fake.opposite(), Label::Real);
    }

    #[test]
    fn test_verdict_display() {
        let verdict = Verdict {
            label: Label::Fake,
            confidence: 87,
            reasoning: "Unsourced claim.".into(),
            source: LabelSource::Labeled,
        };
        assert_eq!(verdict.to_string(), "FAKE (87% confidence)");
        assert!(verdict.is_fake());
    }
}
