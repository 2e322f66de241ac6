use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Accept/reject verdict on a proposed trade.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Accept,
    Reject,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Accept => "ACCEPT",
            Verdict::Reject => "REJECT",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACCEPT" => Ok(Verdict::Accept),
            "REJECT" => Ok(Verdict::Reject),
            other => Err(format!("unknown verdict: {other}")),
        }
    }
}

/// Human reviewer's answer to "was this a good trade?".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Yes,
    No,
    Skip,
}

impl Feedback {
    pub fn as_str(self) -> &'static str {
        match self {
            Feedback::Yes => "yes",
            Feedback::No => "no",
            Feedback::Skip => "skip",
        }
    }
}

/// Who produced a record's label.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LabelSource {
    /// A person answered the feedback prompt.
    #[default]
    Human,
    /// The label mirrors the model's own recommendation.
    Model,
}

impl LabelSource {
    pub fn as_str(self) -> &'static str {
        match self {
            LabelSource::Human => "human",
            LabelSource::Model => "model",
        }
    }
}

/// A labelled historical trade description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeRecord {
    pub timestamp: NaiveDateTime,
    pub text: String,
    /// 1 = reviewer accepted the trade, 0 otherwise.
    pub label: u8,
    /// Verdict the automated reviewer gave at the time, if recorded.
    pub ai_decision: Option<Verdict>,
    #[serde(default)]
    pub label_source: LabelSource,
}

impl TradeRecord {
    pub fn is_accepted(&self) -> bool {
        self.label == 1
    }
}

/// Map a probability of acceptance onto [0, 1]: 0.5 is no confidence, either
/// extreme is full confidence.
pub fn confidence_from_probability(probability: f64) -> f64 {
    (probability - 0.5).abs() * 2.0
}

/// Output of scoring a trade description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeEvaluation {
    /// Probability of acceptance. `None` when scoring fell back.
    pub probability: Option<f64>,
    pub recommendation: Verdict,
    pub confidence: f64,
}

impl TradeEvaluation {
    pub fn from_probability(probability: f64) -> Self {
        let recommendation = if probability > 0.5 {
            Verdict::Accept
        } else {
            Verdict::Reject
        };
        Self {
            probability: Some(probability),
            recommendation,
            confidence: confidence_from_probability(probability),
        }
    }

    /// Conservative result used when the model cannot be consulted.
    pub fn fallback() -> Self {
        Self {
            probability: None,
            recommendation: Verdict::Reject,
            confidence: 0.0,
        }
    }

    pub fn is_accept(&self) -> bool {
        self.recommendation == Verdict::Accept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_boundaries() {
        assert_eq!(confidence_from_probability(0.5), 0.0);
        assert_eq!(confidence_from_probability(1.0), 1.0);
        assert_eq!(confidence_from_probability(0.0), 1.0);
    }

    #[test]
    fn confidence_is_symmetric() {
        for p in [0.0, 0.1, 0.25, 0.37, 0.5, 0.62, 0.9, 1.0] {
            let diff = confidence_from_probability(p) - confidence_from_probability(1.0 - p);
            assert!(diff.abs() < 1e-12, "asymmetric at p={p}");
        }
    }

    #[test]
    fn half_probability_rejects() {
        let eval = TradeEvaluation::from_probability(0.5);
        assert_eq!(eval.recommendation, Verdict::Reject);
        assert_eq!(eval.confidence, 0.0);
    }

    #[test]
    fn above_half_accepts() {
        let eval = TradeEvaluation::from_probability(0.75);
        assert!(eval.is_accept());
        assert_eq!(eval.confidence, 0.5);
    }

    #[test]
    fn fallback_is_conservative() {
        let eval = TradeEvaluation::fallback();
        assert_eq!(eval.recommendation, Verdict::Reject);
        assert_eq!(eval.confidence, 0.0);
        assert!(eval.probability.is_none());
    }

    #[test]
    fn label_source_defaults_to_human() {
        let json = r#"{"timestamp":"2024-01-01T00:00:00","text":"t","label":1,"ai_decision":null}"#;
        let record: TradeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.label_source, LabelSource::Human);
        assert_eq!(
            serde_json::to_string(&LabelSource::Model).unwrap(),
            "\"model\""
        );
    }

    #[test]
    fn verdict_serialization() {
        assert_eq!(serde_json::to_string(&Verdict::Accept).unwrap(), "\"ACCEPT\"");
        assert_eq!("reject".parse::<Verdict>().unwrap(), Verdict::Reject);
    }
}
