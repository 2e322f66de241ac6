use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const DECISION_SCHEMA_VERSION: u32 = 1;

/// Which specialist a decision comes from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    Trade,
    Draft,
    FreeAgency,
    Lineup,
}

impl DecisionType {
    pub const ALL: [DecisionType; 4] = [
        DecisionType::Trade,
        DecisionType::Draft,
        DecisionType::FreeAgency,
        DecisionType::Lineup,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DecisionType::Trade => "trade",
            DecisionType::Draft => "draft",
            DecisionType::FreeAgency => "free_agency",
            DecisionType::Lineup => "lineup",
        }
    }
}

impl fmt::Display for DecisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecisionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        DecisionType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown decision type: {s}"))
    }
}

/// Type-specific fields a specialist may add on top of the core decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionPayload {
    Trade {
        #[serde(default)]
        priority_targets: Vec<String>,
    },
    Draft {
        #[serde(default)]
        target_positions: Vec<String>,
    },
    FreeAgency {
        /// Position -> maximum offer, as the specialist phrased it.
        #[serde(default)]
        budget_allocation: BTreeMap<String, serde_json::Value>,
    },
    Lineup {
        #[serde(default)]
        starting_five: Vec<String>,
    },
}

impl DecisionPayload {
    pub fn empty(decision_type: DecisionType) -> Self {
        match decision_type {
            DecisionType::Trade => DecisionPayload::Trade {
                priority_targets: Vec::new(),
            },
            DecisionType::Draft => DecisionPayload::Draft {
                target_positions: Vec::new(),
            },
            DecisionType::FreeAgency => DecisionPayload::FreeAgency {
                budget_allocation: BTreeMap::new(),
            },
            DecisionType::Lineup => DecisionPayload::Lineup {
                starting_five: Vec::new(),
            },
        }
    }

    pub fn decision_type(&self) -> DecisionType {
        match self {
            DecisionPayload::Trade { .. } => DecisionType::Trade,
            DecisionPayload::Draft { .. } => DecisionType::Draft,
            DecisionPayload::FreeAgency { .. } => DecisionType::FreeAgency,
            DecisionPayload::Lineup { .. } => DecisionType::Lineup,
        }
    }
}

/// A page action the specialist asks the executor to perform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolCall {
    Click { selector: String },
    SelectOption { selector: String, value: String },
}

#[derive(Error, Debug, PartialEq)]
pub enum InvalidDecision {
    #[error("recommendation is empty")]
    EmptyRecommendation,

    #[error("reasoning is empty")]
    EmptyReasoning,

    #[error("confidence {0} outside [0, 1]")]
    ConfidenceOutOfRange(Decimal),

    #[error("payload for {payload} does not match decision type {expected}")]
    PayloadMismatch {
        expected: DecisionType,
        payload: DecisionType,
    },
}

/// Structured output of consulting a specialist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    pub id: Uuid,
    pub schema_version: u32,
    pub decision_type: DecisionType,
    pub recommendation: String,
    pub reasoning: String,
    /// 0.0 to 1.0.
    pub confidence: Decimal,
    #[serde(default)]
    pub alternatives: Vec<String>,
    #[serde(default)]
    pub next_steps: Vec<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    pub payload: DecisionPayload,
    /// Summary of the inputs the specialist saw.
    pub data_used: Option<serde_json::Value>,
    pub decided_at: DateTime<Utc>,
    /// Set when the specialist reply was unusable and a safe default was substituted.
    #[serde(default)]
    pub fallback: bool,
}

impl Decision {
    /// Build a decision, enforcing the core field invariants.
    pub fn new(
        decision_type: DecisionType,
        recommendation: impl Into<String>,
        reasoning: impl Into<String>,
        confidence: Decimal,
        payload: DecisionPayload,
    ) -> Result<Self, InvalidDecision> {
        let recommendation = recommendation.into();
        let reasoning = reasoning.into();

        if recommendation.trim().is_empty() {
            return Err(InvalidDecision::EmptyRecommendation);
        }
        if reasoning.trim().is_empty() {
            return Err(InvalidDecision::EmptyReasoning);
        }
        if confidence < Decimal::ZERO || confidence > Decimal::ONE {
            return Err(InvalidDecision::ConfidenceOutOfRange(confidence));
        }
        if payload.decision_type() != decision_type {
            return Err(InvalidDecision::PayloadMismatch {
                expected: decision_type,
                payload: payload.decision_type(),
            });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            schema_version: DECISION_SCHEMA_VERSION,
            decision_type,
            recommendation,
            reasoning,
            confidence,
            alternatives: Vec::new(),
            next_steps: Vec::new(),
            tool_calls: Vec::new(),
            payload,
            data_used: None,
            decided_at: Utc::now(),
            fallback: false,
        })
    }

    /// The conservative default used when a specialist reply cannot be used.
    pub fn fallback(decision_type: DecisionType, confidence: Decimal) -> Self {
        let (recommendation, reasoning) = match decision_type {
            DecisionType::Trade => (
                "Hold current roster; no trades recommended",
                "Trade analysis unavailable; standing pat",
            ),
            DecisionType::Draft => ("Take best available player", "Default draft strategy"),
            DecisionType::FreeAgency => (
                "Sign affordable role players",
                "Conservative cap management",
            ),
            DecisionType::Lineup => (
                "Start highest rated players",
                "Optimize based on player ratings",
            ),
        };

        Self {
            id: Uuid::new_v4(),
            schema_version: DECISION_SCHEMA_VERSION,
            decision_type,
            recommendation: recommendation.to_string(),
            reasoning: reasoning.to_string(),
            confidence: confidence.clamp(Decimal::ZERO, Decimal::ONE),
            alternatives: Vec::new(),
            next_steps: Vec::new(),
            tool_calls: Vec::new(),
            payload: DecisionPayload::empty(decision_type),
            data_used: None,
            decided_at: Utc::now(),
            fallback: true,
        }
    }
}

/// One line of the append-only decision log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionLogEntry {
    pub timestamp: DateTime<Utc>,
    pub decision: Decision,
    pub executed: bool,
    /// Why the decision was not executed, when it wasn't.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
