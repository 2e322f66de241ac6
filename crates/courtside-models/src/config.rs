use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decision::DecisionType;
use crate::game_state::{Phase, DEFAULT_ROSTER_CAP};

/// Top-level configuration for Courtside.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CourtsideConfig {
    #[serde(default)]
    pub phases: PhaseConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub reward: RewardConfig,
    #[serde(default)]
    pub logs: LogConfig,
}

/// Roster-move allotment per phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PhaseBudgets {
    pub preseason: u32,
    pub regular_season: u32,
    pub trade_deadline: u32,
    pub playoffs: u32,
    pub draft: u32,
    pub free_agency: u32,
}

impl Default for PhaseBudgets {
    fn default() -> Self {
        Self {
            preseason: 3,
            regular_season: 0,
            trade_deadline: 3,
            playoffs: 0,
            draft: 0,
            free_agency: 2,
        }
    }
}

impl PhaseBudgets {
    pub fn for_phase(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Preseason => self.preseason,
            Phase::RegularSeason => self.regular_season,
            Phase::TradeDeadline => self.trade_deadline,
            Phase::Playoffs => self.playoffs,
            Phase::Draft => self.draft,
            Phase::FreeAgency => self.free_agency,
        }
    }
}

/// Configuration for the phase state machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseConfig {
    #[serde(default)]
    pub budgets: PhaseBudgets,
    /// Last season to play. `None` = keep wrapping into new seasons.
    #[serde(default)]
    pub max_seasons: Option<u32>,
    #[serde(default = "default_roster_cap")]
    pub roster_cap: u32,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            budgets: PhaseBudgets::default(),
            max_seasons: None,
            roster_cap: DEFAULT_ROSTER_CAP,
        }
    }
}

/// Which language model adapter to use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Spawn the `claude` CLI.
    #[default]
    Cli,
    /// Call the Anthropic Messages API directly.
    Api,
}

/// Minimum confidence per decision type before a decision is executed.
/// A decision executes only when its confidence is strictly greater.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GateThresholds {
    pub trade: Decimal,
    pub free_agency: Decimal,
    pub lineup: Decimal,
    /// Draft picks are time-sensitive; `None` means always execute.
    #[serde(default)]
    pub draft: Option<Decimal>,
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            trade: Decimal::new(85, 2),
            free_agency: Decimal::new(80, 2),
            lineup: Decimal::new(70, 2),
            draft: None,
        }
    }
}

impl GateThresholds {
    pub fn for_type(&self, decision_type: DecisionType) -> Option<Decimal> {
        match decision_type {
            DecisionType::Trade => Some(self.trade),
            DecisionType::FreeAgency => Some(self.free_agency),
            DecisionType::Lineup => Some(self.lineup),
            DecisionType::Draft => self.draft,
        }
    }
}

/// Configuration for the specialist/orchestration layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentsConfig {
    #[serde(default)]
    pub backend: LlmBackend,
    /// Default model for specialists.
    pub model: String,
    /// Per-call language model timeout in seconds.
    pub timeout_seconds: u64,
    /// Environment variable holding the API key (API backend only).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub thresholds: GateThresholds,
    /// Confidence assigned to fallback decisions.
    #[serde(default = "default_fallback_confidence")]
    pub fallback_confidence: Decimal,
    #[serde(default = "default_specialists")]
    pub specialists: Vec<SpecialistConfig>,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Cli,
            model: "claude-sonnet-4-5-20250929".to_string(),
            timeout_seconds: 60,
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            thresholds: GateThresholds::default(),
            fallback_confidence: default_fallback_confidence(),
            specialists: default_specialists(),
        }
    }
}

impl AgentsConfig {
    pub fn specialist(&self, decision_type: DecisionType) -> Option<&SpecialistConfig> {
        self.specialists
            .iter()
            .find(|s| s.decision_type == decision_type)
    }
}

/// Configuration for a single specialist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpecialistConfig {
    pub decision_type: DecisionType,
    /// Override model for this specialist. Falls back to `AgentsConfig::model`.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Configuration for the trade evaluation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RewardConfig {
    /// Append-only trade feedback log (training data).
    pub feedback_log: String,
    /// Where the fitted model artifact is written and read.
    pub model_path: String,
    /// Vocabulary cap, most frequent terms kept.
    pub max_features: usize,
    /// Largest n-gram size (unigrams through this).
    pub ngram_max: usize,
    /// Inverse regularization strength.
    pub c: f64,
    pub max_iter: usize,
    pub learning_rate: f64,
    pub test_size: f64,
    pub cv_folds: usize,
    pub seed: u64,
    pub cache_max_capacity: u64,
    pub cache_ttl_seconds: u64,
    /// Also fit on records whose label copies the model's own verdict.
    pub train_on_model_labels: bool,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            feedback_log: "trade_feedback.txt".to_string(),
            model_path: "reward_model.json".to_string(),
            max_features: 20_000,
            ngram_max: 2,
            c: 3.0,
            max_iter: 400,
            learning_rate: 1.0,
            test_size: 0.2,
            cv_folds: 5,
            seed: 42,
            cache_max_capacity: 4,
            cache_ttl_seconds: 60,
            train_on_model_labels: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// JSON Lines file receiving one entry per decision.
    pub decision_log: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            decision_log: "logs/decisions.jsonl".to_string(),
        }
    }
}

fn default_roster_cap() -> u32 {
    DEFAULT_ROSTER_CAP
}
fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_fallback_confidence() -> Decimal {
    Decimal::new(3, 1)
}
fn default_true() -> bool {
    true
}
fn default_specialists() -> Vec<SpecialistConfig> {
    DecisionType::ALL
        .into_iter()
        .map(|decision_type| SpecialistConfig {
            decision_type,
            model: None,
            enabled: true,
        })
        .collect()
}
