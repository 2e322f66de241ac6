pub mod config;
pub mod decision;
pub mod game_state;
pub mod trade_record;

pub use config::{
    AgentsConfig, CourtsideConfig, GateThresholds, LlmBackend, LogConfig, PhaseBudgets,
    PhaseConfig, RewardConfig, SpecialistConfig,
};
pub use decision::{
    Decision, DecisionLogEntry, DecisionPayload, DecisionType, InvalidDecision, ToolCall,
    DECISION_SCHEMA_VERSION,
};
pub use game_state::{GameState, Phase, DEFAULT_ROSTER_CAP};
pub use trade_record::{
    confidence_from_probability, Feedback, LabelSource, TradeEvaluation, TradeRecord, Verdict,
};
