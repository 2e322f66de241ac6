use std::sync::Arc;

use async_trait::async_trait;
use courtside_models::{Decision, DecisionType, GameState};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::AgentError;
use crate::llm::LanguageModel;
use crate::parser::parse_decision;
use crate::prompts::{system_prompt, user_prompt};

/// Extra inputs for a consultation. Every field is optional; collections left
/// empty fall back to the ones carried by the `GameState`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DecisionContext {
    #[serde(default)]
    pub roster: Option<Value>,
    #[serde(default)]
    pub trade_offers: Option<Vec<Value>>,
    #[serde(default)]
    pub draft_prospects: Option<Vec<Value>>,
    #[serde(default)]
    pub free_agents: Option<Vec<Value>>,
    #[serde(default)]
    pub upcoming_schedule: Option<Vec<Value>>,
    #[serde(default)]
    pub injuries: Vec<String>,
    #[serde(default)]
    pub team_needs: Vec<String>,
    #[serde(default)]
    pub draft_position: Option<String>,
}

fn len_of(items: Option<&Vec<Value>>) -> usize {
    items.map(Vec::len).unwrap_or(0)
}

/// Summary of the inputs a specialist saw, stored on the decision.
fn data_used(decision_type: DecisionType, state: &GameState, context: &DecisionContext) -> Value {
    match decision_type {
        DecisionType::Trade => serde_json::json!({
            "trade_offers": len_of(context.trade_offers.as_ref().or(state.trade_offers.as_ref())),
            "roster_size": state.roster_size,
        }),
        DecisionType::Draft => serde_json::json!({
            "prospects_available": len_of(context.draft_prospects.as_ref().or(state.draft_prospects.as_ref())),
        }),
        DecisionType::FreeAgency => serde_json::json!({
            "free_agents_available": len_of(context.free_agents.as_ref().or(state.free_agents.as_ref())),
            "available_cap_space": state.available_cap_space,
        }),
        DecisionType::Lineup => serde_json::json!({
            "roster_size": state.roster_size,
            "injuries": context.injuries.len(),
        }),
    }
}

/// A role-specific advisor for one decision type. Mockable for testing.
#[async_trait]
pub trait Specialist: Send + Sync {
    fn decision_type(&self) -> DecisionType;

    async fn consult(
        &self,
        state: &GameState,
        context: &DecisionContext,
    ) -> Result<Decision, AgentError>;
}

/// A specialist that prompts a language model and parses its reply.
pub struct LlmSpecialist {
    decision_type: DecisionType,
    model: Arc<dyn LanguageModel>,
}

impl LlmSpecialist {
    pub fn new(decision_type: DecisionType, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            decision_type,
            model,
        }
    }
}

#[async_trait]
impl Specialist for LlmSpecialist {
    fn decision_type(&self) -> DecisionType {
        self.decision_type
    }

    async fn consult(
        &self,
        state: &GameState,
        context: &DecisionContext,
    ) -> Result<Decision, AgentError> {
        let system = system_prompt(self.decision_type);
        let prompt = user_prompt(self.decision_type, state, context);

        let raw = self.model.complete(&system, &prompt).await?;
        debug!(decision_type = %self.decision_type, raw = %raw, "Specialist replied");

        let mut decision = parse_decision(&raw, self.decision_type)?;
        decision.data_used = Some(data_used(self.decision_type, state, context));
        Ok(decision)
    }
}
