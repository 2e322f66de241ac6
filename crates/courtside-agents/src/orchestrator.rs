use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use courtside_models::config::{AgentsConfig, GateThresholds};
use courtside_models::{Decision, DecisionType, GameState};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::decision_log::DecisionLog;
use crate::error::AgentError;
use crate::specialist::{DecisionContext, Specialist};

/// A consulted decision and whether it cleared the confidence gate.
#[derive(Debug, Clone)]
pub struct GatedDecision {
    pub decision: Decision,
    pub passes_gate: bool,
    pub threshold: Option<Decimal>,
}

impl GatedDecision {
    pub fn hold_reason(&self) -> Option<String> {
        match (self.passes_gate, self.threshold) {
            (false, Some(t)) => Some(format!(
                "confidence {} not above threshold {t}",
                self.decision.confidence
            )),
            _ => None,
        }
    }
}

/// Routes each decision type to its specialist, substitutes safe defaults
/// when a specialist fails, and applies the confidence gate.
pub struct Orchestrator {
    specialists: HashMap<DecisionType, Arc<dyn Specialist>>,
    thresholds: GateThresholds,
    fallback_confidence: Decimal,
    log: Arc<DecisionLog>,
}

impl Orchestrator {
    pub fn new(
        specialists: Vec<Arc<dyn Specialist>>,
        config: &AgentsConfig,
        log: Arc<DecisionLog>,
    ) -> Self {
        let specialists = specialists
            .into_iter()
            .map(|s| (s.decision_type(), s))
            .collect();
        Self {
            specialists,
            thresholds: config.thresholds.clone(),
            fallback_confidence: config.fallback_confidence,
            log,
        }
    }

    pub fn log(&self) -> &Arc<DecisionLog> {
        &self.log
    }

    pub fn threshold(&self, decision_type: DecisionType) -> Option<Decimal> {
        self.thresholds.for_type(decision_type)
    }

    /// Strict gate: executes only when confidence is above the type's threshold.
    /// Types without a threshold always pass.
    pub fn passes_gate(&self, decision: &Decision) -> bool {
        match self.threshold(decision.decision_type) {
            Some(threshold) => decision.confidence > threshold,
            None => true,
        }
    }

    /// Ask the specialist for a decision. Never fails: a missing specialist,
    /// model error or unparseable reply yields the type's fallback decision.
    pub async fn consult(
        &self,
        state: &GameState,
        decision_type: DecisionType,
        context: &DecisionContext,
    ) -> Decision {
        let start = Instant::now();

        let result = match self.specialists.get(&decision_type) {
            Some(specialist) => specialist.consult(state, context).await,
            None => Err(AgentError::Unsupported(format!(
                "no specialist configured for {decision_type}"
            ))),
        };

        match result {
            Ok(decision) => {
                info!(
                    %decision_type,
                    confidence = %decision.confidence,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Specialist decided"
                );
                decision
            }
            Err(e) => {
                warn!(
                    %decision_type,
                    error = %e,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Specialist failed; using fallback decision"
                );
                Decision::fallback(decision_type, self.fallback_confidence)
            }
        }
    }

    /// Consult and apply the confidence gate.
    pub async fn evaluate(
        &self,
        state: &GameState,
        decision_type: DecisionType,
        context: &DecisionContext,
    ) -> GatedDecision {
        let decision = self.consult(state, decision_type, context).await;
        GatedDecision {
            passes_gate: self.passes_gate(&decision),
            threshold: self.threshold(decision_type),
            decision,
        }
    }

    /// Consult, gate and log in one step; `executed` in the log mirrors the gate.
    pub async fn decide(
        &self,
        state: &GameState,
        decision_type: DecisionType,
        context: &DecisionContext,
    ) -> Result<GatedDecision, AgentError> {
        let gated = self.evaluate(state, decision_type, context).await;
        self.log
            .record(&gated.decision, gated.passes_gate, gated.hold_reason())
            .await?;
        Ok(gated)
    }
}
