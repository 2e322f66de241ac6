use std::sync::Arc;

use courtside_models::{Decision, DecisionType, GameState};
use courtside_reward::{FeedbackLog, TradeScoring};
use tracing::{info, warn};

use crate::error::AgentError;
use crate::extract::StateExtractor;
use crate::orchestrator::Orchestrator;
use crate::page::{ActionExecutor, PageController};
use crate::phase::{ExecutionPolicy, PhaseManager, Session};
use crate::specialist::DecisionContext;
use crate::trade_loop::{review_proposals, TradeDesk, TradeLoopOutcome, TradeReview};

/// Result of one pass through the decision loop.
#[derive(Debug, Clone)]
pub struct ActOutcome {
    pub decision: Decision,
    pub executed: bool,
    /// Why the decision was held, when it was.
    pub reason: Option<String>,
}

/// Ties the phase machine, the orchestrator and the page together.
pub struct SeasonCoordinator {
    phases: PhaseManager,
    orchestrator: Orchestrator,
    executor: Arc<dyn ActionExecutor>,
    extractor: Option<StateExtractor>,
    feedback: Option<FeedbackLog>,
}

impl SeasonCoordinator {
    pub fn new(
        phases: PhaseManager,
        orchestrator: Orchestrator,
        executor: Arc<dyn ActionExecutor>,
    ) -> Self {
        Self {
            phases,
            orchestrator,
            executor,
            extractor: None,
            feedback: None,
        }
    }

    pub fn with_extractor(mut self, extractor: StateExtractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Record every scored trade to this log so outcomes feed retraining.
    pub fn with_feedback_log(mut self, log: FeedbackLog) -> Self {
        self.feedback = Some(log);
        self
    }

    pub fn phases(&self) -> &PhaseManager {
        &self.phases
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Re-read game state from the page and clear the session's refresh flag.
    pub async fn refresh_state(
        &self,
        session: &mut Session,
        page: &dyn PageController,
    ) -> Result<GameState, AgentError> {
        let extractor = self
            .extractor
            .as_ref()
            .ok_or_else(|| AgentError::Unsupported("no state extractor configured".to_string()))?;
        let state = extractor.extract(page).await?;
        self.phases.mark_state_refreshed(session);
        Ok(state)
    }

    /// Consult the specialist for `decision_type` and execute the decision if
    /// the current phase's policy allows it. Every decision is logged.
    pub async fn act(
        &self,
        session: &mut Session,
        state: &GameState,
        decision_type: DecisionType,
        context: &DecisionContext,
    ) -> Result<ActOutcome, AgentError> {
        if session.needs_state_refresh {
            warn!(phase = %session.phase, "Acting on game state not refreshed for this phase");
        }

        let gated = self
            .orchestrator
            .evaluate(state, decision_type, context)
            .await;
        let policy = ExecutionPolicy::for_phase(session.phase);

        let hold = match policy {
            ExecutionPolicy::Always => None,
            ExecutionPolicy::GateOnly => gated.hold_reason(),
            ExecutionPolicy::BudgetAndGate => gated.hold_reason().or_else(|| {
                (!self.phases.can_act(session))
                    .then(|| format!("no actions remaining in {}", session.phase))
            }),
        };

        let log = self.orchestrator.log();
        if let Some(reason) = hold {
            info!(%decision_type, phase = %session.phase, reason = %reason, "Decision held");
            log.record(&gated.decision, false, Some(reason.clone()))
                .await?;
            return Ok(ActOutcome {
                decision: gated.decision,
                executed: false,
                reason: Some(reason),
            });
        }

        if let Err(e) = self.executor.execute(&gated.decision).await {
            log.record(&gated.decision, false, Some(format!("execution failed: {e}")))
                .await?;
            return Err(e.into());
        }

        if policy == ExecutionPolicy::BudgetAndGate {
            self.phases.try_consume_action(session);
        }
        log.record(&gated.decision, true, None).await?;

        Ok(ActOutcome {
            decision: gated.decision,
            executed: true,
            reason: None,
        })
    }

    /// Walk the trading block while roster moves remain. An accepted trade
    /// costs one action. Scored trades are logged with model-sourced labels.
    pub async fn review_trades(
        &self,
        session: &mut Session,
        desk: &dyn TradeDesk,
        scorer: &dyn TradeScoring,
    ) -> Result<Option<TradeReview>, AgentError> {
        if session.remaining == 0 {
            warn!(phase = %session.phase, "Skipping trade review: no actions remaining");
            return Ok(None);
        }

        let review = review_proposals(desk, scorer).await?;
        if let TradeLoopOutcome::Accepted { .. } = review.outcome {
            self.phases.try_consume_action(session);
        }

        if let Some(log) = &self.feedback {
            for scored in &review.scored {
                if let Err(e) = log
                    .append_model_labelled(&scored.description, scored.evaluation.recommendation)
                {
                    warn!(error = %e, index = scored.index, "Could not record trade feedback");
                }
            }
        }

        Ok(Some(review))
    }
}
