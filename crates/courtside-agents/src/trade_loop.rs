use async_trait::async_trait;
use courtside_models::TradeEvaluation;
use courtside_reward::TradeScoring;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::AgentError;
use crate::page::PageError;

/// The trading block as presented by the game: an ordered list of proposals.
#[async_trait]
pub trait TradeDesk: Send + Sync {
    async fn pending(&self) -> Result<usize, PageError>;

    /// Plain-text description of the proposal at `index`.
    async fn describe(&self, index: usize) -> Result<String, PageError>;

    async fn accept(&self, index: usize) -> Result<(), PageError>;

    async fn dismiss(&self, index: usize) -> Result<(), PageError>;
}

/// A proposal that was described and scored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewedTrade {
    pub index: usize,
    pub description: String,
    pub evaluation: TradeEvaluation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TradeLoopOutcome {
    Accepted {
        index: usize,
        evaluation: TradeEvaluation,
    },
    NoAction {
        reviewed: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeReview {
    pub outcome: TradeLoopOutcome,
    /// Every proposal scored, in presentation order.
    pub scored: Vec<ReviewedTrade>,
}

/// Walk pending proposals in order and accept the first one scored ACCEPT.
///
/// Later proposals are never looked at once one is accepted, so this finds the
/// first acceptable deal, not the best. Proposals that cannot be described or
/// dismissed are skipped; failing to accept the chosen one is an error.
pub async fn review_proposals(
    desk: &dyn TradeDesk,
    scorer: &dyn TradeScoring,
) -> Result<TradeReview, AgentError> {
    let count = desk.pending().await?;
    let mut scored = Vec::new();

    for index in 0..count {
        let description = match desk.describe(index).await {
            Ok(d) => d,
            Err(e) => {
                warn!(index, error = %e, "Could not read trade proposal; skipping");
                continue;
            }
        };

        let evaluation = scorer.score(&description).await;
        info!(
            index,
            recommendation = %evaluation.recommendation,
            confidence = evaluation.confidence,
            "Scored trade proposal"
        );
        scored.push(ReviewedTrade {
            index,
            description,
            evaluation: evaluation.clone(),
        });

        if evaluation.is_accept() {
            desk.accept(index).await?;
            info!(index, "Accepted trade proposal");
            return Ok(TradeReview {
                outcome: TradeLoopOutcome::Accepted { index, evaluation },
                scored,
            });
        }

        if let Err(e) = desk.dismiss(index).await {
            warn!(index, error = %e, "Could not dismiss trade proposal");
        }
    }

    Ok(TradeReview {
        outcome: TradeLoopOutcome::NoAction {
            reviewed: scored.len(),
        },
        scored,
    })
}
