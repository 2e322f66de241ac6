use async_trait::async_trait;
use courtside_models::{Decision, ToolCall};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("page timed out: {0}")]
    Timeout(String),

    #[error("page error: {0}")]
    Other(String),
}

/// Browser surface the game runs in. Implemented outside this crate.
#[async_trait]
pub trait PageController: Send + Sync {
    async fn click(&self, selector: &str) -> Result<(), PageError>;

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), PageError>;

    /// PNG bytes of the element matching `selector`.
    async fn screenshot(&self, selector: &str) -> Result<Vec<u8>, PageError>;

    async fn current_url(&self) -> Result<String, PageError>;
}

/// Carries out an approved decision.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, decision: &Decision) -> Result<(), PageError>;
}

/// Executes a decision by replaying its tool calls against a page.
pub struct PageExecutor<P> {
    page: P,
}

impl<P: PageController> PageExecutor<P> {
    pub fn new(page: P) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &P {
        &self.page
    }
}

#[async_trait]
impl<P: PageController> ActionExecutor for PageExecutor<P> {
    async fn execute(&self, decision: &Decision) -> Result<(), PageError> {
        if decision.tool_calls.is_empty() {
            debug!(id = %decision.id, "Decision has no page actions");
        }
        for call in &decision.tool_calls {
            match call {
                ToolCall::Click { selector } => self.page.click(selector).await?,
                ToolCall::SelectOption { selector, value } => {
                    self.page.select_option(selector, value).await?
                }
            }
        }
        info!(
            id = %decision.id,
            decision_type = %decision.decision_type,
            actions = decision.tool_calls.len(),
            "Decision executed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{PageAction, RecordingPage};
    use courtside_models::DecisionType;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn replays_tool_calls_in_order() {
        let mut decision = Decision::fallback(DecisionType::Lineup, dec!(0.3));
        decision.tool_calls = vec![
            ToolCall::Click {
                selector: "#roster".into(),
            },
            ToolCall::SelectOption {
                selector: "#starter-1".into(),
                value: "p42".into(),
            },
        ];

        let executor = PageExecutor::new(RecordingPage::default());
        executor.execute(&decision).await.unwrap();

        assert_eq!(
            executor.page().actions().await,
            vec![
                PageAction::Click("#roster".into()),
                PageAction::Select("#starter-1".into(), "p42".into()),
            ]
        );
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        let mut decision = Decision::fallback(DecisionType::Trade, dec!(0.3));
        decision.tool_calls = vec![
            ToolCall::Click {
                selector: "#missing".into(),
            },
            ToolCall::Click {
                selector: "#after".into(),
            },
        ];

        let page = RecordingPage::default().with_missing("#missing");
        let executor = PageExecutor::new(page);
        let err = executor.execute(&decision).await.unwrap_err();
        assert_eq!(err, PageError::ElementNotFound("#missing".into()));
        assert!(executor.page().actions().await.is_empty());
    }
}
