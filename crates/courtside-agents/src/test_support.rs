//! Scripted collaborators for exercising the decision loop without a browser,
//! a language model or a trained trade model.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use courtside_models::TradeEvaluation;
use courtside_reward::TradeScoring;
use tokio::sync::Mutex;

use crate::error::AgentError;
use crate::llm::LanguageModel;
use crate::page::{PageController, PageError};
use crate::trade_loop::TradeDesk;

/// Language model that replays queued replies and records every prompt.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, AgentError>>>,
    repeat: Option<String>,
    calls: Mutex<Vec<(String, String)>>,
    images: Mutex<Vec<Vec<u8>>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<String, AgentError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            repeat: None,
            calls: Mutex::new(Vec::new()),
            images: Mutex::new(Vec::new()),
        }
    }

    /// Answer every call with the same reply.
    pub fn repeating(reply: impl Into<String>) -> Self {
        let mut model = Self::new(Vec::new());
        model.repeat = Some(reply.into());
        model
    }

    /// (system, prompt) pairs in call order.
    pub async fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().await.clone()
    }

    pub async fn images(&self) -> Vec<Vec<u8>> {
        self.images.lock().await.clone()
    }

    async fn next_reply(&self, system: &str, prompt: &str) -> Result<String, AgentError> {
        self.calls
            .lock()
            .await
            .push((system.to_string(), prompt.to_string()));
        if let Some(reply) = self.replies.lock().await.pop_front() {
            return reply;
        }
        self.repeat
            .clone()
            .ok_or_else(|| AgentError::Cli("scripted model has no replies left".to_string()))
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, AgentError> {
        self.next_reply(system, prompt).await
    }

    async fn complete_with_image(
        &self,
        system: &str,
        prompt: &str,
        image: &[u8],
    ) -> Result<String, AgentError> {
        self.images.lock().await.push(image.to_vec());
        self.next_reply(system, prompt).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageAction {
    Click(String),
    Select(String, String),
}

/// Page that records successful actions and fails on configured selectors.
#[derive(Default)]
pub struct RecordingPage {
    actions: Mutex<Vec<PageAction>>,
    missing: HashSet<String>,
    screenshot: Vec<u8>,
    url: String,
}

impl RecordingPage {
    pub fn with_missing(mut self, selector: &str) -> Self {
        self.missing.insert(selector.to_string());
        self
    }

    pub fn with_screenshot(mut self, bytes: Vec<u8>) -> Self {
        self.screenshot = bytes;
        self
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub async fn actions(&self) -> Vec<PageAction> {
        self.actions.lock().await.clone()
    }

    fn check(&self, selector: &str) -> Result<(), PageError> {
        if self.missing.contains(selector) {
            Err(PageError::ElementNotFound(selector.to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PageController for RecordingPage {
    async fn click(&self, selector: &str) -> Result<(), PageError> {
        self.check(selector)?;
        self.actions
            .lock()
            .await
            .push(PageAction::Click(selector.to_string()));
        Ok(())
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), PageError> {
        self.check(selector)?;
        self.actions
            .lock()
            .await
            .push(PageAction::Select(selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn screenshot(&self, selector: &str) -> Result<Vec<u8>, PageError> {
        self.check(selector)?;
        Ok(self.screenshot.clone())
    }

    async fn current_url(&self) -> Result<String, PageError> {
        Ok(self.url.clone())
    }
}

/// Scorer that accepts exactly the listed descriptions with probability 0.9
/// and rejects everything else with probability 0.2.
pub struct StubScorer {
    accept: HashSet<String>,
    seen: Mutex<Vec<String>>,
}

impl StubScorer {
    pub fn accepting(descriptions: &[&str]) -> Self {
        Self {
            accept: descriptions.iter().map(|d| d.to_string()).collect(),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub async fn seen(&self) -> Vec<String> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl TradeScoring for StubScorer {
    async fn score(&self, text: &str) -> TradeEvaluation {
        self.seen.lock().await.push(text.to_string());
        if self.accept.contains(text) {
            TradeEvaluation::from_probability(0.9)
        } else {
            TradeEvaluation::from_probability(0.2)
        }
    }
}

/// Trade desk over a fixed list of proposal descriptions.
pub struct ScriptedTradeDesk {
    proposals: Vec<String>,
    unreadable: HashSet<usize>,
    failing_accept: bool,
    accepted: Mutex<Vec<usize>>,
    dismissed: Mutex<Vec<usize>>,
}

impl ScriptedTradeDesk {
    pub fn new<S: Into<String>>(proposals: Vec<S>) -> Self {
        Self {
            proposals: proposals.into_iter().map(Into::into).collect(),
            unreadable: HashSet::new(),
            failing_accept: false,
            accepted: Mutex::new(Vec::new()),
            dismissed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_unreadable(mut self, index: usize) -> Self {
        self.unreadable.insert(index);
        self
    }

    pub fn with_failing_accept(mut self) -> Self {
        self.failing_accept = true;
        self
    }

    pub async fn accepted(&self) -> Vec<usize> {
        self.accepted.lock().await.clone()
    }

    pub async fn dismissed(&self) -> Vec<usize> {
        self.dismissed.lock().await.clone()
    }
}

#[async_trait]
impl TradeDesk for ScriptedTradeDesk {
    async fn pending(&self) -> Result<usize, PageError> {
        Ok(self.proposals.len())
    }

    async fn describe(&self, index: usize) -> Result<String, PageError> {
        if self.unreadable.contains(&index) {
            return Err(PageError::Timeout(format!("proposal {index}")));
        }
        self.proposals
            .get(index)
            .cloned()
            .ok_or_else(|| PageError::ElementNotFound(format!("proposal {index}")))
    }

    async fn accept(&self, index: usize) -> Result<(), PageError> {
        if self.failing_accept {
            return Err(PageError::Other("accept button disabled".to_string()));
        }
        self.accepted.lock().await.push(index);
        Ok(())
    }

    async fn dismiss(&self, index: usize) -> Result<(), PageError> {
        self.dismissed.lock().await.push(index);
        Ok(())
    }
}
