use std::sync::Arc;

use courtside_models::GameState;
use tracing::{debug, info};

use crate::error::AgentError;
use crate::llm::LanguageModel;
use crate::page::PageController;
use crate::parser::extract_json;

pub const DEFAULT_DASHBOARD_SELECTOR: &str = "body";

fn extraction_system_prompt() -> String {
    let example = serde_json::json!({
        "season": 2025,
        "phase": "regular_season",
        "wins": 12,
        "losses": 8,
        "team_rating": 54,
        "salary_cap_used": "118500000",
        "available_cap_space": "21500000",
        "roster_size": 14,
        "playoff_position": "5th in East",
        "roster": [{"name": "<player>", "position": "PG", "ovr": 61, "pot": 70, "age": 24}],
        "trade_offers": [],
        "free_agents": [],
        "draft_prospects": [],
        "upcoming_schedule": []
    });
    format!(
        "You read screenshots of a Basketball GM dashboard and transcribe the team's state.\n\n\
         Return ONLY a JSON object with this structure:\n{}\n\n\
         `phase` is one of: preseason, regular_season, trade_deadline, playoffs, draft, free_agency.\n\
         Money values are plain numbers in dollars. Omit lists you cannot see. Never invent players.",
        serde_json::to_string_pretty(&example).unwrap_or_default()
    )
}

/// Builds a [`GameState`] from a screenshot of the game dashboard.
pub struct StateExtractor {
    model: Arc<dyn LanguageModel>,
    selector: String,
    roster_cap: u32,
}

impl StateExtractor {
    pub fn new(model: Arc<dyn LanguageModel>, roster_cap: u32) -> Self {
        Self {
            model,
            selector: DEFAULT_DASHBOARD_SELECTOR.to_string(),
            roster_cap,
        }
    }

    pub fn with_selector(mut self, selector: &str) -> Self {
        self.selector = selector.to_string();
        self
    }

    /// Parse and validate a model reply into a snapshot.
    pub fn parse_state(&self, raw: &str) -> Result<GameState, AgentError> {
        let json = extract_json(raw)?;
        let state: GameState = serde_json::from_str(&json)
            .map_err(|e| AgentError::Parse(format!("GameState: {e}")))?;
        state
            .validate(self.roster_cap)
            .map_err(|e| AgentError::Parse(format!("invalid GameState: {e}")))?;
        Ok(state)
    }

    pub async fn extract(&self, page: &dyn PageController) -> Result<GameState, AgentError> {
        let image = page.screenshot(&self.selector).await?;
        debug!(bytes = image.len(), selector = %self.selector, "Captured dashboard");

        let raw = self
            .model
            .complete_with_image(
                &extraction_system_prompt(),
                "Extract the current game state from this screenshot.",
                &image,
            )
            .await?;
        let state = self.parse_state(&raw)?;

        info!(
            season = state.season,
            phase = %state.phase,
            record = %state.record(),
            roster_size = state.roster_size,
            "Extracted game state"
        );
        Ok(state)
    }
}
