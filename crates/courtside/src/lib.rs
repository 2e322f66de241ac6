//! Courtside - an autonomous general manager for Basketball GM.
//!
//! A phase-gated decision loop consults one language-model specialist per
//! decision type, while a text classifier trained on past outcomes screens
//! incoming trade proposals.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use courtside::models::{CourtsideConfig, DecisionType, GameState, Phase};
//! use courtside::agents::{Orchestrator, PhaseManager, SeasonCoordinator};
//! use courtside::reward::{FeedbackLog, TradeScorer};
//! ```

pub use courtside_agents as agents;
pub use courtside_models as models;
pub use courtside_reward as reward;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use courtside_agents::{
    AnthropicApi, ClaudeCli, DecisionLog, LanguageModel, LlmSpecialist, Orchestrator,
    PhaseManager, Specialist,
};
use courtside_models::config::{AgentsConfig, CourtsideConfig, LlmBackend};
use courtside_reward::{FeedbackLog, TradeScorer};
use tracing::info;

/// Read and parse a TOML configuration file.
pub fn load_config(path: &Path) -> Result<CourtsideConfig, anyhow::Error> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Build the configured language model adapter for `model`.
pub fn build_language_model(
    config: &AgentsConfig,
    model: &str,
) -> Result<Arc<dyn LanguageModel>, anyhow::Error> {
    let timeout = Duration::from_secs(config.timeout_seconds);
    let adapter: Arc<dyn LanguageModel> = match config.backend {
        LlmBackend::Cli => Arc::new(ClaudeCli::new(model.to_string(), timeout)),
        LlmBackend::Api => Arc::new(
            AnthropicApi::from_env(
                &config.api_key_env,
                model.to_string(),
                config.max_tokens,
                timeout,
            )
            .context("Failed to configure Anthropic API backend")?,
        ),
    };
    Ok(adapter)
}

/// Build an Orchestrator with one specialist per enabled decision type,
/// logging to the configured decision log.
pub fn build_orchestrator(config: &CourtsideConfig) -> Result<Orchestrator, anyhow::Error> {
    let agents = &config.agents;
    let specialists = agents
        .specialists
        .iter()
        .filter(|s| s.enabled)
        .map(|s| {
            let model = s.model.as_deref().unwrap_or(&agents.model);
            let llm = build_language_model(agents, model)?;
            info!(decision_type = %s.decision_type, model, "Specialist configured");
            Ok(Arc::new(LlmSpecialist::new(s.decision_type, llm)) as Arc<dyn Specialist>)
        })
        .collect::<Result<Vec<_>, anyhow::Error>>()?;

    let log = Arc::new(DecisionLog::with_file(&config.logs.decision_log));
    Ok(Orchestrator::new(specialists, agents, log))
}

pub fn build_phase_manager(config: &CourtsideConfig) -> PhaseManager {
    PhaseManager::new(&config.phases)
}

pub fn build_scorer(config: &CourtsideConfig) -> TradeScorer {
    TradeScorer::from_config(&config.reward)
}

pub fn feedback_log(config: &CourtsideConfig) -> FeedbackLog {
    FeedbackLog::new(&config.reward.feedback_log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtside_models::{DecisionType, Phase};

    #[test]
    fn load_config_applies_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courtside.toml");
        std::fs::write(
            &path,
            r#"
[agents]
model = "claude-haiku"
timeout_seconds = 30

[reward]
model_path = "models/trades.json"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.agents.model, "claude-haiku");
        assert_eq!(config.reward.model_path, "models/trades.json");
        assert_eq!(config.reward.cv_folds, 5);
        assert_eq!(config.phases.budgets.for_phase(Phase::TradeDeadline), 3);
    }

    #[test]
    fn shipped_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/courtside.toml");
        let config = load_config(&path).unwrap();
        assert_eq!(config.agents.backend, LlmBackend::Cli);
        assert_eq!(
            config
                .agents
                .specialist(DecisionType::Lineup)
                .and_then(|s| s.model.as_deref()),
            Some("claude-haiku-4-5")
        );
        assert_eq!(config.reward.max_features, 20_000);
    }

    #[test]
    fn missing_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn api_backend_requires_key() {
        let config = AgentsConfig {
            backend: LlmBackend::Api,
            api_key_env: "COURTSIDE_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..AgentsConfig::default()
        };
        assert!(build_language_model(&config, "claude-haiku").is_err());
    }

    #[test]
    fn orchestrator_logs_to_configured_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CourtsideConfig::default();
        config.logs.decision_log = dir
            .path()
            .join("decisions.jsonl")
            .to_string_lossy()
            .into_owned();
        if let Some(lineup) = config
            .agents
            .specialists
            .iter_mut()
            .find(|s| s.decision_type == DecisionType::Lineup)
        {
            lineup.model = Some("claude-haiku".to_string());
        }

        let orchestrator = build_orchestrator(&config).unwrap();
        assert_eq!(
            orchestrator.log().path(),
            Some(dir.path().join("decisions.jsonl").as_path())
        );
    }
}
