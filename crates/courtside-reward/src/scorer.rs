use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use courtside_models::{RewardConfig, TradeEvaluation};
use tracing::{debug, warn};

use crate::error::RewardError;
use crate::feedback::FeedbackLog;
use crate::memory::ModelCache;
use crate::model::TradeModel;
use crate::train::train;

/// Anything that can turn a trade description into an accept/reject evaluation.
///
/// Implementations never fail: when no verdict can be produced they return
/// [`TradeEvaluation::fallback`].
#[async_trait]
pub trait TradeScoring: Send + Sync {
    async fn score(&self, text: &str) -> TradeEvaluation;
}

/// Read-through scorer: checks the model cache, then the artifact on disk.
pub struct TradeScorer {
    model_path: PathBuf,
    cache: ModelCache,
}

impl TradeScorer {
    pub fn new(model_path: impl Into<PathBuf>, max_capacity: u64, ttl: Duration) -> Self {
        Self {
            model_path: model_path.into(),
            cache: ModelCache::new(max_capacity, ttl),
        }
    }

    pub fn from_config(config: &RewardConfig) -> Self {
        Self::new(
            &config.model_path,
            config.cache_max_capacity,
            Duration::from_secs(config.cache_ttl_seconds),
        )
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Load the model, promoting a disk hit into the cache.
    pub async fn load_model(&self) -> Result<Arc<TradeModel>, RewardError> {
        if let Some(model) = self.cache.get(&self.model_path).await {
            return Ok(model);
        }

        let model = Arc::new(TradeModel::load(&self.model_path)?);
        self.cache
            .insert(self.model_path.clone(), Arc::clone(&model))
            .await;
        debug!(path = %self.model_path.display(), "Loaded trade model from disk");
        Ok(model)
    }

    pub async fn try_score(&self, text: &str) -> Result<TradeEvaluation, RewardError> {
        let model = self.load_model().await?;
        Ok(model.evaluate(text))
    }

    /// Retrain from the feedback log, replace the artifact and drop the cached copy.
    pub async fn retrain(
        &self,
        log: &FeedbackLog,
        config: &RewardConfig,
    ) -> Result<Arc<TradeModel>, RewardError> {
        let records = log.load()?;
        let model = train(&records, config)?;
        model.save(&self.model_path)?;
        self.cache.invalidate(&self.model_path).await;
        Ok(Arc::new(model))
    }
}

#[async_trait]
impl TradeScoring for TradeScorer {
    async fn score(&self, text: &str) -> TradeEvaluation {
        match self.try_score(text).await {
            Ok(evaluation) => evaluation,
            Err(e) => {
                warn!(error = %e, "Trade scoring failed; rejecting");
                TradeEvaluation::fallback()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtside_models::Verdict;

    #[tokio::test]
    async fn missing_model_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let scorer = TradeScorer::new(dir.path().join("absent.json"), 4, Duration::from_secs(60));

        let err = scorer.try_score("anything").await.unwrap_err();
        assert!(matches!(err, RewardError::MissingModel(_)));

        let eval = scorer.score("anything").await;
        assert_eq!(eval.recommendation, Verdict::Reject);
        assert_eq!(eval.confidence, 0.0);
        assert!(eval.probability.is_none());
    }

    #[tokio::test]
    async fn corrupt_model_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, "not json").unwrap();
        let scorer = TradeScorer::new(&path, 4, Duration::from_secs(60));

        assert_eq!(scorer.score("trade").await, TradeEvaluation::fallback());
    }
}
