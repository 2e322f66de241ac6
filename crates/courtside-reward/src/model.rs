use std::path::Path;

use chrono::{DateTime, Utc};
use courtside_models::TradeEvaluation;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RewardError;
use crate::logistic::LogisticRegression;
use crate::tfidf::TfidfVectorizer;

/// Training summary stored alongside the fitted model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelMetadata {
    pub trained_at: DateTime<Utc>,
    pub n_samples: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub n_features: usize,
    pub test_accuracy: f64,
    /// Mean accuracy over stratified folds; `None` when a class was too small.
    pub cv_mean_accuracy: Option<f64>,
    pub cv_folds: usize,
}

/// Fitted trade acceptance model: vectorizer, classifier and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeModel {
    pub vectorizer: TfidfVectorizer,
    pub classifier: LogisticRegression,
    pub metadata: ModelMetadata,
}

impl TradeModel {
    /// Probability that the trade described by `text` is accepted.
    pub fn predict_proba(&self, text: &str) -> f64 {
        self.classifier
            .predict_proba(&self.vectorizer.transform(text))
    }

    pub fn evaluate(&self, text: &str) -> TradeEvaluation {
        TradeEvaluation::from_probability(self.predict_proba(text))
    }

    pub fn load(path: &Path) -> Result<Self, RewardError> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RewardError::MissingModel(path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&json)?)
    }

    /// Write the artifact to a sibling temp file, then rename over `path`.
    pub fn save(&self, path: &Path) -> Result<(), RewardError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);

        std::fs::write(&tmp, serde_json::to_vec(self)?)?;
        std::fs::rename(&tmp, path)?;

        info!(
            path = %path.display(),
            features = self.metadata.n_features,
            test_accuracy = self.metadata.test_accuracy,
            "Saved trade model"
        );
        Ok(())
    }
}
