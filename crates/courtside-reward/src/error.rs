use thiserror::Error;

#[derive(Error, Debug)]
pub enum RewardError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not enough training data: {0}")]
    InsufficientData(String),

    #[error("Training data contains a single class: label={0}")]
    SingleClass(u8),

    #[error("Model artifact not found: {0}")]
    MissingModel(String),
}
