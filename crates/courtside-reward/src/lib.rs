pub mod error;
pub mod feedback;
pub mod logistic;
pub mod memory;
pub mod model;
pub mod scorer;
pub mod tfidf;
pub mod tokenize;
pub mod train;

pub use error::RewardError;
pub use feedback::{parse_records, FeedbackLog};
pub use model::{ModelMetadata, TradeModel};
pub use scorer::{TradeScorer, TradeScoring};
pub use train::train;
