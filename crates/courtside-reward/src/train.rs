use chrono::Utc;
use courtside_models::{LabelSource, RewardConfig, TradeRecord};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::error::RewardError;
use crate::logistic::{LogisticParams, LogisticRegression};
use crate::model::{ModelMetadata, TradeModel};
use crate::tfidf::TfidfVectorizer;

fn logistic_params(config: &RewardConfig) -> LogisticParams {
    LogisticParams {
        c: config.c,
        max_iter: config.max_iter,
        learning_rate: config.learning_rate,
        ..LogisticParams::default()
    }
}

fn class_indices(labels: &[u8]) -> [Vec<usize>; 2] {
    let mut classes = [Vec::new(), Vec::new()];
    for (i, &label) in labels.iter().enumerate() {
        classes[usize::from(label.min(1))].push(i);
    }
    classes
}

/// Stratified train/test split. Each class contributes `round(count * test_size)`
/// samples to the test set, leaving at least one behind for training.
pub fn stratified_split(labels: &[u8], test_size: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for mut idx in class_indices(labels) {
        if idx.is_empty() {
            continue;
        }
        idx.shuffle(&mut rng);
        let n_test = ((idx.len() as f64) * test_size).round() as usize;
        let n_test = n_test.min(idx.len() - 1);
        test.extend_from_slice(&idx[..n_test]);
        train.extend_from_slice(&idx[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

/// Stratified k-fold assignment: returns the test indices of each fold.
pub fn stratified_folds(labels: &[u8], k: usize, seed: u64) -> Vec<Vec<usize>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut folds = vec![Vec::new(); k];

    for mut idx in class_indices(labels) {
        idx.shuffle(&mut rng);
        for (i, sample) in idx.into_iter().enumerate() {
            folds[i % k].push(sample);
        }
    }
    for fold in folds.iter_mut() {
        fold.sort_unstable();
    }
    folds
}

fn fit(texts: &[&str], labels: &[u8], config: &RewardConfig) -> (TfidfVectorizer, LogisticRegression) {
    let vectorizer = TfidfVectorizer::fit(texts, config.max_features, config.ngram_max);
    let rows = vectorizer.transform_all(texts);
    let classifier = LogisticRegression::fit(
        &rows,
        labels,
        vectorizer.n_features(),
        logistic_params(config),
    );
    (vectorizer, classifier)
}

fn accuracy(
    vectorizer: &TfidfVectorizer,
    classifier: &LogisticRegression,
    texts: &[&str],
    labels: &[u8],
) -> f64 {
    if texts.is_empty() {
        return 0.0;
    }
    let correct = texts
        .iter()
        .zip(labels)
        .filter(|(text, label)| classifier.predict(&vectorizer.transform(text)) == **label)
        .count();
    correct as f64 / texts.len() as f64
}

fn select<'a>(texts: &[&'a str], labels: &[u8], idx: &[usize]) -> (Vec<&'a str>, Vec<u8>) {
    idx.iter().map(|&i| (texts[i], labels[i])).unzip()
}

/// Fit the trade model on a stratified training split and report held-out and
/// cross-validated accuracy. Model-labelled records are left out unless
/// `train_on_model_labels` is set.
pub fn train(records: &[TradeRecord], config: &RewardConfig) -> Result<TradeModel, RewardError> {
    let total = records.len();
    let records: Vec<&TradeRecord> = records
        .iter()
        .filter(|r| config.train_on_model_labels || r.label_source == LabelSource::Human)
        .collect();
    let excluded = total - records.len();
    if excluded > 0 {
        info!(excluded, "Excluding model-labelled trades from training");
    }
    if records.len() < 2 {
        return Err(RewardError::InsufficientData(format!(
            "need at least 2 labelled trades, found {}",
            records.len()
        )));
    }

    let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
    let labels: Vec<u8> = records.iter().map(|r| u8::from(r.is_accepted())).collect();

    let [rejected, accepted] = class_indices(&labels);
    if accepted.is_empty() {
        return Err(RewardError::SingleClass(0));
    }
    if rejected.is_empty() {
        return Err(RewardError::SingleClass(1));
    }

    let (train_idx, test_idx) = stratified_split(&labels, config.test_size, config.seed);
    if test_idx.is_empty() {
        return Err(RewardError::InsufficientData(format!(
            "test split of {} leaves no held-out samples from {} records",
            config.test_size,
            records.len()
        )));
    }

    let (train_texts, train_labels) = select(&texts, &labels, &train_idx);
    let (test_texts, test_labels) = select(&texts, &labels, &test_idx);

    let (vectorizer, classifier) = fit(&train_texts, &train_labels, config);
    let test_accuracy = accuracy(&vectorizer, &classifier, &test_texts, &test_labels);

    let smallest_class = accepted.len().min(rejected.len());
    let cv_folds = config.cv_folds.min(smallest_class);
    let cv_mean_accuracy = if cv_folds >= 2 {
        Some(cross_validate(&texts, &labels, cv_folds, config))
    } else {
        warn!(
            smallest_class,
            "Skipping cross-validation: too few samples in the smallest class"
        );
        None
    };

    info!(
        samples = records.len(),
        train = train_idx.len(),
        test = test_idx.len(),
        features = vectorizer.n_features(),
        iterations = classifier.n_iter,
        test_accuracy,
        cv_mean_accuracy,
        "Trained trade model"
    );

    let metadata = ModelMetadata {
        trained_at: Utc::now(),
        n_samples: records.len(),
        n_train: train_idx.len(),
        n_test: test_idx.len(),
        n_features: vectorizer.n_features(),
        test_accuracy,
        cv_mean_accuracy,
        cv_folds: if cv_mean_accuracy.is_some() { cv_folds } else { 0 },
    };

    Ok(TradeModel {
        vectorizer,
        classifier,
        metadata,
    })
}

fn cross_validate(texts: &[&str], labels: &[u8], k: usize, config: &RewardConfig) -> f64 {
    let folds = stratified_folds(labels, k, config.seed);
    let mut total = 0.0;

    for fold in &folds {
        let train_idx: Vec<usize> = (0..texts.len())
            .filter(|i| fold.binary_search(i).is_err())
            .collect();
        let (train_texts, train_labels) = select(texts, labels, &train_idx);
        let (test_texts, test_labels) = select(texts, labels, fold);

        let (vectorizer, classifier) = fit(&train_texts, &train_labels, config);
        total += accuracy(&vectorizer, &classifier, &test_texts, &test_labels);
    }

    total / folds.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn record(text: &str, label: u8) -> TradeRecord {
        TradeRecord {
            timestamp: NaiveDateTime::parse_from_str("2024-01-01 00:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
            text: text.to_string(),
            label,
            ai_decision: None,
            label_source: LabelSource::Human,
        }
    }

    #[test]
    fn split_is_stratified_and_seeded() {
        let labels: Vec<u8> = (0..40).map(|i| u8::from(i % 2 == 0)).collect();
        let (train, test) = stratified_split(&labels, 0.2, 42);
        assert_eq!(train.len(), 32);
        assert_eq!(test.len(), 8);
        assert_eq!(test.iter().filter(|&&i| labels[i] == 1).count(), 4);

        let again = stratified_split(&labels, 0.2, 42);
        assert_eq!(again, (train, test));
    }

    #[test]
    fn folds_cover_every_sample_once() {
        let labels: Vec<u8> = (0..23).map(|i| u8::from(i % 3 == 0)).collect();
        let folds = stratified_folds(&labels, 5, 42);
        let mut all: Vec<usize> = folds.concat();
        all.sort_unstable();
        assert_eq!(all, (0..23).collect::<Vec<_>>());
    }

    #[test]
    fn rejects_single_class() {
        let records = vec![record("a trade", 1), record("another trade", 1)];
        let err = train(&records, &RewardConfig::default()).unwrap_err();
        assert!(matches!(err, RewardError::SingleClass(1)));
    }

    #[test]
    fn rejects_tiny_corpus() {
        let err = train(&[record("only one", 1)], &RewardConfig::default()).unwrap_err();
        assert!(matches!(err, RewardError::InsufficientData(_)));
    }

    #[test]
    fn folds_capped_by_smallest_class() {
        let records = vec![
            record("favorable salary implications guard", 1),
            record("favorable salary implications wing", 1),
            record("over salary cap center", 0),
            record("over salary cap forward", 0),
            record("favorable salary implications bench", 1),
        ];
        let config = RewardConfig {
            test_size: 0.5,
            ..RewardConfig::default()
        };
        let model = train(&records, &config).unwrap();
        assert_eq!(model.metadata.n_samples, 5);
        assert!(model.metadata.cv_mean_accuracy.is_some());
        assert_eq!(model.metadata.cv_folds, 2);
    }

    #[test]
    fn model_labels_excluded_by_default() {
        let mut records = vec![
            record("favorable salary implications guard", 1),
            record("over salary cap center", 0),
        ];
        for text in ["auto accepted wing", "auto accepted forward", "auto rejected bench"] {
            let mut r = record(text, u8::from(text.contains("accepted")));
            r.label_source = LabelSource::Model;
            records.push(r);
        }
        let config = RewardConfig {
            test_size: 0.5,
            ..RewardConfig::default()
        };
        let err = train(&records, &config).unwrap_err();
        assert!(matches!(err, RewardError::InsufficientData(_)));

        let config = RewardConfig {
            train_on_model_labels: true,
            ..config
        };
        let model = train(&records, &config).unwrap();
        assert_eq!(model.metadata.n_samples, 5);
    }

    #[test]
    fn singleton_class_skips_cross_validation() {
        let records = vec![
            record("favorable salary implications guard", 1),
            record("favorable salary implications wing", 1),
            record("over salary cap center", 0),
        ];
        let config = RewardConfig {
            test_size: 0.5,
            ..RewardConfig::default()
        };
        let model = train(&records, &config).unwrap();
        assert!(model.metadata.cv_mean_accuracy.is_none());
        assert_eq!(model.metadata.cv_folds, 0);
    }
}
