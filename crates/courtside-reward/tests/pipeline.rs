//! End-to-end trade evaluation: feedback log -> training -> artifact -> scoring.

use std::time::Duration;

use chrono::NaiveDateTime;
use courtside_models::{Feedback, RewardConfig, Verdict};
use courtside_reward::feedback::TIMESTAMP_FORMAT;
use courtside_reward::{parse_records, train, FeedbackLog, TradeModel, TradeScorer, TradeScoring};

const POSITIONS: [&str; 5] = ["PG", "SG", "SF", "PF", "C"];

fn ts(i: usize) -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2024-02-01 09:00:00", TIMESTAMP_FORMAT).unwrap()
        + chrono::Duration::seconds(i as i64)
}

fn favorable(i: usize) -> String {
    format!(
        "Receive: {} rated {} OVR\nGive: bench depth\nSalary implications: favorable",
        POSITIONS[i % 5],
        70 + i % 10
    )
}

fn over_cap(i: usize) -> String {
    format!(
        "Receive: {} rated {} OVR\nGive: starter\nPushes roster over salary cap",
        POSITIONS[i % 5],
        70 + i % 10
    )
}

fn seeded_log(dir: &std::path::Path) -> FeedbackLog {
    let log = FeedbackLog::new(dir.join("trade_feedback.txt"));
    for i in 0..20 {
        log.append_at(ts(2 * i), &favorable(i), Verdict::Accept, Some(Feedback::Yes))
            .unwrap();
        log.append_at(ts(2 * i + 1), &over_cap(i), Verdict::Reject, Some(Feedback::No))
            .unwrap();
    }
    log
}

#[test]
fn extraction_counts_blocks_and_positive_labels() {
    let dir = tempfile::tempdir().unwrap();
    let log = FeedbackLog::new(dir.path().join("log.txt"));
    let feedback = [
        Some(Feedback::Yes),
        Some(Feedback::No),
        Some(Feedback::Yes),
        None,
        Some(Feedback::Skip),
        Some(Feedback::Yes),
    ];
    for (i, fb) in feedback.iter().enumerate() {
        log.append_at(ts(i), &favorable(i), Verdict::Accept, *fb).unwrap();
    }

    let content = std::fs::read_to_string(log.path()).unwrap();
    let records = parse_records(&content);
    assert_eq!(records.len(), 6);
    assert_eq!(records.iter().filter(|r| r.label == 1).count(), 3);
}

#[test]
fn separable_corpus_is_learned() {
    let dir = tempfile::tempdir().unwrap();
    let records = seeded_log(dir.path()).load().unwrap();
    assert_eq!(records.len(), 40);

    let model = train(&records, &RewardConfig::default()).unwrap();
    assert_eq!(model.metadata.n_test, 8);
    assert!(
        model.metadata.test_accuracy >= 0.9,
        "held-out accuracy {}",
        model.metadata.test_accuracy
    );
    assert_eq!(model.metadata.cv_folds, 5);
    assert!(model.metadata.cv_mean_accuracy.unwrap() >= 0.9);

    let unseen = "Receive: wing rated 88 OVR\nGive: bench depth\nSalary implications: favorable";
    assert!(model.predict_proba(unseen) > 0.5);
    let unseen_bad = "Receive: wing rated 60 OVR\nGive: starter\nPushes roster over salary cap";
    assert!(model.predict_proba(unseen_bad) < 0.5);
}

#[tokio::test]
async fn saved_model_scores_deterministically() {
    let dir = tempfile::tempdir().unwrap();
    let config = RewardConfig {
        model_path: dir.path().join("reward_model.json").display().to_string(),
        ..RewardConfig::default()
    };
    let log = seeded_log(dir.path());
    let scorer = TradeScorer::from_config(&config);

    let trained = scorer.retrain(&log, &config).await.unwrap();
    let reloaded = TradeModel::load(scorer.model_path()).unwrap();
    assert_eq!(trained.vectorizer.vocabulary(), reloaded.vectorizer.vocabulary());
    assert_eq!(trained.metadata.n_samples, reloaded.metadata.n_samples);

    let text = favorable(3);
    let first = scorer.score(&text).await;
    let second = scorer.score(&text).await;
    assert_eq!(first, second);
    assert_eq!(first.recommendation, Verdict::Accept);

    let p = first.probability.unwrap();
    assert!((first.confidence - (p - 0.5).abs() * 2.0).abs() < 1e-12);
}

#[tokio::test]
async fn retraining_replaces_cached_model() {
    let dir = tempfile::tempdir().unwrap();
    let config = RewardConfig {
        model_path: dir.path().join("model.json").display().to_string(),
        ..RewardConfig::default()
    };
    let scorer = TradeScorer::new(&config.model_path, 4, Duration::from_secs(600));
    let log = seeded_log(dir.path());

    scorer.retrain(&log, &config).await.unwrap();
    let before = scorer.load_model().await.unwrap();

    log.append(&favorable(7), Verdict::Accept, Some(Feedback::Yes))
        .unwrap();
    scorer.retrain(&log, &config).await.unwrap();
    let after = scorer.load_model().await.unwrap();

    assert_eq!(before.metadata.n_samples, 40);
    assert_eq!(after.metadata.n_samples, 41);
}
