use std::path::{Path, PathBuf};

use chrono::Utc;
use courtside_models::{Decision, DecisionLogEntry};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::AgentError;

/// Append-only record of every decision produced, executed or not.
///
/// Entries are kept in memory and, when a path is configured, appended to a
/// JSON Lines file.
pub struct DecisionLog {
    path: Option<PathBuf>,
    entries: Mutex<Vec<DecisionLogEntry>>,
}

impl DecisionLog {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn record(
        &self,
        decision: &Decision,
        executed: bool,
        reason: Option<String>,
    ) -> Result<DecisionLogEntry, AgentError> {
        let entry = DecisionLogEntry {
            timestamp: Utc::now(),
            decision: decision.clone(),
            executed,
            reason,
        };

        let mut entries = self.entries.lock().await;
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            let mut line = serde_json::to_string(&entry)?;
            line.push('\n');
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            file.write_all(line.as_bytes()).await?;
            file.flush().await?;
        }
        entries.push(entry.clone());

        debug!(
            decision_type = %decision.decision_type,
            executed,
            "Decision logged"
        );
        Ok(entry)
    }

    pub async fn entries(&self) -> Vec<DecisionLogEntry> {
        self.entries.lock().await.clone()
    }

    /// Read every entry from a JSON Lines decision log.
    pub async fn read_file(path: &Path) -> Result<Vec<DecisionLogEntry>, AgentError> {
        let content = tokio::fs::read_to_string(path).await?;
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(AgentError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtside_models::DecisionType;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn in_memory_keeps_order() {
        let log = DecisionLog::in_memory();
        let a = Decision::fallback(DecisionType::Trade, dec!(0.3));
        let b = Decision::fallback(DecisionType::Draft, dec!(0.3));
        log.record(&a, false, Some("held".into())).await.unwrap();
        log.record(&b, true, None).await.unwrap();

        let entries = log.entries().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].decision.id, a.id);
        assert!(!entries[0].executed);
        assert!(entries[1].executed);
    }

    #[tokio::test]
    async fn appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("decisions.jsonl");

        let first = DecisionLog::with_file(&path);
        first
            .record(&Decision::fallback(DecisionType::Lineup, dec!(0.3)), false, None)
            .await
            .unwrap();

        // A second writer appends rather than truncating.
        let second = DecisionLog::with_file(&path);
        second
            .record(&Decision::fallback(DecisionType::Draft, dec!(0.3)), true, None)
            .await
            .unwrap();

        let entries = DecisionLog::read_file(&path).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].decision.decision_type, DecisionType::Lineup);
        assert_eq!(entries[1].decision.decision_type, DecisionType::Draft);
    }
}
