use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use courtside_models::{Feedback, LabelSource, TradeRecord, Verdict};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

use crate::error::RewardError;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const AI_DECISION_MARKER: &str = "AI Decision";
const SEPARATOR_WIDTH: usize = 50;

lazy_static! {
    static ref BLOCK_HEADER: Regex =
        Regex::new(r"(?m)^=== Trade Evaluation (.+?) ===[ \t]*$").expect("valid header regex");
    static ref FEEDBACK_YES: Regex =
        Regex::new(r"(?i)User Feedback:[ \t]*yes\b").expect("valid feedback regex");
    static ref AI_DECISION: Regex =
        Regex::new(r"(?i)AI Decision:[ \t]*(ACCEPT|REJECT)\b").expect("valid decision regex");
    static ref MODEL_LABEL: Regex =
        Regex::new(r"(?im)^Label Source:[ \t]*model\b").expect("valid label source regex");
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_utc()))
}

/// Drop trailing lines made only of `=`; they are block separators, not text.
fn strip_separators(text: &str) -> &str {
    let mut end = text.trim_end();
    while let Some(pos) = end.rfind('\n') {
        let last = end[pos + 1..].trim();
        if !last.is_empty() && last.chars().all(|c| c == '=') {
            end = end[..pos].trim_end();
        } else {
            break;
        }
    }
    let last = end.trim();
    if !last.is_empty() && last.chars().all(|c| c == '=') {
        return "";
    }
    end
}

fn parse_block(timestamp: &str, body: &str) -> Option<TradeRecord> {
    let Some(timestamp) = parse_timestamp(timestamp) else {
        debug!(timestamp, "Skipping trade block with unparseable timestamp");
        return None;
    };

    let before_decision = body.split(AI_DECISION_MARKER).next().unwrap_or_default();
    let text = strip_separators(before_decision.trim()).trim();
    if text.is_empty() {
        debug!(%timestamp, "Skipping trade block with empty text");
        return None;
    }

    let label = u8::from(FEEDBACK_YES.is_match(body));
    let ai_decision = AI_DECISION
        .captures(body)
        .and_then(|caps| caps[1].parse::<Verdict>().ok());
    let label_source = if MODEL_LABEL.is_match(body) {
        LabelSource::Model
    } else {
        LabelSource::Human
    };

    Some(TradeRecord {
        timestamp,
        text: text.to_string(),
        label,
        ai_decision,
        label_source,
    })
}

/// Extract every well-formed trade block from feedback log content.
///
/// A block runs from its `=== Trade Evaluation <timestamp> ===` header to the
/// next header. The record text is everything before the `AI Decision` marker;
/// the label is 1 only when the block carries `User Feedback: yes`. CRLF line
/// endings are accepted.
pub fn parse_records(content: &str) -> Vec<TradeRecord> {
    let content = content.replace("\r\n", "\n");
    let content = content.as_str();
    let headers: Vec<_> = BLOCK_HEADER.captures_iter(content).collect();
    let mut records = Vec::with_capacity(headers.len());

    for (i, caps) in headers.iter().enumerate() {
        let Some(header) = caps.get(0) else { continue };
        let body_end = headers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(content.len());
        let body = &content[header.end()..body_end];

        if let Some(record) = parse_block(&caps[1], body) {
            records.push(record);
        }
    }

    records
}

/// Render one block in the on-disk feedback log format. Model-sourced labels
/// carry a `Label Source: model` line so training can tell them apart.
pub fn format_block(
    timestamp: NaiveDateTime,
    trade_info: &str,
    ai_decision: Verdict,
    feedback: Option<Feedback>,
    label_source: LabelSource,
) -> String {
    let mut block = format!(
        "\n=== Trade Evaluation {} ===\nTrade Information:\n{}\nAI Decision: {}\n",
        timestamp.format(TIMESTAMP_FORMAT),
        trade_info.trim(),
        ai_decision,
    );
    if let Some(feedback) = feedback {
        block.push_str(&format!("User Feedback: {}\n", feedback.as_str()));
    }
    if label_source == LabelSource::Model {
        block.push_str(&format!("Label Source: {}\n", label_source.as_str()));
    }
    block.push_str(&"=".repeat(SEPARATOR_WIDTH));
    block.push('\n');
    block
}

/// Append-only trade feedback log on disk.
#[derive(Debug, Clone)]
pub struct FeedbackLog {
    path: PathBuf,
}

impl FeedbackLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse all records. A missing log is an empty log.
    pub fn load(&self) -> Result<Vec<TradeRecord>, RewardError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let records = parse_records(&content);
        info!(
            path = %self.path.display(),
            records = records.len(),
            accepted = records.iter().filter(|r| r.is_accepted()).count(),
            "Loaded trade feedback"
        );
        Ok(records)
    }

    /// Append one evaluated trade, stamped with the current local time.
    pub fn append(
        &self,
        trade_info: &str,
        ai_decision: Verdict,
        feedback: Option<Feedback>,
    ) -> Result<(), RewardError> {
        self.append_at(Local::now().naive_local(), trade_info, ai_decision, feedback)
    }

    pub fn append_at(
        &self,
        timestamp: NaiveDateTime,
        trade_info: &str,
        ai_decision: Verdict,
        feedback: Option<Feedback>,
    ) -> Result<(), RewardError> {
        self.write_block(format_block(
            timestamp,
            trade_info,
            ai_decision,
            feedback,
            LabelSource::Human,
        ))?;
        debug!(path = %self.path.display(), %ai_decision, "Appended trade feedback");
        Ok(())
    }

    /// Append a trade with no human reviewer. The label mirrors the verdict
    /// and is marked as model-sourced.
    pub fn append_model_labelled(
        &self,
        trade_info: &str,
        ai_decision: Verdict,
    ) -> Result<(), RewardError> {
        let feedback = match ai_decision {
            Verdict::Accept => Feedback::Yes,
            Verdict::Reject => Feedback::No,
        };
        self.write_block(format_block(
            Local::now().naive_local(),
            trade_info,
            ai_decision,
            Some(feedback),
            LabelSource::Model,
        ))?;
        debug!(path = %self.path.display(), %ai_decision, "Appended model-labelled trade");
        Ok(())
    }

    fn write_block(&self, block: String) -> Result<(), RewardError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(block.as_bytes())?;
        Ok(())
    }
}
