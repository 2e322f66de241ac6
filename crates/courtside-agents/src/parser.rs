use std::collections::BTreeMap;
use std::str::FromStr;

use courtside_models::{Decision, DecisionPayload, DecisionType, ToolCall};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::warn;

use crate::error::AgentError;

/// Extract the first JSON object from a string that may contain surrounding text.
///
/// Handles common model response formats:
/// - Clean JSON: `{"key": "value"}`
/// - Markdown-wrapped: ```json\n{"key": "value"}\n```
/// - Prefix text: `Here is my recommendation:\n{"key": "value"}`
pub fn extract_json(text: &str) -> Result<String, AgentError> {
    let trimmed = text.trim();

    if trimmed.starts_with('{') && serde_json::from_str::<Value>(trimmed).is_ok() {
        return Ok(trimmed.to_string());
    }

    if let Some(json_str) = extract_from_markdown_block(trimmed) {
        if serde_json::from_str::<Value>(&json_str).is_ok() {
            return Ok(json_str);
        }
    }

    if let Some(json_str) = extract_first_object(trimmed) {
        if serde_json::from_str::<Value>(&json_str).is_ok() {
            return Ok(json_str);
        }
    }

    Err(AgentError::Parse(format!(
        "No valid JSON object found in response (length={})",
        text.len()
    )))
}

fn extract_from_markdown_block(text: &str) -> Option<String> {
    let start_markers = ["```json\n", "```json\r\n", "```\n", "```\r\n"];

    for marker in &start_markers {
        if let Some(start) = text.find(marker) {
            let json_start = start + marker.len();
            if let Some(end) = text[json_start..].find("```") {
                return Some(text[json_start..json_start + end].trim().to_string());
            }
        }
    }

    None
}

/// Find the first balanced `{ ... }`, ignoring braces inside strings.
fn extract_first_object(text: &str) -> Option<String> {
    let mut depth = 0;
    let mut start = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if !in_string && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start {
                        return Some(text[s..=i].to_string());
                    }
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse a decimal that may arrive as a JSON number or a string.
fn parse_confidence(value: &Value) -> Result<Decimal, AgentError> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        other => {
            return Err(AgentError::Parse(format!(
                "confidence must be a number, got {other}"
            )))
        }
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|e| AgentError::Parse(format!("confidence {raw:?}: {e}")))
}

fn required_text(json: &Value, field: &str) -> Result<String, AgentError> {
    json.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AgentError::Parse(format!("Missing field: {field}")))
}

/// Read a list of strings, rendering non-string items as compact JSON.
fn string_list(json: &Value, field: &str) -> Vec<String> {
    json.get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn tool_calls(json: &Value) -> Vec<ToolCall> {
    let Some(items) = json.get("tool_calls").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<ToolCall>(item.clone()) {
            Ok(call) => Some(call),
            Err(e) => {
                warn!(error = %e, call = %item, "Ignoring malformed tool call");
                None
            }
        })
        .collect()
}

fn payload(json: &Value, decision_type: DecisionType) -> DecisionPayload {
    match decision_type {
        DecisionType::Trade => DecisionPayload::Trade {
            priority_targets: string_list(json, "priority_targets"),
        },
        DecisionType::Draft => DecisionPayload::Draft {
            target_positions: string_list(json, "target_positions"),
        },
        DecisionType::FreeAgency => DecisionPayload::FreeAgency {
            budget_allocation: json
                .get("budget_allocation")
                .and_then(Value::as_object)
                .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_else(BTreeMap::new),
        },
        DecisionType::Lineup => DecisionPayload::Lineup {
            starting_five: string_list(json, "starting_five"),
        },
    }
}

/// Parse a specialist reply into a validated [`Decision`].
///
/// `recommendation`, `reasoning` and `confidence` are required; confidence
/// must lie in [0, 1]. Type-specific and list fields are optional.
pub fn parse_decision(raw: &str, decision_type: DecisionType) -> Result<Decision, AgentError> {
    let json_str = extract_json(raw)?;
    let json: Value = serde_json::from_str(&json_str)
        .map_err(|e| AgentError::Parse(format!("Decision JSON parse error: {e}")))?;

    let recommendation = required_text(&json, "recommendation")?;
    let reasoning = required_text(&json, "reasoning")?;
    let confidence = json
        .get("confidence")
        .ok_or_else(|| AgentError::Parse("Missing field: confidence".to_string()))
        .and_then(parse_confidence)?;

    let mut decision = Decision::new(
        decision_type,
        recommendation,
        reasoning,
        confidence,
        payload(&json, decision_type),
    )
    .map_err(|e| AgentError::Parse(e.to_string()))?;

    decision.alternatives = string_list(&json, "alternatives");
    decision.next_steps = string_list(&json, "next_steps");
    decision.tool_calls = tool_calls(&json);
    Ok(decision)
}
