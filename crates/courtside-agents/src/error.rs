use thiserror::Error;

use crate::page::PageError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Claude CLI error: {0}")]
    Cli(String),

    #[error("Anthropic API error: {0}")]
    Http(String),

    #[error("Agent response parse error: {0}")]
    Parse(String),

    #[error("Agent timed out after {0} seconds")]
    Timeout(u64),

    #[error("Unsupported by this model backend: {0}")]
    Unsupported(String),

    #[error("Page error: {0}")]
    Page(#[from] PageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for AgentError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AgentError::Http(format!("request timed out: {e}"))
        } else {
            AgentError::Http(e.to_string())
        }
    }
}
