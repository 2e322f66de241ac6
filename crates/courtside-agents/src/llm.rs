use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::AgentError;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// A text-completion backend. Mockable for testing.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, AgentError>;

    /// Complete with an attached image (PNG or JPEG bytes).
    async fn complete_with_image(
        &self,
        system: &str,
        prompt: &str,
        image: &[u8],
    ) -> Result<String, AgentError>;
}

/// Configuration for a Claude CLI invocation.
#[derive(Debug, Clone)]
pub struct ClaudeCliConfig {
    pub model: String,
    pub timeout: Duration,
    /// Executable to spawn.
    pub program: String,
}

impl Default for ClaudeCliConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5-20250929".to_string(),
            timeout: Duration::from_secs(60),
            program: "claude".to_string(),
        }
    }
}

/// Language model backed by the `claude` CLI. Text only.
#[derive(Debug, Clone, Default)]
pub struct ClaudeCli {
    pub config: ClaudeCliConfig,
}

impl ClaudeCli {
    pub fn new(model: String, timeout: Duration) -> Self {
        Self {
            config: ClaudeCliConfig {
                model,
                timeout,
                ..ClaudeCliConfig::default()
            },
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.config.program = program.into();
        self
    }

    /// Check if the `claude` CLI is available on the system.
    pub async fn is_available() -> bool {
        match Command::new("claude").arg("--version").output().await {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl LanguageModel for ClaudeCli {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, AgentError> {
        debug!(model = %self.config.model, "Invoking claude CLI");

        // The child is killed if the timeout drops the pending output.
        let output = tokio::time::timeout(self.config.timeout, async {
            Command::new(&self.config.program)
                .kill_on_drop(true)
                .args([
                    "-p",
                    prompt,
                    "--system-prompt",
                    system,
                    "--model",
                    &self.config.model,
                    "--output-format",
                    "text",
                ])
                .output()
                .await
        })
        .await
        .map_err(|_| AgentError::Timeout(self.config.timeout.as_secs()))?
        .map_err(|e| AgentError::Cli(format!("Failed to spawn claude: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, stderr = %stderr, "Claude CLI failed");
            return Err(AgentError::Cli(format!(
                "claude exited {}: {}",
                output.status, stderr
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if stdout.trim().is_empty() {
            return Err(AgentError::Cli("Claude returned empty response".to_string()));
        }
        debug!(len = stdout.len(), "Claude CLI responded");
        Ok(stdout)
    }

    async fn complete_with_image(
        &self,
        _system: &str,
        _prompt: &str,
        _image: &[u8],
    ) -> Result<String, AgentError> {
        Err(AgentError::Unsupported(
            "claude CLI backend cannot attach images; use the api backend".to_string(),
        ))
    }
}

/// Language model backed by the Anthropic Messages API.
pub struct AnthropicApi {
    http: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl AnthropicApi {
    pub fn new(api_key: String, model: String, max_tokens: u32, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: ANTHROPIC_API_URL.to_string(),
            api_key,
            model,
            max_tokens,
            timeout,
        }
    }

    /// Read the API key from `env_var`.
    pub fn from_env(
        env_var: &str,
        model: String,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, AgentError> {
        let api_key = std::env::var(env_var)
            .map_err(|_| AgentError::Http(format!("{env_var} is not set")))?;
        Ok(Self::new(api_key, model, max_tokens, timeout))
    }

    /// Send requests to `url` instead of the public endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    async fn send(&self, system: &str, content: Value) -> Result<String, AgentError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": system,
            "messages": [{ "role": "user", "content": content }]
        });

        debug!(model = %self.model, "Calling Anthropic Messages API");
        let request = self
            .http
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body);

        // One deadline covers both the headers and the body.
        let (status, payload) = tokio::time::timeout(self.timeout, async {
            let response = request.send().await?;
            let status = response.status();
            let payload: Value = response.json().await?;
            Ok::<_, reqwest::Error>((status, payload))
        })
        .await
        .map_err(|_| AgentError::Timeout(self.timeout.as_secs()))??;

        if !status.is_success() {
            let message = payload
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            warn!(%status, message, "Anthropic API request failed");
            return Err(AgentError::Http(format!("{status}: {message}")));
        }

        response_text(&payload)
    }
}

/// Concatenate the text blocks of a Messages API response.
fn response_text(payload: &Value) -> Result<String, AgentError> {
    let text: String = payload
        .get("content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AgentError::Http("response contained no text".to_string()));
    }
    Ok(text)
}

fn image_media_type(image: &[u8]) -> &'static str {
    if image.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else {
        "image/png"
    }
}

#[async_trait]
impl LanguageModel for AnthropicApi {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, AgentError> {
        self.send(system, Value::String(prompt.to_string())).await
    }

    async fn complete_with_image(
        &self,
        system: &str,
        prompt: &str,
        image: &[u8],
    ) -> Result<String, AgentError> {
        let content = serde_json::json!([
            {
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": image_media_type(image),
                    "data": BASE64.encode(image),
                }
            },
            { "type": "text", "text": prompt }
        ]);
        self.send(system, content).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cli_config() {
        let config = ClaudeCliConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn cli_rejects_images() {
        let cli = ClaudeCli::default();
        let err = cli.complete_with_image("s", "p", &[1, 2, 3]).await.unwrap_err();
        assert!(matches!(err, AgentError::Unsupported(_)));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn cli_timeout_kills_child() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let script = dir.path().join("slow-claude");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho $$ > {}\nexec sleep 30\n", pid_file.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let cli = ClaudeCli::new("m".to_string(), Duration::from_secs(1))
            .with_program(script.to_string_lossy());
        let err = cli.complete("s", "p").await.unwrap_err();
        assert!(matches!(err, AgentError::Timeout(_)));

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let stat = format!("/proc/{}/stat", pid.trim());
        let mut alive = true;
        for _ in 0..40 {
            alive = match std::fs::read_to_string(&stat) {
                // Field 3 is the state; a zombie has already been killed.
                Ok(s) => !s.rsplit(") ").next().unwrap_or("").starts_with('Z'),
                Err(_) => false,
            };
            if !alive {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(!alive, "claude child outlived its timeout");
    }

    #[tokio::test]
    async fn api_timeout_covers_body() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            // Promise a body that never arrives.
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 1000\r\n\r\n{\"content\":")
                .await;
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let mut api = AnthropicApi::new(
            "key".to_string(),
            "m".to_string(),
            16,
            Duration::from_millis(300),
        )
        .with_url(format!("http://{addr}/v1/messages"));
        api.http = reqwest::Client::builder().no_proxy().build().unwrap();
        let started = std::time::Instant::now();
        let err = api.complete("s", "p").await.unwrap_err();
        assert!(matches!(err, AgentError::Timeout(_)), "{err:?}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn concatenates_text_blocks() {
        let payload = serde_json::json!({
            "content": [
                {"type": "text", "text": "{\"a\":"},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": " 1}"}
            ]
        });
        assert_eq!(response_text(&payload).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn empty_response_is_error() {
        let payload = serde_json::json!({"content": []});
        assert!(response_text(&payload).is_err());
    }

    #[test]
    fn detects_jpeg() {
        assert_eq!(image_media_type(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(image_media_type(&[0x89, b'P', b'N', b'G']), "image/png");
    }

    #[test]
    fn missing_api_key_env() {
        let result = AnthropicApi::from_env(
            "COURTSIDE_TEST_KEY_THAT_IS_NOT_SET",
            "m".to_string(),
            16,
            Duration::from_secs(1),
        );
        assert!(result.is_err());
    }
}
