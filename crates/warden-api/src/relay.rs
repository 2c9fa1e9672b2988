//! Client for the upstream chat-completion API.
//!
//! Speaks the OpenAI-compatible `POST {base_url}/chat/completions` protocol.
//! Only prompts that have already been screened reach this module.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

fn default_model() -> String { "gpt-4o-mini".into() }

fn default_timeout_secs() -> u64 { 30 }

/// Upstream connection settings, the `[relay]` table of `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
  /// e.g. `https://api.openai.com/v1`
  pub base_url:      String,
  #[serde(default)]
  pub api_key:       String,
  #[serde(default = "default_model")]
  pub model:         String,
  /// Prepended as a `system` message when set.
  #[serde(default)]
  pub system_prompt: Option<String>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:  u64,
}

#[derive(Debug, Error)]
pub enum RelayError {
  #[error("failed to build HTTP client: {0}")]
  Client(#[source] reqwest::Error),

  #[error("chat service did not answer within {0}s")]
  Timeout(u64),

  #[error("chat service request failed: {0}")]
  Request(#[source] reqwest::Error),

  #[error("chat service returned {status}: {body}")]
  Status { status: u16, body: String },

  #[error("chat service returned no content")]
  EmptyReply,
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct CompletionRequest<'a> {
  model:    &'a str,
  messages: Vec<WireMessage<'a>>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
  role:    &'static str,
  content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
  #[serde(default)]
  choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
  message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
  content: Option<String>,
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Async client for the upstream chat API.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ChatRelay {
  client: Client,
  config: RelayConfig,
}

impl ChatRelay {
  pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(RelayError::Client)?;
    Ok(Self { client, config })
  }

  fn url(&self) -> String {
    format!(
      "{}/chat/completions",
      self.config.base_url.trim_end_matches('/')
    )
  }

  fn map_send_error(&self, e: reqwest::Error) -> RelayError {
    if e.is_timeout() {
      RelayError::Timeout(self.config.timeout_secs)
    } else {
      RelayError::Request(e)
    }
  }

  /// Send `prompt` upstream and return the assistant's reply.
  pub async fn complete(&self, prompt: &str) -> Result<String, RelayError> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &self.config.system_prompt {
      messages.push(WireMessage {
        role:    "system",
        content: system,
      });
    }
    messages.push(WireMessage {
      role:    "user",
      content: prompt,
    });

    let mut req = self.client.post(self.url()).json(&CompletionRequest {
      model: &self.config.model,
      messages,
    });
    if !self.config.api_key.is_empty() {
      req = req.bearer_auth(&self.config.api_key);
    }

    let resp = req.send().await.map_err(|e| self.map_send_error(e))?;

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      warn!(%status, "chat service rejected request");
      return Err(RelayError::Status {
        status: status.as_u16(),
        body,
      });
    }

    let completion: CompletionResponse =
      resp.json().await.map_err(|e| self.map_send_error(e))?;
    completion
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .filter(|c| !c.trim().is_empty())
      .ok_or(RelayError::EmptyReply)
  }
}
