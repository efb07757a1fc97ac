//! LLM integration for program generation
//!
//! This module handles communication with the Claude API and the
//! validate-or-retry boundary every provider response passes through
//! before the pipeline treats it as a typed value.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::GenerationConfig;
use crate::prompt::Prompt;
use crate::schema::Validate;

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

const CLAUDE_API_BASE: &str = "https://api.anthropic.com/";
pub const CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";
const API_VERSION: &str = "2023-06-01";

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug, Serialize)]
pub enum LlmError {
  #[error("API key not configured")]
  MissingApiKey,

  #[error("Invalid provider configuration: {0}")]
  Config(String),

  #[error("Request failed: {0}")]
  Request(String),

  #[error("API error: {0}")]
  Api(String),

  #[error("Parse error: {0}")]
  Parse(String),

  #[error("Schema validation failed: {}", .0.join("; "))]
  Validation(Vec<String>),

  #[error("Call timed out after {0:?}")]
  Timeout(Duration),

  #[error("Gave up after {attempts} attempts: {last}")]
  RetriesExhausted { attempts: u32, last: Box<LlmError> },

  #[error("Attempt {attempts} failed: {last}")]
  Aborted { attempts: u32, last: Box<LlmError> },
}

impl LlmError {
  /// Configuration problems will not fix themselves on a second attempt
  pub fn is_retryable(&self) -> bool {
    !matches!(
      self,
      LlmError::MissingApiKey
        | LlmError::Config(_)
        | LlmError::RetriesExhausted { .. }
        | LlmError::Aborted { .. }
    )
  }

  /// Provider calls spent before this error surfaced
  pub fn attempts(&self) -> u32 {
    match self {
      LlmError::RetriesExhausted { attempts, .. } | LlmError::Aborted { attempts, .. } => {
        *attempts
      }
      _ => 1,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Provider Abstraction
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
  pub input_tokens: u32,
  pub output_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct Completion {
  pub text: String,
  pub usage: Option<Usage>,
}

impl Completion {
  pub fn text(text: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      usage: None,
    }
  }
}

/// Opaque text-completion provider
#[async_trait]
pub trait LlmProvider: Send + Sync {
  async fn complete(&self, prompt: &Prompt) -> Result<Completion, LlmError>;

  /// Recorded on generated programs as `ai_model_version`
  fn model_version(&self) -> String;
}

/// ---------------------------------------------------------------------------
/// Claude API Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ClaudeRequest {
  model: String,
  max_tokens: u32,
  system: String,
  messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
  role: String,
  content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
  content: Vec<ContentBlock>,
  #[allow(dead_code)]
  model: String,
  stop_reason: Option<String>,
  usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
  #[serde(rename = "type")]
  content_type: String,
  text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorResponse {
  error: ClaudeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorDetail {
  message: String,
}

/// ---------------------------------------------------------------------------
/// Claude Client
/// ---------------------------------------------------------------------------

pub struct ClaudeClient {
  client: Client,
  api_key: String,
  endpoint: Url,
  model: String,
}

impl ClaudeClient {
  pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
    let base = Url::parse(CLAUDE_API_BASE).map_err(|e| LlmError::Config(e.to_string()))?;
    Self::with_base_url(api_key, model, base)
  }

  /// Point the client at a different host (proxies, test servers)
  pub fn with_base_url(
    api_key: impl Into<String>,
    model: impl Into<String>,
    base: Url,
  ) -> Result<Self, LlmError> {
    let endpoint = base
      .join("v1/messages")
      .map_err(|e| LlmError::Config(e.to_string()))?;

    Ok(Self {
      client: Client::new(),
      api_key: api_key.into(),
      endpoint,
      model: model.into(),
    })
  }

  /// Create a client from `ANTHROPIC_API_KEY` and optional `ANTHROPIC_API_URL`
  pub fn from_env(model: &str) -> Result<Self, LlmError> {
    let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| LlmError::MissingApiKey)?;

    match std::env::var("ANTHROPIC_API_URL") {
      Ok(raw) => {
        let base = Url::parse(&raw).map_err(|e| LlmError::Config(format!("{}: {}", raw, e)))?;
        Self::with_base_url(api_key, model, base)
      }
      Err(_) => Self::new(api_key, model),
    }
  }

  /// Create a client for the configured model, credentials from the environment
  pub fn from_config(config: &GenerationConfig) -> Result<Self, LlmError> {
    Self::from_env(&config.model)
  }

  pub fn endpoint(&self) -> &Url {
    &self.endpoint
  }
}

#[async_trait]
impl LlmProvider for ClaudeClient {
  async fn complete(&self, prompt: &Prompt) -> Result<Completion, LlmError> {
    let request = ClaudeRequest {
      model: self.model.clone(),
      max_tokens: prompt.max_tokens,
      system: prompt.system.clone(),
      messages: vec![ClaudeMessage {
        role: "user".to_string(),
        content: prompt.user.clone(),
      }],
    };

    let response = self
      .client
      .post(self.endpoint.clone())
      .header("x-api-key", &self.api_key)
      .header("anthropic-version", API_VERSION)
      .header("content-type", "application/json")
      .json(&request)
      .send()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    if !status.is_success() {
      if let Ok(error_resp) = serde_json::from_str::<ClaudeErrorResponse>(&body) {
        return Err(LlmError::Api(error_resp.error.message));
      }
      return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
    }

    let claude_response: ClaudeResponse =
      serde_json::from_str(&body).map_err(|e| LlmError::Parse(e.to_string()))?;

    if claude_response.stop_reason.as_deref() == Some("max_tokens") {
      debug!(step = %prompt.step, "Response hit max_tokens, JSON may be truncated");
    }

    let text = claude_response
      .content
      .iter()
      .find(|c| c.content_type == "text")
      .and_then(|c| c.text.clone())
      .ok_or_else(|| LlmError::Parse("No text content in response".to_string()))?;

    Ok(Completion {
      text,
      usage: Some(claude_response.usage),
    })
  }

  fn model_version(&self) -> String {
    self.model.clone()
  }
}

/// ---------------------------------------------------------------------------
/// Validated Generation
/// ---------------------------------------------------------------------------

/// Counters for one logical generation call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CallStats {
  pub llm_calls: u32,
  pub retries: u32,
}

impl CallStats {
  pub fn absorb(&mut self, other: CallStats) {
    self.llm_calls += other.llm_calls;
    self.retries += other.retries;
  }

  /// Stats for a call that used `attempts` attempts
  pub fn from_attempts(attempts: u32) -> Self {
    Self {
      llm_calls: attempts,
      retries: attempts.saturating_sub(1),
    }
  }
}

#[derive(Debug, Clone)]
pub struct Generated<T> {
  pub value: T,
  pub stats: CallStats,
}

/// Decode a provider response into `T` and run its boundary checks
pub fn parse_validated<T>(text: &str) -> Result<T, LlmError>
where
  T: DeserializeOwned + Validate,
{
  let json_str = extract_json(text)?;
  let value: T = serde_json::from_str(&json_str)
    .map_err(|e| LlmError::Parse(format!("{}: {}", e, truncate(&json_str, 200))))?;

  let errors = value.validate();
  if errors.is_empty() {
    Ok(value)
  } else {
    Err(LlmError::Validation(errors))
  }
}

/// Call the provider until the response validates as `T`
///
/// Makes at most `max(max_retries, 1)` attempts. Each attempt is bounded by
/// `call_timeout` when one is set.
pub async fn generate_with_retry<T, P>(
  provider: &P,
  prompt: &Prompt,
  max_retries: u32,
  call_timeout: Option<Duration>,
) -> Result<Generated<T>, LlmError>
where
  T: DeserializeOwned + Validate,
  P: LlmProvider + ?Sized,
{
  let max_attempts = max_retries.max(1);
  let mut attempt = 0;

  loop {
    attempt += 1;
    let result = match call_timeout {
      Some(limit) => match tokio::time::timeout(limit, provider.complete(prompt)).await {
        Ok(r) => r,
        Err(_) => Err(LlmError::Timeout(limit)),
      },
      None => provider.complete(prompt).await,
    };

    let err = match result.and_then(|c| parse_validated::<T>(&c.text)) {
      Ok(value) => {
        debug!(step = %prompt.step, attempt, "Provider response validated");
        return Ok(Generated {
          value,
          stats: CallStats::from_attempts(attempt),
        });
      }
      Err(e) => e,
    };

    if !err.is_retryable() {
      return Err(if attempt > 1 {
        LlmError::Aborted {
          attempts: attempt,
          last: Box::new(err),
        }
      } else {
        err
      });
    }
    if attempt >= max_attempts {
      return Err(LlmError::RetriesExhausted {
        attempts: attempt,
        last: Box::new(err),
      });
    }

    warn!(
      step = %prompt.step,
      attempt,
      max_attempts,
      error = %err,
      "Provider response rejected, retrying"
    );
  }
}

/// Extract JSON from Claude's response (handles markdown code blocks)
pub fn extract_json(text: &str) -> Result<String, LlmError> {
  if text.trim().starts_with('{') {
    return Ok(text.trim().to_string());
  }

  // Look for JSON in code blocks
  if let Some(start) = text.find("```json") {
    let start = start + 7;
    if let Some(end) = text[start..].find("```") {
      return Ok(text[start..start + end].trim().to_string());
    }
  }

  // Look for plain code blocks
  if let Some(start) = text.find("```") {
    let start = start + 3;
    // Skip language identifier if present
    let content_start = text[start..]
      .find('\n')
      .map(|i| start + i + 1)
      .unwrap_or(start);
    if let Some(end) = text[content_start..].find("```") {
      return Ok(text[content_start..content_start + end].trim().to_string());
    }
  }

  // Last resort: find first { to last }
  if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
    if start < end {
      return Ok(text[start..=end].to_string());
    }
  }

  Err(LlmError::Parse("Could not extract JSON from response".to_string()))
}

fn truncate(s: &str, max: usize) -> &str {
  match s.char_indices().nth(max) {
    Some((idx, _)) => &s[..idx],
    None => s,
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
