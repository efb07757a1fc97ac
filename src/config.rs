//! Generation configuration
//!
//! Defaults suit production use; `from_env` layers `PROGRAM_FORGE_*`
//! variables (and a `.env` file, if present) on top.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::CLAUDE_MODEL;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("Invalid value for {key}: '{value}' ({reason})")]
  InvalidValue {
    key: &'static str,
    value: String,
    reason: String,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLevel {
  /// Any failed Guardian review or invalid schema report fails the run
  Strict,
  /// Only CRITICAL findings fail the run; the rest ride along as warnings
  #[default]
  Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
  Verbose,
  #[default]
  Normal,
  Minimal,
}

impl LogLevel {
  /// Default `tracing` filter directive for this level
  pub fn as_filter(&self) -> &'static str {
    match self {
      LogLevel::Verbose => "debug",
      LogLevel::Normal => "info",
      LogLevel::Minimal => "warn",
    }
  }
}

impl std::str::FromStr for ValidationLevel {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "strict" => Ok(Self::Strict),
      "lenient" => Ok(Self::Lenient),
      _ => Err("expected strict or lenient".to_string()),
    }
  }
}

impl std::str::FromStr for LogLevel {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "verbose" => Ok(Self::Verbose),
      "normal" => Ok(Self::Normal),
      "minimal" => Ok(Self::Minimal),
      _ => Err("expected verbose, normal or minimal".to_string()),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationConfig {
  /// Attempts per provider call (values below 1 still make one attempt)
  pub max_retries: u32,
  pub enable_parallel_generation: bool,
  /// Cap on in-flight session calls; None issues them all at once
  pub max_concurrency: Option<usize>,
  pub validation_level: ValidationLevel,
  pub log_level: LogLevel,
  /// Per provider call
  pub call_timeout: Option<Duration>,
  /// Whole run, fan-out included
  pub pipeline_deadline: Option<Duration>,
  pub model: String,
}

impl Default for GenerationConfig {
  fn default() -> Self {
    Self {
      max_retries: 3,
      enable_parallel_generation: true,
      max_concurrency: None,
      validation_level: ValidationLevel::default(),
      log_level: LogLevel::default(),
      call_timeout: Some(Duration::from_secs(90)),
      pipeline_deadline: Some(Duration::from_secs(600)),
      model: CLAUDE_MODEL.to_string(),
    }
  }
}

fn parse_var<T>(key: &'static str) -> Result<Option<T>, ConfigError>
where
  T: std::str::FromStr,
  T::Err: std::fmt::Display,
{
  match env::var(key) {
    Ok(value) => value
      .trim()
      .parse::<T>()
      .map(Some)
      .map_err(|e| ConfigError::InvalidValue {
        key,
        value,
        reason: e.to_string(),
      }),
    Err(_) => Ok(None),
  }
}

/// Seconds; 0 disables the limit
fn parse_secs(key: &'static str) -> Result<Option<Option<Duration>>, ConfigError> {
  Ok(parse_var::<u64>(key)?.map(|secs| (secs > 0).then(|| Duration::from_secs(secs))))
}

impl GenerationConfig {
  /// Load configuration from the environment, falling back to defaults
  pub fn from_env() -> Result<Self, ConfigError> {
    dotenvy::dotenv().ok();

    let mut config = Self::default();

    if let Some(v) = parse_var("PROGRAM_FORGE_MAX_RETRIES")? {
      config.max_retries = v;
    }
    if let Some(v) = parse_var("PROGRAM_FORGE_PARALLEL")? {
      config.enable_parallel_generation = v;
    }
    if let Some(v) = parse_var::<usize>("PROGRAM_FORGE_MAX_CONCURRENCY")? {
      config.max_concurrency = (v > 0).then_some(v);
    }
    if let Some(v) = parse_var("PROGRAM_FORGE_VALIDATION_LEVEL")? {
      config.validation_level = v;
    }
    if let Some(v) = parse_var("PROGRAM_FORGE_LOG_LEVEL")? {
      config.log_level = v;
    }
    if let Some(v) = parse_secs("PROGRAM_FORGE_CALL_TIMEOUT_SECS")? {
      config.call_timeout = v;
    }
    if let Some(v) = parse_secs("PROGRAM_FORGE_DEADLINE_SECS")? {
      config.pipeline_deadline = v;
    }
    if let Ok(model) = env::var("PROGRAM_FORGE_MODEL") {
      if !model.trim().is_empty() {
        config.model = model.trim().to_string();
      }
    }

    Ok(config)
  }
}
