//! Training program generation core
//!
//! Deterministic calculators feed prompt construction, a three-step LLM
//! pipeline drafts and assembles the program, and two independent validators
//! (the schema layer and the Guardian) decide whether it is accepted.

pub mod analysis;
pub mod config;
pub mod consistency;
pub mod guardian;
pub mod llm;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod record;
pub mod schema;

#[cfg(test)]
mod test_utils;

pub use config::{ConfigError, GenerationConfig, LogLevel, ValidationLevel};
pub use consistency::{ConsistencyConfig, ReadAfterWriteTracker};
pub use guardian::{GuardianReport, Severity};
pub use llm::{ClaudeClient, LlmError, LlmProvider};
pub use logging::init_tracing;
pub use pipeline::{
  AssemblyError, GenerationMetadata, GenerationResult, GenerationStage, PipelineError,
  ProgramGenerator, ValidationWarning,
};
pub use record::{GenerationStatus, ProgramRecord};
pub use schema::{validate_program, validate_program_json, SchemaReport, ValidationContext};
