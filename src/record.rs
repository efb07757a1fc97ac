//! Persistence hand-off document
//!
//! Field names follow the storage columns (snake_case), unlike the camelCase
//! program document embedded in `program_data`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{MuscleLandmarks, TrainingProgram};
use crate::pipeline::{GenerationMetadata, GenerationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
  Completed,
  CompletedWithWarnings,
  Failed,
}

impl GenerationStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      GenerationStatus::Completed => "completed",
      GenerationStatus::CompletedWithWarnings => "completed_with_warnings",
      GenerationStatus::Failed => "failed",
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgramRecord {
  pub program_data: Option<TrainingProgram>,
  pub generation_status: GenerationStatus,
  pub generation_error: Option<String>,
  pub ai_model_version: String,
  pub volume_landmarks: MuscleLandmarks,
  /// Findings waived by a lenient run, empty otherwise
  pub validation_warnings: Vec<String>,
  pub generation_metadata: GenerationMetadata,
  pub generated_at: DateTime<Utc>,
}

impl ProgramRecord {
  pub fn from_result(result: &GenerationResult, landmarks: &MuscleLandmarks) -> Self {
    let validation_warnings = result
      .validation_warning
      .as_ref()
      .map(|w| w.messages())
      .unwrap_or_default();

    let generation_status = if !result.success {
      GenerationStatus::Failed
    } else if validation_warnings.is_empty() {
      GenerationStatus::Completed
    } else {
      GenerationStatus::CompletedWithWarnings
    };

    Self {
      program_data: result.program.clone(),
      generation_status,
      generation_error: result.error.clone(),
      ai_model_version: result.metadata.model_version.clone(),
      volume_landmarks: landmarks.clone(),
      validation_warnings,
      generation_metadata: result.metadata.clone(),
      generated_at: Utc::now(),
    }
  }
}
