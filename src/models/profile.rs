use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::program::DayOfWeek;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuscleGroup {
  Chest,
  Back,
  Quads,
  Hamstrings,
  Glutes,
  Shoulders,
  Biceps,
  Triceps,
  Calves,
}

impl MuscleGroup {
  pub const ALL: [MuscleGroup; 9] = [
    MuscleGroup::Chest,
    MuscleGroup::Back,
    MuscleGroup::Quads,
    MuscleGroup::Hamstrings,
    MuscleGroup::Glutes,
    MuscleGroup::Shoulders,
    MuscleGroup::Biceps,
    MuscleGroup::Triceps,
    MuscleGroup::Calves,
  ];

  /// Groups whose weekly volume must reach MEV
  pub const PRIMARY: [MuscleGroup; 3] = [MuscleGroup::Chest, MuscleGroup::Back, MuscleGroup::Quads];

  pub fn as_str(&self) -> &'static str {
    match self {
      MuscleGroup::Chest => "chest",
      MuscleGroup::Back => "back",
      MuscleGroup::Quads => "quads",
      MuscleGroup::Hamstrings => "hamstrings",
      MuscleGroup::Glutes => "glutes",
      MuscleGroup::Shoulders => "shoulders",
      MuscleGroup::Biceps => "biceps",
      MuscleGroup::Triceps => "triceps",
      MuscleGroup::Calves => "calves",
    }
  }

  pub fn is_primary(&self) -> bool {
    Self::PRIMARY.contains(self)
  }
}

impl std::fmt::Display for MuscleGroup {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Weekly set landmarks for one muscle group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeLandmarks {
  pub mev: u32,
  pub mav: u32,
  pub mrv: u32,
}

pub type MuscleLandmarks = BTreeMap<MuscleGroup, VolumeLandmarks>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperienceLevel {
  Beginner,
  Intermediate,
  Advanced,
}

impl ExperienceLevel {
  pub fn as_str(&self) -> &'static str {
    match self {
      ExperienceLevel::Beginner => "Beginner",
      ExperienceLevel::Intermediate => "Intermediate",
      ExperienceLevel::Advanced => "Advanced",
    }
  }
}

/// Inputs to the landmark calculator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeParameters {
  /// Years of consistent resistance training
  pub training_age_years: f64,
  /// Self-rated recovery capacity, 1 (poor) to 10 (excellent)
  pub recovery_capacity: u8,
  /// Self-rated life stress, 1 (low) to 10 (high)
  pub stress_level: u8,
}

impl Default for VolumeParameters {
  fn default() -> Self {
    Self {
      training_age_years: 2.0,
      recovery_capacity: 5,
      stress_level: 5,
    }
  }
}

/// Complete set of one-rep-max estimates; all four lifts are required
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrengthProfile {
  pub squat: f64,
  pub bench: f64,
  pub deadlift: f64,
  pub overhead_press: f64,
}

/// Strength estimates as captured from the user, any of which may be missing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrengthInputs {
  pub squat_1rm: Option<f64>,
  pub bench_1rm: Option<f64>,
  pub deadlift_1rm: Option<f64>,
  pub overhead_press_1rm: Option<f64>,
  #[serde(default = "default_unit")]
  pub unit: String,
}

fn default_program_weeks() -> u32 {
  12
}

fn default_unit() -> String {
  "kg".to_string()
}

impl Default for StrengthInputs {
  fn default() -> Self {
    Self {
      squat_1rm: None,
      bench_1rm: None,
      deadlift_1rm: None,
      overhead_press_1rm: None,
      unit: default_unit(),
    }
  }
}

impl StrengthInputs {
  /// The analysable profile, or None when any lift is missing or non-positive
  pub fn complete(&self) -> Option<StrengthProfile> {
    let positive = |v: Option<f64>| v.filter(|x| x.is_finite() && *x > 0.0);
    Some(StrengthProfile {
      squat: positive(self.squat_1rm)?,
      bench: positive(self.bench_1rm)?,
      deadlift: positive(self.deadlift_1rm)?,
      overhead_press: positive(self.overhead_press_1rm)?,
    })
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
  pub experience_level: ExperienceLevel,
  pub primary_goal: String,
  pub training_frequency_days: u8,
  #[serde(default)]
  pub preferred_training_days: Vec<DayOfWeek>,
  pub session_duration_minutes: u32,
  #[serde(default = "default_program_weeks")]
  pub program_duration_weeks: u32,
  #[serde(default)]
  pub equipment: Vec<String>,
  #[serde(default)]
  pub limitations: Option<String>,
  #[serde(default)]
  pub volume_parameters: VolumeParameters,
  #[serde(default)]
  pub strength: Option<StrengthInputs>,
}

impl UserProfile {
  /// Periodization model matched to training experience
  pub fn periodization_model(&self) -> &'static str {
    match self.experience_level {
      ExperienceLevel::Beginner => "Linear Periodization",
      ExperienceLevel::Intermediate => "Block Periodization",
      ExperienceLevel::Advanced => "Conjugate-Influenced Block Periodization",
    }
  }

  pub fn strength_profile(&self) -> Option<StrengthProfile> {
    self.strength.as_ref().and_then(StrengthInputs::complete)
  }
}
