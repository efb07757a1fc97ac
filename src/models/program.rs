//! Training program document: phases -> weeks -> days -> exercises

use serde::{Deserialize, Serialize};

use super::profile::MuscleGroup;

/// ---------------------------------------------------------------------------
/// Enumerations
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhaseType {
  Accumulation,
  Intensification,
  Realization,
  Deload,
}

impl PhaseType {
  pub fn as_str(&self) -> &'static str {
    match self {
      PhaseType::Accumulation => "Accumulation",
      PhaseType::Intensification => "Intensification",
      PhaseType::Realization => "Realization",
      PhaseType::Deload => "Deload",
    }
  }
}

impl std::fmt::Display for PhaseType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DayOfWeek {
  Monday,
  Tuesday,
  Wednesday,
  Thursday,
  Friday,
  Saturday,
  Sunday,
}

impl DayOfWeek {
  pub const ALL: [DayOfWeek; 7] = [
    DayOfWeek::Monday,
    DayOfWeek::Tuesday,
    DayOfWeek::Wednesday,
    DayOfWeek::Thursday,
    DayOfWeek::Friday,
    DayOfWeek::Saturday,
    DayOfWeek::Sunday,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      DayOfWeek::Monday => "Monday",
      DayOfWeek::Tuesday => "Tuesday",
      DayOfWeek::Wednesday => "Wednesday",
      DayOfWeek::Thursday => "Thursday",
      DayOfWeek::Friday => "Friday",
      DayOfWeek::Saturday => "Saturday",
      DayOfWeek::Sunday => "Sunday",
    }
  }
}

impl std::fmt::Display for DayOfWeek {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for DayOfWeek {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    DayOfWeek::ALL
      .iter()
      .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
      .copied()
      .ok_or_else(|| format!("Unknown day of week: {}", s))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExerciseTier {
  Anchor,
  Primary,
  Secondary,
  Accessory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExerciseCategory {
  #[serde(rename = "Anchor_Lift")]
  AnchorLift,
  #[serde(rename = "Compound_Accessory")]
  CompoundAccessory,
  Isolation,
  Core,
  Cardio,
  Mobility,
}

/// Reps are either a plain count or a free-form range such as "8-12" or "AMRAP"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reps {
  Count(u32),
  Range(String),
}

impl std::fmt::Display for Reps {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Reps::Count(n) => write!(f, "{}", n),
      Reps::Range(s) => f.write_str(s),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Document
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseDetail {
  pub name: String,
  pub sets: u32,
  pub reps: Reps,
  pub rest: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rpe: Option<f64>,
  pub tier: ExerciseTier,
  pub category: ExerciseCategory,
  #[serde(default)]
  pub notes: String,
  #[serde(default)]
  pub weight: String,
  #[serde(default)]
  pub is_anchor_lift: bool,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub muscle_groups: Vec<MuscleGroup>,
}

impl ExerciseDetail {
  /// The day's anchor is the exercise categorised `Anchor_Lift`; tier and flag are secondary markers
  pub fn is_anchor(&self) -> bool {
    self.category == ExerciseCategory::AnchorLift
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutDay {
  pub day_of_week: DayOfWeek,
  pub is_rest_day: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub focus: Option<String>,
  #[serde(default)]
  pub exercises: Vec<ExerciseDetail>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub warm_up: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cool_down: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub estimated_duration_minutes: Option<u32>,
}

impl WorkoutDay {
  /// A rest day resolved locally, no provider call involved
  pub fn rest(day_of_week: DayOfWeek) -> Self {
    Self {
      day_of_week,
      is_rest_day: true,
      focus: Some("Rest & Recovery".to_string()),
      exercises: Vec::new(),
      warm_up: None,
      cool_down: None,
      estimated_duration_minutes: None,
    }
  }

  pub fn anchor(&self) -> Option<&ExerciseDetail> {
    self.exercises.iter().find(|e| e.is_anchor())
  }

  pub fn total_sets(&self) -> u32 {
    self.exercises.iter().map(|e| e.sets).sum()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingWeek {
  pub week_number: u32,
  pub progression_strategy: String,
  pub intensity_focus: String,
  pub days: Vec<WorkoutDay>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub weekly_volume_landmark: Option<String>,
}

impl TrainingWeek {
  pub fn total_sets(&self) -> u32 {
    self.days.iter().map(WorkoutDay::total_sets).sum()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RpeTarget {
  pub min: f64,
  pub max: f64,
  pub target: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MuscleVolume {
  pub muscle_group: MuscleGroup,
  pub weekly_volume: u32,
  pub percentage_of_mav: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingPhase {
  pub phase_name: String,
  pub phase_type: PhaseType,
  pub duration_weeks: u32,
  pub primary_goal: String,
  pub weeks: Vec<TrainingWeek>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rpe_target: Option<RpeTarget>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub volume_distribution: Option<Vec<MuscleVolume>>,
}

impl TrainingPhase {
  /// Average weekly set count across the phase's weeks
  pub fn average_weekly_sets(&self) -> f64 {
    if self.weeks.is_empty() {
      return 0.0;
    }
    let total: u32 = self.weeks.iter().map(TrainingWeek::total_sets).sum();
    total as f64 / self.weeks.len() as f64
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeakPointArea {
  WeakVerticalPress,
  WeakHorizontalPress,
  WeakQuads,
  WeakPosteriorChain,
}

impl WeakPointArea {
  pub fn as_str(&self) -> &'static str {
    match self {
      WeakPointArea::WeakVerticalPress => "WEAK_VERTICAL_PRESS",
      WeakPointArea::WeakHorizontalPress => "WEAK_HORIZONTAL_PRESS",
      WeakPointArea::WeakQuads => "WEAK_QUADS",
      WeakPointArea::WeakPosteriorChain => "WEAK_POSTERIOR_CHAIN",
    }
  }
}

impl std::fmt::Display for WeakPointArea {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
  High,
  Moderate,
  Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeakPointIntervention {
  pub target_area: WeakPointArea,
  pub current_ratio: f64,
  pub target_ratio: f64,
  pub priority: Priority,
  pub weekly_volume: u32,
  pub reassessment_period_weeks: u32,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub exercises: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingProgram {
  pub program_name: String,
  pub description: String,
  pub duration_weeks_total: u32,
  pub periodization_model: String,
  pub coach_intro: String,
  pub general_advice: String,
  pub phases: Vec<TrainingPhase>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub weak_point_interventions: Vec<WeakPointIntervention>,
}

impl TrainingProgram {
  /// All days across phases and weeks, in document order
  pub fn days(&self) -> impl Iterator<Item = &WorkoutDay> {
    self
      .phases
      .iter()
      .flat_map(|p| p.weeks.iter())
      .flat_map(|w| w.days.iter())
  }

  /// Unique anchor lift names, sorted
  pub fn anchor_lifts(&self) -> Vec<String> {
    let mut names: Vec<String> = self
      .days()
      .filter(|d| !d.is_rest_day)
      .filter_map(WorkoutDay::anchor)
      .map(|e| e.name.clone())
      .collect();
    names.sort();
    names.dedup();
    names
  }

  /// Per-phase average weekly set volume, e.g. "Accumulation Block: 42.5 sets/week"
  pub fn phase_volume_summary(&self) -> Vec<String> {
    self
      .phases
      .iter()
      .map(|p| format!("{}: {:.1} sets/week", p.phase_name, p.average_weekly_sets()))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::{sample_program, strength_day};

  #[test]
  fn test_day_of_week_parse() {
    assert_eq!("monday".parse::<DayOfWeek>().unwrap(), DayOfWeek::Monday);
    assert_eq!(" Sunday ".parse::<DayOfWeek>().unwrap(), DayOfWeek::Sunday);
    assert!("Funday".parse::<DayOfWeek>().is_err());
  }

  #[test]
  fn test_reps_accepts_number_or_range() {
    let count: Reps = serde_json::from_str("5").unwrap();
    assert_eq!(count, Reps::Count(5));

    let range: Reps = serde_json::from_str(r#""8-12""#).unwrap();
    assert_eq!(range, Reps::Range("8-12".to_string()));
  }

  #[test]
  fn test_exercise_wire_names() {
    let day = strength_day(DayOfWeek::Monday, "Back Squat");
    let json = serde_json::to_value(&day).unwrap();

    assert_eq!(json["dayOfWeek"], "Monday");
    assert_eq!(json["exercises"][0]["category"], "Anchor_Lift");
    assert_eq!(json["exercises"][0]["isAnchorLift"], true);
  }

  #[test]
  fn test_weak_point_area_wire_name() {
    let json = serde_json::to_string(&WeakPointArea::WeakVerticalPress).unwrap();
    assert_eq!(json, r#""WEAK_VERTICAL_PRESS""#);
  }

  #[test]
  fn test_anchor_lifts_sorted_and_unique() {
    let program = sample_program(1, 3);
    let anchors = program.anchor_lifts();

    assert_eq!(anchors, vec!["Back Squat", "Bench Press", "Deadlift"]);
  }

  #[test]
  fn test_phase_volume_summary() {
    let program = sample_program(2, 3);
    let summary = program.phase_volume_summary();

    assert_eq!(summary.len(), 1);
    // 3 training days x (4 + 3 + 3) sets
    assert_eq!(summary[0], "Accumulation Block: 30.0 sets/week");
  }
}
