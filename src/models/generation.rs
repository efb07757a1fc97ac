//! Provider payloads for the three generation steps

use serde::{Deserialize, Serialize};

use super::program::{
  DayOfWeek, MuscleVolume, PhaseType, RpeTarget, TrainingPhase, TrainingProgram, TrainingWeek,
  WeakPointIntervention, WorkoutDay,
};

/// Step 1 output: the phases/weeks skeleton without exercises
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramScaffold {
  pub program_name: String,
  pub description: String,
  pub duration_weeks_total: u32,
  pub periodization_model: String,
  pub phases: Vec<ScaffoldPhase>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub weak_point_interventions: Vec<WeakPointIntervention>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaffoldPhase {
  pub phase_name: String,
  pub phase_type: PhaseType,
  pub duration_weeks: u32,
  pub primary_goal: String,
  pub weeks: Vec<ScaffoldWeek>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rpe_target: Option<RpeTarget>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub volume_distribution: Option<Vec<MuscleVolume>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaffoldWeek {
  pub week_number: u32,
  pub progression_strategy: String,
  pub intensity_focus: String,
  pub days: Vec<ScaffoldDay>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub weekly_volume_landmark: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaffoldDay {
  pub day_of_week: DayOfWeek,
  pub is_rest_day: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub focus: Option<String>,
}

/// Step 3 output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeContent {
  pub coach_intro: String,
  pub general_advice: String,
}

/// Destination of one day inside the scaffold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DaySlot {
  pub phase: usize,
  pub week: usize,
  pub day: usize,
}

impl std::fmt::Display for DaySlot {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "phase {} / week {} / day {}", self.phase + 1, self.week + 1, self.day + 1)
  }
}

/// Everything a session prompt needs to know about one training day
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
  pub slot: DaySlot,
  pub day_of_week: DayOfWeek,
  pub focus: String,
  pub phase_name: String,
  pub phase_type: PhaseType,
  pub week_number: u32,
  pub intensity_focus: String,
  pub progression_strategy: String,
  pub rpe_target: Option<RpeTarget>,
}

impl ProgramScaffold {
  /// Non-rest days in document order, each tagged with its destination slot
  pub fn training_sessions(&self) -> Vec<SessionContext> {
    let mut sessions = Vec::new();
    for (pi, phase) in self.phases.iter().enumerate() {
      for (wi, week) in phase.weeks.iter().enumerate() {
        for (di, day) in week.days.iter().enumerate() {
          if day.is_rest_day {
            continue;
          }
          sessions.push(SessionContext {
            slot: DaySlot { phase: pi, week: wi, day: di },
            day_of_week: day.day_of_week,
            focus: day.focus.clone().unwrap_or_else(|| "Full Body".to_string()),
            phase_name: phase.phase_name.clone(),
            phase_type: phase.phase_type,
            week_number: week.week_number,
            intensity_focus: week.intensity_focus.clone(),
            progression_strategy: week.progression_strategy.clone(),
            rpe_target: phase.rpe_target,
          });
        }
      }
    }
    sessions
  }

  pub fn total_days(&self) -> usize {
    self.phases.iter().flat_map(|p| p.weeks.iter()).map(|w| w.days.len()).sum()
  }

  /// Copy of the scaffold as a program, with every day left as a rest-day placeholder
  /// for the assembler to overwrite
  pub fn to_program_shell(&self, narrative: &NarrativeContent) -> TrainingProgram {
    TrainingProgram {
      program_name: self.program_name.clone(),
      description: self.description.clone(),
      duration_weeks_total: self.duration_weeks_total,
      periodization_model: self.periodization_model.clone(),
      coach_intro: narrative.coach_intro.clone(),
      general_advice: narrative.general_advice.clone(),
      phases: self
        .phases
        .iter()
        .map(|p| TrainingPhase {
          phase_name: p.phase_name.clone(),
          phase_type: p.phase_type,
          duration_weeks: p.duration_weeks,
          primary_goal: p.primary_goal.clone(),
          weeks: p
            .weeks
            .iter()
            .map(|w| TrainingWeek {
              week_number: w.week_number,
              progression_strategy: w.progression_strategy.clone(),
              intensity_focus: w.intensity_focus.clone(),
              days: w.days.iter().map(|d| WorkoutDay::rest(d.day_of_week)).collect(),
              weekly_volume_landmark: w.weekly_volume_landmark.clone(),
            })
            .collect(),
          rpe_target: p.rpe_target,
          volume_distribution: p.volume_distribution.clone(),
        })
        .collect(),
      weak_point_interventions: self.weak_point_interventions.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::sample_scaffold;

  #[test]
  fn test_training_sessions_skip_rest_days() {
    let scaffold = sample_scaffold(4, 3);
    let sessions = scaffold.training_sessions();

    assert_eq!(scaffold.total_days(), 28);
    assert_eq!(sessions.len(), 12);
    assert!(sessions.iter().all(|s| s.phase_type == PhaseType::Accumulation));
    assert_eq!(sessions[0].slot, DaySlot { phase: 0, week: 0, day: 0 });
    assert_eq!(sessions[11].week_number, 4);
  }

  #[test]
  fn test_program_shell_keeps_shape() {
    let scaffold = sample_scaffold(2, 3);
    let narrative = NarrativeContent {
      coach_intro: "Welcome".to_string(),
      general_advice: "Sleep".to_string(),
    };
    let shell = scaffold.to_program_shell(&narrative);

    assert_eq!(shell.phases[0].weeks.len(), 2);
    assert!(shell.days().all(|d| d.is_rest_day));
    assert_eq!(shell.coach_intro, "Welcome");
  }
}
