//! Schema layer: structural and cross-field validation of training programs
//!
//! Two entry points:
//! - [`Validate`] runs at the provider boundary on each step's payload, so a
//!   malformed response is rejected (and retried) before it is trusted.
//! - [`validate_program`] checks a complete program against the domain rules,
//!   for generated programs and editor-built ones alike.
//!
//! Results are data, never panics or errors: `errors` hold structural/type
//! failures, `violations` hold well-typed values that break a domain rule.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::models::{
  DayOfWeek, ExerciseDetail, ExerciseTier, MuscleLandmarks, NarrativeContent, PhaseType, Priority,
  ProgramScaffold, RpeTarget, TrainingPhase, TrainingProgram, WeakPointArea, WorkoutDay,
};

/// Maximum allowed width of a phase's RPE band
pub const MAX_RPE_BAND: f64 = 3.0;
/// Upper bound on planned volume as a percentage of MAV
pub const MAX_PERCENT_OF_MAV: f64 = 110.0;
pub const MIN_HIGH_PRIORITY_VOLUME: u32 = 4;
pub const MAX_REASSESSMENT_WEEKS: u32 = 8;

/// ---------------------------------------------------------------------------
/// Boundary validation
/// ---------------------------------------------------------------------------

/// Structural checks applied to a freshly decoded provider payload
pub trait Validate {
  /// Every problem found, empty when the value is acceptable
  fn validate(&self) -> Vec<String>;
}

fn check_week_days(
  errors: &mut Vec<String>,
  location: &str,
  days: impl Iterator<Item = DayOfWeek> + Clone,
) {
  let count = days.clone().count();
  if count != 7 {
    errors.push(format!("{}: expected 7 days, found {}", location, count));
  }
  let mut seen = HashSet::new();
  for day in days {
    if !seen.insert(day) {
      errors.push(format!("{}: duplicate {}", location, day));
    }
  }
  for day in DayOfWeek::ALL {
    if count == 7 && !seen.contains(&day) {
      errors.push(format!("{}: missing {}", location, day));
    }
  }
}

impl Validate for ProgramScaffold {
  fn validate(&self) -> Vec<String> {
    let mut errors = Vec::new();

    if self.program_name.trim().is_empty() {
      errors.push("programName must not be empty".to_string());
    }
    if self.phases.is_empty() {
      errors.push("phases must not be empty".to_string());
    }

    let sum: u32 = self.phases.iter().map(|p| p.duration_weeks).sum();
    if sum != self.duration_weeks_total {
      errors.push(format!(
        "durationWeeksTotal is {} but phases sum to {} weeks",
        self.duration_weeks_total, sum
      ));
    }

    for phase in &self.phases {
      let name = &phase.phase_name;
      if phase.duration_weeks == 0 {
        errors.push(format!("Phase '{}': durationWeeks must be positive", name));
      }
      if phase.weeks.len() != phase.duration_weeks as usize {
        errors.push(format!(
          "Phase '{}': has {} weeks but durationWeeks is {}",
          name,
          phase.weeks.len(),
          phase.duration_weeks
        ));
      }
      check_week_numbers(&mut errors, name, phase.weeks.iter().map(|w| w.week_number));

      for week in &phase.weeks {
        let location = format!("Phase '{}' week {}", name, week.week_number);
        check_week_days(&mut errors, &location, week.days.iter().map(|d| d.day_of_week));
      }
    }

    errors
  }
}

impl Validate for WorkoutDay {
  fn validate(&self) -> Vec<String> {
    let mut errors = Vec::new();
    let location = self.day_of_week.as_str();

    if self.is_rest_day {
      if !self.exercises.is_empty() {
        errors.push(format!("{}: rest day must not list exercises", location));
      }
      return errors;
    }

    if self.exercises.is_empty() {
      errors.push(format!("{}: training day has no exercises", location));
      return errors;
    }

    for exercise in &self.exercises {
      errors.extend(exercise_errors(location, exercise));
    }
    errors.extend(anchor_errors(location, &self.exercises));
    errors
  }
}

impl Validate for NarrativeContent {
  fn validate(&self) -> Vec<String> {
    let mut errors = Vec::new();
    if self.coach_intro.trim().is_empty() {
      errors.push("coachIntro must not be empty".to_string());
    }
    if self.general_advice.trim().is_empty() {
      errors.push("generalAdvice must not be empty".to_string());
    }
    errors
  }
}

fn check_week_numbers(errors: &mut Vec<String>, phase: &str, numbers: impl Iterator<Item = u32>) {
  let mut seen = HashSet::new();
  for n in numbers {
    if n == 0 {
      errors.push(format!("Phase '{}': weekNumber must be positive", phase));
    } else if !seen.insert(n) {
      errors.push(format!("Phase '{}': duplicate weekNumber {}", phase, n));
    }
  }
}

fn exercise_errors(location: &str, exercise: &ExerciseDetail) -> Vec<String> {
  let mut errors = Vec::new();
  if exercise.name.trim().is_empty() {
    errors.push(format!("{}: exercise name must not be empty", location));
  }
  if exercise.sets == 0 {
    errors.push(format!("{}: '{}' must have at least one set", location, exercise.name));
  }
  if let Some(rpe) = exercise.rpe {
    if !(1.0..=10.0).contains(&rpe) {
      errors.push(format!(
        "{}: '{}' RPE {} outside 1-10",
        location, exercise.name, rpe
      ));
    }
  }
  if exercise.tier == ExerciseTier::Anchor && !exercise.is_anchor_lift {
    errors.push(format!(
      "{}: '{}' has tier Anchor but isAnchorLift is false",
      location, exercise.name
    ));
  }
  errors
}

/// Exactly one Anchor_Lift, first in the list
fn anchor_errors(location: &str, exercises: &[ExerciseDetail]) -> Vec<String> {
  let mut errors = Vec::new();
  let anchors: Vec<usize> = exercises
    .iter()
    .enumerate()
    .filter(|(_, e)| e.is_anchor())
    .map(|(i, _)| i)
    .collect();

  match anchors.as_slice() {
    [] => errors.push(format!("{}: no anchor lift", location)),
    [0] => {}
    [i] => errors.push(format!(
      "{}: anchor lift '{}' must be first, found at position {}",
      location,
      exercises[*i].name,
      i + 1
    )),
    many => errors.push(format!(
      "{}: expected exactly one anchor lift, found {}",
      location,
      many.len()
    )),
  }

  for (i, exercise) in exercises.iter().enumerate().skip(1) {
    if exercise.tier == ExerciseTier::Anchor {
      errors.push(format!(
        "{}: '{}' has tier Anchor but is at position {}",
        location,
        exercise.name,
        i + 1
      ));
    }
  }
  errors
}

/// ---------------------------------------------------------------------------
/// Program validation
/// ---------------------------------------------------------------------------

/// Reference data a program is validated against
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationContext<'a> {
  pub landmarks: Option<&'a MuscleLandmarks>,
  pub weak_points: &'a [WeakPointArea],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaReport {
  pub is_valid: bool,
  pub violations: Vec<String>,
  pub errors: Vec<String>,
}

impl SchemaReport {
  fn from_parts(errors: Vec<String>, violations: Vec<String>) -> Self {
    Self {
      is_valid: errors.is_empty() && violations.is_empty(),
      violations,
      errors,
    }
  }
}

/// Validate a complete program against every structural and domain rule
pub fn validate_program(program: &TrainingProgram, ctx: &ValidationContext<'_>) -> SchemaReport {
  let mut errors = structural_errors(program);
  let mut violations = Vec::new();

  violations.extend(rpe_monotonicity_violations(&program.phases));
  violations.extend(rpe_band_violations(&program.phases));
  if let Some(landmarks) = ctx.landmarks {
    violations.extend(volume_violations(&program.phases, landmarks));
  }
  violations.extend(weak_point_violations(program, ctx.weak_points));

  errors.dedup();
  SchemaReport::from_parts(errors, violations)
}

/// Validate editor-submitted JSON; decode failures become schema errors
pub fn validate_program_json(json: &str, ctx: &ValidationContext<'_>) -> SchemaReport {
  match serde_json::from_str::<TrainingProgram>(json) {
    Ok(program) => validate_program(&program, ctx),
    Err(e) => SchemaReport::from_parts(vec![format!("Invalid program document: {}", e)], Vec::new()),
  }
}

/// Rules 1-4: duration sum, week counts, seven unique weekdays, anchor placement
fn structural_errors(program: &TrainingProgram) -> Vec<String> {
  let mut errors = Vec::new();

  let sum: u32 = program.phases.iter().map(|p| p.duration_weeks).sum();
  if sum != program.duration_weeks_total {
    errors.push(format!(
      "durationWeeksTotal is {} but phases sum to {} weeks",
      program.duration_weeks_total, sum
    ));
  }

  for phase in &program.phases {
    let name = &phase.phase_name;
    if phase.weeks.len() != phase.duration_weeks as usize {
      errors.push(format!(
        "Phase '{}': has {} weeks but durationWeeks is {}",
        name,
        phase.weeks.len(),
        phase.duration_weeks
      ));
    }
    check_week_numbers(&mut errors, name, phase.weeks.iter().map(|w| w.week_number));

    for week in &phase.weeks {
      let location = format!("Phase '{}' week {}", name, week.week_number);
      check_week_days(&mut errors, &location, week.days.iter().map(|d| d.day_of_week));

      for day in &week.days {
        for e in day.validate() {
          errors.push(format!("{} {}", location, e));
        }
      }
    }
  }

  errors
}

/// First RPE target found for each phase type
fn phase_targets(phases: &[TrainingPhase]) -> BTreeMap<PhaseType, RpeTarget> {
  let mut targets = BTreeMap::new();
  for phase in phases {
    if let Some(t) = phase.rpe_target {
      targets.entry(phase.phase_type).or_insert(t);
    }
  }
  targets
}

/// Rule 5
fn rpe_monotonicity_violations(phases: &[TrainingPhase]) -> Vec<String> {
  let targets = phase_targets(phases);
  let mut violations = Vec::new();

  let ordered = [
    PhaseType::Accumulation,
    PhaseType::Intensification,
    PhaseType::Realization,
  ];
  for pair in ordered.windows(2) {
    if let (Some(a), Some(b)) = (targets.get(&pair[0]), targets.get(&pair[1])) {
      if a.target > b.target {
        violations.push(format!(
          "RPE progression: {} target {:.1} exceeds {} target {:.1}",
          pair[0], a.target, pair[1], b.target
        ));
      }
    }
  }

  if let (Some(acc), Some(deload)) = (
    targets.get(&PhaseType::Accumulation),
    targets.get(&PhaseType::Deload),
  ) {
    if deload.target >= acc.target {
      violations.push(format!(
        "RPE progression: Deload target {:.1} must be below Accumulation target {:.1}",
        deload.target, acc.target
      ));
    }
  }

  violations
}

/// Rule 6
fn rpe_band_violations(phases: &[TrainingPhase]) -> Vec<String> {
  phases
    .iter()
    .filter_map(|p| p.rpe_target.map(|t| (p, t)))
    .filter_map(|(p, t)| {
      let width = t.max - t.min;
      if width > MAX_RPE_BAND {
        Some(format!(
          "Phase '{}': RPE band {:.1}-{:.1} is {:.1} points wide (max {:.0})",
          p.phase_name, t.min, t.max, width, MAX_RPE_BAND
        ))
      } else if t.min > t.max {
        Some(format!(
          "Phase '{}': RPE band min {:.1} above max {:.1}",
          p.phase_name, t.min, t.max
        ))
      } else {
        None
      }
    })
    .collect()
}

/// Rule 7
fn volume_violations(phases: &[TrainingPhase], landmarks: &MuscleLandmarks) -> Vec<String> {
  let mut violations = Vec::new();

  for phase in phases {
    let Some(distribution) = &phase.volume_distribution else {
      continue;
    };
    for entry in distribution {
      let muscle = entry.muscle_group;
      if let Some(lm) = landmarks.get(&muscle) {
        if entry.weekly_volume > lm.mrv {
          violations.push(format!(
            "Phase '{}': {} volume {} sets exceeds MRV {}",
            phase.phase_name, muscle, entry.weekly_volume, lm.mrv
          ));
        }
        if muscle.is_primary() && entry.weekly_volume < lm.mev {
          violations.push(format!(
            "Phase '{}': {} volume {} sets below MEV {}",
            phase.phase_name, muscle, entry.weekly_volume, lm.mev
          ));
        }
      }
      if entry.percentage_of_mav > MAX_PERCENT_OF_MAV {
        violations.push(format!(
          "Phase '{}': {} at {:.0}% of MAV (max {:.0}%)",
          phase.phase_name, muscle, entry.percentage_of_mav, MAX_PERCENT_OF_MAV
        ));
      }
    }
  }

  violations
}

/// Rule 8
fn weak_point_violations(program: &TrainingProgram, weak_points: &[WeakPointArea]) -> Vec<String> {
  let mut violations = Vec::new();
  let interventions = &program.weak_point_interventions;

  for area in weak_points {
    if !interventions.iter().any(|i| i.target_area == *area) {
      violations.push(format!("Weak point {} has no intervention", area));
    }
  }

  for iv in interventions {
    if iv.priority == Priority::High && iv.weekly_volume < MIN_HIGH_PRIORITY_VOLUME {
      violations.push(format!(
        "Intervention {}: High priority needs at least {} weekly sets, has {}",
        iv.target_area, MIN_HIGH_PRIORITY_VOLUME, iv.weekly_volume
      ));
    }
    if iv.reassessment_period_weeks > MAX_REASSESSMENT_WEEKS {
      violations.push(format!(
        "Intervention {}: reassessment every {} weeks exceeds {}",
        iv.target_area, iv.reassessment_period_weeks, MAX_REASSESSMENT_WEEKS
      ));
    }
    if iv.reassessment_period_weeks < 2 {
      violations.push(format!(
        "Intervention {}: reassessment period {} weeks is below 2",
        iv.target_area, iv.reassessment_period_weeks
      ));
    }
    if iv.current_ratio >= iv.target_ratio {
      violations.push(format!(
        "Intervention {}: current ratio {:.3} is not below target {:.3}",
        iv.target_area, iv.current_ratio, iv.target_ratio
      ));
    }
  }

  violations
}
