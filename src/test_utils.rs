//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Profile, scaffold and program factories
//! - Mock LLM providers with scripted responses

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{Completion, LlmError, LlmProvider};
use crate::models::{
  DayOfWeek, ExerciseCategory, ExerciseDetail, ExerciseTier, ExperienceLevel, MuscleGroup,
  NarrativeContent, PhaseType, ProgramScaffold, Reps, RpeTarget, ScaffoldDay, ScaffoldPhase,
  ScaffoldWeek, StrengthInputs, TrainingPhase, TrainingProgram, TrainingWeek, UserProfile,
  VolumeParameters, WorkoutDay,
};
use crate::prompt::{GenerationStep, Prompt};

/// ---------------------------------------------------------------------------
/// Factories
/// ---------------------------------------------------------------------------

/// Intermediate lifter, 140/100/180/50 kg (weak overhead press)
pub fn sample_profile() -> UserProfile {
  UserProfile {
    experience_level: ExperienceLevel::Intermediate,
    primary_goal: "Build strength".to_string(),
    training_frequency_days: 3,
    preferred_training_days: vec![DayOfWeek::Monday, DayOfWeek::Wednesday, DayOfWeek::Friday],
    session_duration_minutes: 75,
    program_duration_weeks: 4,
    equipment: vec!["barbell".to_string(), "dumbbells".to_string(), "rack".to_string()],
    limitations: None,
    volume_parameters: VolumeParameters::default(),
    strength: Some(StrengthInputs {
      squat_1rm: Some(140.0),
      bench_1rm: Some(100.0),
      deadlift_1rm: Some(180.0),
      overhead_press_1rm: Some(50.0),
      unit: "kg".to_string(),
    }),
  }
}

const TRAINING_DAY_ORDER: [DayOfWeek; 7] = [
  DayOfWeek::Monday,
  DayOfWeek::Wednesday,
  DayOfWeek::Friday,
  DayOfWeek::Tuesday,
  DayOfWeek::Thursday,
  DayOfWeek::Saturday,
  DayOfWeek::Sunday,
];

fn is_training_day(day: DayOfWeek, training_days: usize) -> bool {
  TRAINING_DAY_ORDER[..training_days.min(7)].contains(&day)
}

pub fn anchor_for(day: DayOfWeek) -> &'static str {
  match day {
    DayOfWeek::Monday => "Back Squat",
    DayOfWeek::Wednesday => "Bench Press",
    DayOfWeek::Friday => "Deadlift",
    DayOfWeek::Tuesday => "Overhead Press",
    DayOfWeek::Thursday => "Front Squat",
    DayOfWeek::Saturday => "Trap Bar Deadlift",
    DayOfWeek::Sunday => "Incline Bench Press",
  }
}

fn focus_for(day: DayOfWeek) -> &'static str {
  match day {
    DayOfWeek::Monday => "Lower Body Strength",
    DayOfWeek::Wednesday => "Upper Body Strength",
    DayOfWeek::Friday => "Posterior Chain",
    _ => "Full Body",
  }
}

const ACCUMULATION_RPE: RpeTarget = RpeTarget {
  min: 6.0,
  max: 8.0,
  target: 7.0,
};

/// Single Accumulation phase of `weeks` weeks, training Mon/Wed/Fri first
pub fn sample_scaffold(weeks: u32, training_days: usize) -> ProgramScaffold {
  ProgramScaffold {
    program_name: "Foundations Strength Block".to_string(),
    description: "Barbell strength base with weekly volume progression".to_string(),
    duration_weeks_total: weeks,
    periodization_model: "Block Periodization".to_string(),
    phases: vec![ScaffoldPhase {
      phase_name: "Accumulation Block".to_string(),
      phase_type: PhaseType::Accumulation,
      duration_weeks: weeks,
      primary_goal: "Build work capacity".to_string(),
      weeks: (1..=weeks)
        .map(|n| ScaffoldWeek {
          week_number: n,
          progression_strategy: "Add one set to accessories".to_string(),
          intensity_focus: "Moderate".to_string(),
          days: DayOfWeek::ALL
            .iter()
            .map(|&day| {
              let training = is_training_day(day, training_days);
              ScaffoldDay {
                day_of_week: day,
                is_rest_day: !training,
                focus: training.then(|| focus_for(day).to_string()),
              }
            })
            .collect(),
          weekly_volume_landmark: None,
        })
        .collect(),
      rpe_target: Some(ACCUMULATION_RPE),
      volume_distribution: None,
    }],
    weak_point_interventions: Vec::new(),
  }
}

/// Anchor (4 sets) plus two accessories (3 sets each), warm-up included
pub fn strength_day(day: DayOfWeek, anchor: &str) -> WorkoutDay {
  WorkoutDay {
    day_of_week: day,
    is_rest_day: false,
    focus: Some(focus_for(day).to_string()),
    exercises: vec![
      ExerciseDetail {
        name: anchor.to_string(),
        sets: 4,
        reps: Reps::Count(5),
        rest: "3 min".to_string(),
        rpe: Some(7.5),
        tier: ExerciseTier::Anchor,
        category: ExerciseCategory::AnchorLift,
        notes: String::new(),
        weight: "75% 1RM".to_string(),
        is_anchor_lift: true,
        muscle_groups: vec![MuscleGroup::Quads],
      },
      ExerciseDetail {
        name: "Chest-Supported Row".to_string(),
        sets: 3,
        reps: Reps::Range("8-12".to_string()),
        rest: "2 min".to_string(),
        rpe: Some(8.0),
        tier: ExerciseTier::Secondary,
        category: ExerciseCategory::CompoundAccessory,
        notes: String::new(),
        weight: "moderate".to_string(),
        is_anchor_lift: false,
        muscle_groups: vec![MuscleGroup::Back],
      },
      ExerciseDetail {
        name: "Hanging Leg Raise".to_string(),
        sets: 3,
        reps: Reps::Range("10-15".to_string()),
        rest: "60 s".to_string(),
        rpe: None,
        tier: ExerciseTier::Accessory,
        category: ExerciseCategory::Core,
        notes: String::new(),
        weight: "bodyweight".to_string(),
        is_anchor_lift: false,
        muscle_groups: Vec::new(),
      },
    ],
    warm_up: Some(vec!["5 min bike".to_string(), "Ramp-up sets".to_string()]),
    cool_down: Some(vec!["Hip flexor stretch".to_string()]),
    estimated_duration_minutes: Some(60),
  }
}

fn sample_narrative() -> NarrativeContent {
  NarrativeContent {
    coach_intro: "Welcome to your first block.".to_string(),
    general_advice: "Sleep eight hours and eat enough protein.".to_string(),
  }
}

/// `sample_scaffold` with every training day filled in
pub fn sample_program(weeks: u32, training_days: usize) -> TrainingProgram {
  let scaffold = sample_scaffold(weeks, training_days);
  let mut program = scaffold.to_program_shell(&sample_narrative());
  for session in scaffold.training_sessions() {
    let slot = session.slot;
    program.phases[slot.phase].weeks[slot.week].days[slot.day] =
      strength_day(session.day_of_week, anchor_for(session.day_of_week));
  }
  program
}

fn week(number: u32, light: bool) -> TrainingWeek {
  TrainingWeek {
    week_number: number,
    progression_strategy: "Linear load increase".to_string(),
    intensity_focus: "Moderate".to_string(),
    days: DayOfWeek::ALL
      .iter()
      .map(|&day| {
        if !is_training_day(day, 3) {
          return WorkoutDay::rest(day);
        }
        let mut session = strength_day(day, anchor_for(day));
        if light {
          session.exercises.pop();
        }
        session
      })
      .collect(),
    weekly_volume_landmark: None,
  }
}

fn phase(name: &str, phase_type: PhaseType, weeks: &[u32], rpe: RpeTarget) -> TrainingPhase {
  TrainingPhase {
    phase_name: name.to_string(),
    phase_type,
    duration_weeks: weeks.len() as u32,
    primary_goal: format!("{} goals", name),
    weeks: weeks
      .iter()
      .map(|&n| week(n, phase_type == PhaseType::Deload))
      .collect(),
    rpe_target: Some(rpe),
    volume_distribution: None,
  }
}

/// Four-phase block with rising RPE targets and a lighter deload week
pub fn periodized_program() -> TrainingProgram {
  let narrative = sample_narrative();
  TrainingProgram {
    program_name: "Peaking Block".to_string(),
    description: "Accumulate, intensify, realize, then deload".to_string(),
    duration_weeks_total: 6,
    periodization_model: "Block Periodization".to_string(),
    coach_intro: narrative.coach_intro,
    general_advice: narrative.general_advice,
    phases: vec![
      phase("Accumulation", PhaseType::Accumulation, &[1, 2], ACCUMULATION_RPE),
      phase(
        "Intensification",
        PhaseType::Intensification,
        &[3, 4],
        RpeTarget { min: 7.0, max: 9.0, target: 8.0 },
      ),
      phase(
        "Realization",
        PhaseType::Realization,
        &[5],
        RpeTarget { min: 8.0, max: 9.5, target: 9.0 },
      ),
      phase(
        "Deload",
        PhaseType::Deload,
        &[6],
        RpeTarget { min: 5.0, max: 7.0, target: 6.0 },
      ),
    ],
    weak_point_interventions: Vec::new(),
  }
}

/// ---------------------------------------------------------------------------
/// Mock Providers
/// ---------------------------------------------------------------------------

const NOT_JSON: &str = "Sorry, I can't help with that right now.";

/// Returns non-JSON text for the first `failures` calls, then `body`
pub struct FlakyProvider {
  failures: u32,
  body: String,
  delay: Option<Duration>,
  lose_credentials: bool,
  calls: AtomicU32,
}

impl FlakyProvider {
  pub fn new(failures: u32, body: &str) -> Self {
    Self {
      failures,
      body: body.to_string(),
      delay: None,
      lose_credentials: false,
      calls: AtomicU32::new(0),
    }
  }

  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  /// Answer `MissingApiKey` instead of the body once the bad responses run out
  pub fn then_lose_credentials(mut self) -> Self {
    self.lose_credentials = true;
    self
  }

  pub fn calls(&self) -> u32 {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl LlmProvider for FlakyProvider {
  async fn complete(&self, _prompt: &Prompt) -> Result<Completion, LlmError> {
    let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }
    if n <= self.failures {
      Ok(Completion::text(NOT_JSON))
    } else if self.lose_credentials {
      Err(LlmError::MissingApiKey)
    } else {
      Ok(Completion::text(self.body.clone()))
    }
  }

  fn model_version(&self) -> String {
    "flaky-model".to_string()
  }
}

/// Answers each generation step from fixtures
///
/// Session responses are derived from the prompt's day and week lines, so
/// every call's answer is independent of call order.
pub struct ScriptedProvider {
  scaffold: String,
  narrative: String,
  failures: Mutex<HashMap<GenerationStep, u32>>,
  calls: Mutex<HashMap<GenerationStep, u32>>,
  staggered: bool,
  session_delay: Option<Duration>,
  anchor_rpe: Option<f64>,
}

impl ScriptedProvider {
  pub fn new(scaffold: &ProgramScaffold) -> Self {
    Self {
      scaffold: serde_json::to_string(scaffold).unwrap(),
      narrative: serde_json::to_string(&sample_narrative()).unwrap(),
      failures: Mutex::new(HashMap::new()),
      calls: Mutex::new(HashMap::new()),
      staggered: false,
      session_delay: None,
      anchor_rpe: None,
    }
  }

  /// Reject the next `times` responses for `step`
  pub fn failing(self, step: GenerationStep, times: u32) -> Self {
    self.failures.lock().unwrap().insert(step, times);
    self
  }

  /// Delay sessions so later weekdays finish first
  pub fn staggered(mut self) -> Self {
    self.staggered = true;
    self
  }

  pub fn with_session_delay(mut self, delay: Duration) -> Self {
    self.session_delay = Some(delay);
    self
  }

  pub fn with_anchor_rpe(mut self, rpe: f64) -> Self {
    self.anchor_rpe = Some(rpe);
    self
  }

  pub fn calls(&self, step: GenerationStep) -> u32 {
    self.calls.lock().unwrap().get(&step).copied().unwrap_or(0)
  }

  fn should_fail(&self, step: GenerationStep) -> bool {
    let mut failures = self.failures.lock().unwrap();
    match failures.get_mut(&step) {
      Some(remaining) if *remaining > 0 => {
        *remaining -= 1;
        true
      }
      _ => false,
    }
  }

  fn session_for(&self, prompt: &Prompt) -> (WorkoutDay, u32) {
    let day: DayOfWeek = prompt_field(&prompt.user, "- Day: ").unwrap().parse().unwrap();
    let week: u32 = prompt_field(&prompt.user, "- Week number: ")
      .unwrap()
      .parse()
      .unwrap();

    let mut session = strength_day(day, anchor_for(day));
    session.exercises[0].notes = format!("Week {}", week);
    if let Some(rpe) = self.anchor_rpe {
      session.exercises[0].rpe = Some(rpe);
    }
    (session, week)
  }
}

fn prompt_field<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
  text.lines().find_map(|line| line.strip_prefix(prefix)).map(str::trim)
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
  async fn complete(&self, prompt: &Prompt) -> Result<Completion, LlmError> {
    *self.calls.lock().unwrap().entry(prompt.step).or_insert(0) += 1;

    let body = match prompt.step {
      GenerationStep::MacroStructure => self.scaffold.clone(),
      GenerationStep::Narrative => self.narrative.clone(),
      GenerationStep::SessionDetail => {
        let (session, week) = self.session_for(prompt);
        let delay = match (self.session_delay, self.staggered) {
          (Some(delay), _) => Some(delay),
          (None, true) => {
            let index = DayOfWeek::ALL
              .iter()
              .position(|d| *d == session.day_of_week)
              .unwrap_or(0) as u64;
            Some(Duration::from_millis((6 - index) * 4 + u64::from(week % 3) * 2))
          }
          (None, false) => None,
        };
        if let Some(delay) = delay {
          tokio::time::sleep(delay).await;
        }
        serde_json::to_string(&session).unwrap()
      }
    };

    if self.should_fail(prompt.step) {
      return Ok(Completion::text(NOT_JSON));
    }
    Ok(Completion::text(body))
  }

  fn model_version(&self) -> String {
    "scripted-model".to_string()
  }
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::guardian::review;
  use crate::schema::{validate_program, ValidationContext};

  #[test]
  fn test_fixtures_are_clean() {
    for program in [sample_program(4, 3), periodized_program()] {
      assert!(validate_program(&program, &ValidationContext::default()).is_valid);
      assert!(review(&program).findings.is_empty());
    }
  }

  #[test]
  fn test_training_day_selection() {
    let scaffold = sample_scaffold(1, 4);
    let days: Vec<DayOfWeek> = scaffold
      .training_sessions()
      .iter()
      .map(|s| s.day_of_week)
      .collect();
    assert_eq!(
      days,
      vec![DayOfWeek::Monday, DayOfWeek::Tuesday, DayOfWeek::Wednesday, DayOfWeek::Friday]
    );
  }

  #[tokio::test]
  async fn test_scripted_session_follows_prompt() {
    let profile = sample_profile();
    let scaffold = sample_scaffold(2, 3);
    let session = &scaffold.training_sessions()[5];
    let prompt = crate::prompt::build_session_prompt(&profile, session);

    let provider = ScriptedProvider::new(&scaffold);
    let completion = provider.complete(&prompt).await.unwrap();
    let day: WorkoutDay = serde_json::from_str(&completion.text).unwrap();

    assert_eq!(day.day_of_week, DayOfWeek::Friday);
    assert_eq!(day.exercises[0].name, "Deadlift");
    assert_eq!(day.exercises[0].notes, "Week 2");
    assert_eq!(provider.calls(GenerationStep::SessionDetail), 1);
  }
}
