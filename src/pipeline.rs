//! Generation pipeline
//!
//! Runs the three provider steps in order, fans the per-day session calls
//! out, assembles the results into the scaffold and validates the finished
//! program. The public entry point never returns an error: every failure is
//! folded into a [`GenerationResult`] with the metadata gathered so far.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::analysis::{
  calculate_all_muscle_landmarks, enhanced_weak_point_analysis, WeakPointAnalysis,
};
use crate::config::{GenerationConfig, ValidationLevel};
use crate::guardian::{self, GuardianFinding, GuardianReport};
use crate::llm::{generate_with_retry, CallStats, Generated, LlmError, LlmProvider};
use crate::models::{
  DaySlot, MuscleLandmarks, NarrativeContent, ProgramScaffold, SessionContext, TrainingProgram,
  UserProfile, WorkoutDay,
};
use crate::prompt::{
  build_macro_structure_prompt, build_narrative_prompt, build_session_prompt, GenerationStep,
  Prompt,
};
use crate::schema::{validate_program, SchemaReport, Validate, ValidationContext};

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
  #[error("slot {0} received more than one session")]
  DuplicateSlot(DaySlot),

  #[error("slot {0} does not exist in the scaffold")]
  SlotOutOfRange(DaySlot),

  #[error("slot {0} is a rest day in the scaffold")]
  RestDaySlot(DaySlot),

  #[error("no session returned for {}", join_slots(.0))]
  MissingSlots(Vec<DaySlot>),
}

fn join_slots(slots: &[DaySlot]) -> String {
  slots.iter().map(DaySlot::to_string).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("Failed to generate {step}: {source}")]
  Generation {
    step: GenerationStep,
    #[source]
    source: LlmError,
  },

  #[error("Failed to assemble program: {0}")]
  Assembly(#[from] AssemblyError),

  #[error("Program failed validation: {0}")]
  Validation(String),

  #[error("Generation exceeded its {0:?} deadline")]
  DeadlineExceeded(Duration),

  #[error("Invalid stage transition from {from:?} to {to:?}")]
  InvalidTransition {
    from: GenerationStage,
    to: GenerationStage,
  },
}

impl PipelineError {
  fn generation(step: GenerationStep) -> impl FnOnce(LlmError) -> Self {
    move |source| PipelineError::Generation { step, source }
  }
}

impl Serialize for PipelineError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Run State
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationStage {
  NotStarted,
  MacroStructureGenerated,
  SessionsGenerated,
  NarrativeGenerated,
  Assembled,
  Validated,
  Succeeded,
  Failed,
}

impl GenerationStage {
  /// Steps completed on reaching this stage; None for terminal stages
  pub fn ordinal(&self) -> Option<u8> {
    match self {
      GenerationStage::NotStarted => Some(0),
      GenerationStage::MacroStructureGenerated => Some(1),
      GenerationStage::SessionsGenerated => Some(2),
      GenerationStage::NarrativeGenerated => Some(3),
      GenerationStage::Assembled => Some(4),
      GenerationStage::Validated => Some(5),
      GenerationStage::Succeeded | GenerationStage::Failed => None,
    }
  }

  fn successor(&self) -> Option<GenerationStage> {
    match self {
      GenerationStage::NotStarted => Some(GenerationStage::MacroStructureGenerated),
      GenerationStage::MacroStructureGenerated => Some(GenerationStage::SessionsGenerated),
      GenerationStage::SessionsGenerated => Some(GenerationStage::NarrativeGenerated),
      GenerationStage::NarrativeGenerated => Some(GenerationStage::Assembled),
      GenerationStage::Assembled => Some(GenerationStage::Validated),
      GenerationStage::Validated => Some(GenerationStage::Succeeded),
      GenerationStage::Succeeded | GenerationStage::Failed => None,
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, GenerationStage::Succeeded | GenerationStage::Failed)
  }

  /// Move one stage forward, or to `Failed` from any non-terminal stage
  pub fn advance(self, to: GenerationStage) -> Result<GenerationStage, PipelineError> {
    let allowed = match to {
      GenerationStage::Failed => !self.is_terminal(),
      _ => self.successor() == Some(to),
    };
    if allowed {
      Ok(to)
    } else {
      Err(PipelineError::InvalidTransition { from: self, to })
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
  pub steps_completed: u8,
  pub llm_calls: u32,
  pub retry_attempts: u32,
  pub total_generation_time_ms: u64,
  pub anchor_lifts: Vec<String>,
  pub phase_volumes: Vec<String>,
  pub model_version: String,
}

/// Findings a lenient run accepted instead of failing on
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationWarning {
  pub guardian_summary: String,
  pub findings: Vec<GuardianFinding>,
  pub schema_violations: Vec<String>,
  pub schema_errors: Vec<String>,
}

impl ValidationWarning {
  fn from_reports(schema: &SchemaReport, guardian: &GuardianReport) -> Self {
    Self {
      guardian_summary: guardian.summary.clone(),
      findings: guardian.findings.clone(),
      schema_violations: schema.violations.clone(),
      schema_errors: schema.errors.clone(),
    }
  }

  /// Flat, human-readable list of everything waived
  pub fn messages(&self) -> Vec<String> {
    let guardian = self
      .findings
      .iter()
      .map(|f| format!("[{:?}] {}", f.severity, f.message));
    let schema = self
      .schema_errors
      .iter()
      .chain(&self.schema_violations)
      .map(|m| format!("[Schema] {}", m));
    guardian.chain(schema).collect()
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
  pub success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub program: Option<TrainingProgram>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub validation_warning: Option<ValidationWarning>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub schema_report: Option<SchemaReport>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub guardian_report: Option<GuardianReport>,
  pub metadata: GenerationMetadata,
}

struct RunState {
  stage: GenerationStage,
  stats: CallStats,
  metadata: GenerationMetadata,
  schema_report: Option<SchemaReport>,
  guardian_report: Option<GuardianReport>,
}

impl RunState {
  fn new(model_version: String) -> Self {
    Self {
      stage: GenerationStage::NotStarted,
      stats: CallStats::default(),
      metadata: GenerationMetadata {
        model_version,
        ..Default::default()
      },
      schema_report: None,
      guardian_report: None,
    }
  }

  fn advance(&mut self, to: GenerationStage) -> Result<(), PipelineError> {
    self.stage = self.stage.advance(to)?;
    if let Some(steps) = to.ordinal() {
      self.metadata.steps_completed = steps;
    }
    info!(stage = ?to, "Generation stage reached");
    Ok(())
  }
}

struct Accepted {
  program: TrainingProgram,
  warning: Option<ValidationWarning>,
}

/// A session response, which must describe a training day
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct TrainingSession(WorkoutDay);

impl Validate for TrainingSession {
  fn validate(&self) -> Vec<String> {
    if self.0.is_rest_day {
      return vec![format!(
        "{}: expected a training session, got a rest day",
        self.0.day_of_week
      )];
    }
    self.0.validate()
  }
}

/// ---------------------------------------------------------------------------
/// Generator
/// ---------------------------------------------------------------------------

pub struct ProgramGenerator<P> {
  provider: P,
  config: GenerationConfig,
}

impl<P: LlmProvider> ProgramGenerator<P> {
  pub fn new(provider: P, config: GenerationConfig) -> Self {
    Self { provider, config }
  }

  pub fn provider(&self) -> &P {
    &self.provider
  }

  pub fn config(&self) -> &GenerationConfig {
    &self.config
  }

  /// Generate a complete program for `profile`
  pub async fn generate_program(&self, profile: &UserProfile) -> GenerationResult {
    let started = Instant::now();
    let mut run = RunState::new(self.provider.model_version());

    info!(
      experience = profile.experience_level.as_str(),
      weeks = profile.program_duration_weeks,
      parallel = self.config.enable_parallel_generation,
      "Starting program generation"
    );

    let outcome = match self.config.pipeline_deadline {
      Some(limit) => match tokio::time::timeout(limit, self.run(profile, &mut run)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(PipelineError::DeadlineExceeded(limit)),
      },
      None => self.run(profile, &mut run).await,
    };

    run.metadata.llm_calls = run.stats.llm_calls;
    run.metadata.retry_attempts = run.stats.retries;
    run.metadata.total_generation_time_ms = started.elapsed().as_millis() as u64;

    match outcome.and_then(|accepted| run.advance(GenerationStage::Succeeded).map(|_| accepted)) {
      Ok(accepted) => {
        info!(
          llm_calls = run.metadata.llm_calls,
          retries = run.metadata.retry_attempts,
          ms = run.metadata.total_generation_time_ms,
          "Program generation succeeded"
        );
        GenerationResult {
          success: true,
          program: Some(accepted.program),
          error: None,
          validation_warning: accepted.warning,
          schema_report: run.schema_report,
          guardian_report: run.guardian_report,
          metadata: run.metadata,
        }
      }
      Err(e) => {
        run.stage = GenerationStage::Failed;
        error!(
          steps_completed = run.metadata.steps_completed,
          error = %e,
          "Program generation failed"
        );
        GenerationResult {
          success: false,
          program: None,
          error: Some(e.to_string()),
          validation_warning: None,
          schema_report: run.schema_report,
          guardian_report: run.guardian_report,
          metadata: run.metadata,
        }
      }
    }
  }

  async fn run(&self, profile: &UserProfile, run: &mut RunState) -> Result<Accepted, PipelineError> {
    let landmarks = calculate_all_muscle_landmarks(&profile.volume_parameters);
    let analysis = match profile.strength_profile() {
      Some(strength) => Some(enhanced_weak_point_analysis(&strength)),
      None => {
        debug!("Strength data incomplete, skipping weak point analysis");
        None
      }
    };

    // Step 1: macro-structure
    let prompt = build_macro_structure_prompt(profile, &landmarks, analysis.as_ref());
    let scaffold: ProgramScaffold = self
      .call(&prompt, &mut run.stats)
      .await
      .map_err(PipelineError::generation(GenerationStep::MacroStructure))?;
    run.advance(GenerationStage::MacroStructureGenerated)?;
    debug!(
      phases = scaffold.phases.len(),
      total_days = scaffold.total_days(),
      "Scaffold accepted"
    );

    // Step 2: one call per training day
    let sessions = scaffold.training_sessions();
    let days = self
      .generate_sessions(profile, &sessions, &mut run.stats)
      .await
      .map_err(PipelineError::generation(GenerationStep::SessionDetail))?;
    run.advance(GenerationStage::SessionsGenerated)?;

    // Step 3: narrative
    let mut anchors: Vec<String> = days
      .iter()
      .filter_map(|(_, day)| day.anchor())
      .map(|e| e.name.clone())
      .collect();
    anchors.sort();
    anchors.dedup();
    let prompt = build_narrative_prompt(profile, &scaffold, &anchors);
    let narrative: NarrativeContent = self
      .call(&prompt, &mut run.stats)
      .await
      .map_err(PipelineError::generation(GenerationStep::Narrative))?;
    run.advance(GenerationStage::NarrativeGenerated)?;

    let mut program = assemble(&scaffold, &narrative, days)?;
    if let Some(analysis) = &analysis {
      add_missing_interventions(&mut program, analysis);
    }
    run.advance(GenerationStage::Assembled)?;
    run.metadata.anchor_lifts = program.anchor_lifts();
    run.metadata.phase_volumes = program.phase_volume_summary();

    let weak_points = analysis.map(|a| a.primary_weak_points).unwrap_or_default();
    let ctx = ValidationContext {
      landmarks: Some(&landmarks),
      weak_points: &weak_points,
    };
    let schema_report = validate_program(&program, &ctx);
    let guardian_report = guardian::review(&program);
    run.advance(GenerationStage::Validated)?;

    let verdict = judge(self.config.validation_level, &schema_report, &guardian_report);
    run.schema_report = Some(schema_report);
    run.guardian_report = Some(guardian_report);

    let warning = verdict?;
    if let Some(w) = &warning {
      warn!(
        summary = %w.guardian_summary,
        schema_violations = w.schema_violations.len(),
        "Program accepted with validation warnings"
      );
    }

    Ok(Accepted { program, warning })
  }

  async fn call<T>(&self, prompt: &Prompt, stats: &mut CallStats) -> Result<T, LlmError>
  where
    T: DeserializeOwned + Validate,
  {
    let result = generate_with_retry::<T, _>(
      &self.provider,
      prompt,
      self.config.max_retries,
      self.config.call_timeout,
    )
    .await;
    settle(result, stats)
  }

  /// Fan out session calls; the first failure aborts and drops the rest
  async fn generate_sessions(
    &self,
    profile: &UserProfile,
    sessions: &[SessionContext],
    stats: &mut CallStats,
  ) -> Result<Vec<(DaySlot, WorkoutDay)>, LlmError> {
    let tasks = sessions.iter().map(|session| async move {
      let prompt = build_session_prompt(profile, session);
      let result = generate_with_retry::<TrainingSession, _>(
        &self.provider,
        &prompt,
        self.config.max_retries,
        self.config.call_timeout,
      )
      .await
      .map(|g| Generated {
        value: place(g.value.0, session),
        stats: g.stats,
      });
      (session.slot, result)
    });

    let mut days = Vec::with_capacity(sessions.len());

    if self.config.enable_parallel_generation {
      let limit = self.config.max_concurrency.unwrap_or(sessions.len()).max(1);
      debug!(sessions = sessions.len(), limit, "Generating sessions concurrently");
      let mut pending = stream::iter(tasks).buffer_unordered(limit);
      while let Some((slot, result)) = pending.next().await {
        days.push((slot, settle(result, stats)?));
      }
    } else {
      debug!(sessions = sessions.len(), "Generating sessions sequentially");
      for task in tasks {
        let (slot, result) = task.await;
        days.push((slot, settle(result, stats)?));
      }
    }

    Ok(days)
  }
}

fn settle<T>(result: Result<Generated<T>, LlmError>, stats: &mut CallStats) -> Result<T, LlmError> {
  match result {
    Ok(generated) => {
      stats.absorb(generated.stats);
      Ok(generated.value)
    }
    Err(e) => {
      stats.absorb(CallStats::from_attempts(e.attempts()));
      Err(e)
    }
  }
}

/// Pin a session response to the day it was requested for
fn place(mut day: WorkoutDay, session: &SessionContext) -> WorkoutDay {
  if day.day_of_week != session.day_of_week {
    debug!(
      slot = %session.slot,
      returned = %day.day_of_week,
      expected = %session.day_of_week,
      "Session came back for the wrong weekday, correcting"
    );
    day.day_of_week = session.day_of_week;
  }
  if day.focus.is_none() {
    day.focus = Some(session.focus.clone());
  }
  day
}

/// ---------------------------------------------------------------------------
/// Assembly
/// ---------------------------------------------------------------------------

/// Write each session into its slot of a copy of the scaffold
///
/// Arrival order does not matter. Every training day in the scaffold must be
/// filled exactly once.
pub fn assemble(
  scaffold: &ProgramScaffold,
  narrative: &NarrativeContent,
  days: Vec<(DaySlot, WorkoutDay)>,
) -> Result<TrainingProgram, AssemblyError> {
  let mut program = scaffold.to_program_shell(narrative);
  let mut filled = BTreeSet::new();

  for (slot, day) in days {
    let planned = scaffold
      .phases
      .get(slot.phase)
      .and_then(|p| p.weeks.get(slot.week))
      .and_then(|w| w.days.get(slot.day))
      .ok_or(AssemblyError::SlotOutOfRange(slot))?;
    if planned.is_rest_day {
      return Err(AssemblyError::RestDaySlot(slot));
    }
    if !filled.insert(slot) {
      return Err(AssemblyError::DuplicateSlot(slot));
    }

    let target = program
      .phases
      .get_mut(slot.phase)
      .and_then(|p| p.weeks.get_mut(slot.week))
      .and_then(|w| w.days.get_mut(slot.day))
      .ok_or(AssemblyError::SlotOutOfRange(slot))?;
    *target = day;
  }

  let missing: Vec<DaySlot> = scaffold
    .training_sessions()
    .into_iter()
    .map(|s| s.slot)
    .filter(|slot| !filled.contains(slot))
    .collect();
  if !missing.is_empty() {
    return Err(AssemblyError::MissingSlots(missing));
  }

  Ok(program)
}

/// Cover every analysed weak point the scaffold left without an intervention
fn add_missing_interventions(program: &mut TrainingProgram, analysis: &WeakPointAnalysis) {
  for intervention in analysis.recommended_interventions() {
    let covered = program
      .weak_point_interventions
      .iter()
      .any(|i| i.target_area == intervention.target_area);
    if !covered {
      info!(area = %intervention.target_area, "Adding recommended weak point intervention");
      program.weak_point_interventions.push(intervention);
    }
  }
}

/// ---------------------------------------------------------------------------
/// Validation Policy
/// ---------------------------------------------------------------------------

/// Decide whether a validated program is accepted
///
/// Critical findings always fail. Strict runs also fail on any Major finding
/// or schema problem. Whatever is accepted despite findings comes back as a
/// warning.
fn judge(
  level: ValidationLevel,
  schema: &SchemaReport,
  guardian: &GuardianReport,
) -> Result<Option<ValidationWarning>, PipelineError> {
  if guardian.has_critical() {
    return Err(PipelineError::Validation(guardian.critical_messages().join("; ")));
  }

  if level == ValidationLevel::Strict && (!guardian.passed || !schema.is_valid) {
    let warning = ValidationWarning::from_reports(schema, guardian);
    return Err(PipelineError::Validation(warning.messages().join("; ")));
  }

  if guardian.findings.is_empty() && schema.is_valid {
    Ok(None)
  } else {
    Ok(Some(ValidationWarning::from_reports(schema, guardian)))
  }
}

/// Landmarks the pipeline computes for `profile`, for callers persisting a result
pub fn landmarks_for(profile: &UserProfile) -> MuscleLandmarks {
  calculate_all_muscle_landmarks(&profile.volume_parameters)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
