//! Guardian: post-hoc review of an assembled program
//!
//! A second opinion that looks only at the finished document. It does not
//! share code with the schema layer on purpose, so a blind spot in one
//! validator is not automatically a blind spot in the other.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::{PhaseType, TrainingProgram, WorkoutDay};

/// Daily working sets above this are flagged as junk volume
const MAX_DAILY_SETS: u32 = 30;
/// Slack allowed between an exercise RPE and its phase ceiling
const RPE_DRIFT_ALLOWANCE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
  Critical,
  Major,
  Minor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
  Structure,
  Exercise,
  Intensity,
  Volume,
  Recovery,
  Content,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuardianFinding {
  pub category: FindingCategory,
  pub severity: Severity,
  pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuardianReport {
  /// No Critical or Major findings
  pub passed: bool,
  pub findings: Vec<GuardianFinding>,
  pub summary: String,
}

impl GuardianReport {
  pub fn has_critical(&self) -> bool {
    self.findings.iter().any(|f| f.severity == Severity::Critical)
  }

  pub fn critical_messages(&self) -> Vec<&str> {
    self
      .findings
      .iter()
      .filter(|f| f.severity == Severity::Critical)
      .map(|f| f.message.as_str())
      .collect()
  }

  pub fn messages(&self) -> Vec<String> {
    self
      .findings
      .iter()
      .map(|f| format!("[{:?}] {}", f.severity, f.message))
      .collect()
  }
}

struct Findings(Vec<GuardianFinding>);

impl Findings {
  fn push(&mut self, category: FindingCategory, severity: Severity, message: String) {
    self.0.push(GuardianFinding {
      category,
      severity,
      message,
    });
  }
}

/// Review a finished program
pub fn review(program: &TrainingProgram) -> GuardianReport {
  let mut findings = Findings(Vec::new());

  review_structure(program, &mut findings);
  for phase in &program.phases {
    for week in &phase.weeks {
      let label = format!("{} wk{}", phase.phase_name, week.week_number);
      for day in &week.days {
        review_day(&label, day, phase.rpe_target.map(|t| t.max), &mut findings);
      }
      let training_days = week.days.iter().filter(|d| !d.is_rest_day).count();
      if training_days == week.days.len() && !week.days.is_empty() {
        findings.push(
          FindingCategory::Recovery,
          Severity::Major,
          format!("{}: no rest day in the week", label),
        );
      }
    }
  }
  review_deloads(program, &mut findings);
  review_content(program, &mut findings);

  let mut findings = findings.0;
  findings.sort_by_key(|f| f.severity);

  let passed = !findings
    .iter()
    .any(|f| matches!(f.severity, Severity::Critical | Severity::Major));
  let count = |s: Severity| findings.iter().filter(|f| f.severity == s).count();
  let summary = format!(
    "{}: {} critical, {} major, {} minor",
    if passed { "PASSED" } else { "FAILED" },
    count(Severity::Critical),
    count(Severity::Major),
    count(Severity::Minor)
  );

  GuardianReport {
    passed,
    findings,
    summary,
  }
}

fn review_structure(program: &TrainingProgram, findings: &mut Findings) {
  if program.phases.is_empty() {
    findings.push(
      FindingCategory::Structure,
      Severity::Critical,
      "Program has no phases".to_string(),
    );
    return;
  }

  let total: u32 = program.phases.iter().map(|p| p.duration_weeks).sum();
  if total != program.duration_weeks_total {
    findings.push(
      FindingCategory::Structure,
      Severity::Critical,
      format!(
        "Phase durations total {} weeks, program declares {}",
        total, program.duration_weeks_total
      ),
    );
  }

  for phase in &program.phases {
    if phase.weeks.len() as u32 != phase.duration_weeks {
      findings.push(
        FindingCategory::Structure,
        Severity::Critical,
        format!(
          "{}: {} weeks generated for a {}-week phase",
          phase.phase_name,
          phase.weeks.len(),
          phase.duration_weeks
        ),
      );
    }
    for week in &phase.weeks {
      let unique: HashSet<_> = week.days.iter().map(|d| d.day_of_week).collect();
      if week.days.len() != 7 || unique.len() != 7 {
        findings.push(
          FindingCategory::Structure,
          Severity::Critical,
          format!(
            "{} wk{}: {} days ({} distinct), expected all 7 weekdays",
            phase.phase_name,
            week.week_number,
            week.days.len(),
            unique.len()
          ),
        );
      }
    }
  }
}

fn review_day(label: &str, day: &WorkoutDay, rpe_ceiling: Option<f64>, findings: &mut Findings) {
  if day.is_rest_day {
    if !day.exercises.is_empty() {
      findings.push(
        FindingCategory::Recovery,
        Severity::Major,
        format!("{} {}: rest day contains exercises", label, day.day_of_week),
      );
    }
    return;
  }

  let at = format!("{} {}", label, day.day_of_week);
  if day.exercises.is_empty() {
    findings.push(
      FindingCategory::Exercise,
      Severity::Critical,
      format!("{}: training day has no exercises", at),
    );
    return;
  }

  let anchors = day
    .exercises
    .iter()
    .filter(|e| e.is_anchor())
    .count();
  let first_is_anchor = day.exercises[0].is_anchor();
  match anchors {
    0 => findings.push(
      FindingCategory::Exercise,
      Severity::Critical,
      format!("{}: missing anchor lift", at),
    ),
    1 if !first_is_anchor => findings.push(
      FindingCategory::Exercise,
      Severity::Critical,
      format!("{}: anchor lift is not the first exercise", at),
    ),
    1 => {}
    n => findings.push(
      FindingCategory::Exercise,
      Severity::Critical,
      format!("{}: {} anchor lifts, expected one", at, n),
    ),
  }

  let mut names = HashSet::new();
  for exercise in &day.exercises {
    if exercise.sets == 0 {
      findings.push(
        FindingCategory::Volume,
        Severity::Critical,
        format!("{}: {} has zero sets", at, exercise.name),
      );
    }
    if let Some(rpe) = exercise.rpe {
      if !(1.0..=10.0).contains(&rpe) {
        findings.push(
          FindingCategory::Intensity,
          Severity::Major,
          format!("{}: {} RPE {} is off the 1-10 scale", at, exercise.name, rpe),
        );
      } else if let Some(ceiling) = rpe_ceiling {
        if rpe > ceiling + RPE_DRIFT_ALLOWANCE {
          findings.push(
            FindingCategory::Intensity,
            Severity::Major,
            format!(
              "{}: {} RPE {} exceeds phase ceiling {}",
              at, exercise.name, rpe, ceiling
            ),
          );
        }
      }
    }
    if !names.insert(exercise.name.to_lowercase()) {
      findings.push(
        FindingCategory::Exercise,
        Severity::Minor,
        format!("{}: {} listed twice", at, exercise.name),
      );
    }
  }

  let total_sets = day.total_sets();
  if total_sets > MAX_DAILY_SETS {
    findings.push(
      FindingCategory::Volume,
      Severity::Major,
      format!("{}: {} working sets in one session", at, total_sets),
    );
  }

  if day.warm_up.as_ref().map_or(true, |w| w.is_empty()) {
    findings.push(
      FindingCategory::Recovery,
      Severity::Minor,
      format!("{}: no warm-up prescribed", at),
    );
  }
}

/// A deload must carry less weekly volume than the block before it
fn review_deloads(program: &TrainingProgram, findings: &mut Findings) {
  for pair in program.phases.windows(2) {
    let (prev, next) = (&pair[0], &pair[1]);
    if next.phase_type != PhaseType::Deload || prev.phase_type == PhaseType::Deload {
      continue;
    }
    let before = prev.average_weekly_sets();
    let during = next.average_weekly_sets();
    if before > 0.0 && during >= before {
      findings.push(
        FindingCategory::Recovery,
        Severity::Major,
        format!(
          "{}: deload volume {:.1} sets/week is not below {} ({:.1})",
          next.phase_name, during, prev.phase_name, before
        ),
      );
    }
  }
}

fn review_content(program: &TrainingProgram, findings: &mut Findings) {
  if program.coach_intro.trim().is_empty() {
    findings.push(
      FindingCategory::Content,
      Severity::Minor,
      "Coach introduction is empty".to_string(),
    );
  }
  if program.general_advice.trim().is_empty() {
    findings.push(
      FindingCategory::Content,
      Severity::Minor,
      "General advice is empty".to_string(),
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{DayOfWeek, ExerciseCategory};
  use crate::test_utils::{periodized_program, sample_program, strength_day};

  #[test]
  fn test_clean_program_passes() {
    let report = review(&sample_program(4, 3));
    assert!(report.passed, "{:?}", report.findings);
    assert!(report.findings.is_empty());
    assert_eq!(report.summary, "PASSED: 0 critical, 0 major, 0 minor");
  }

  #[test]
  fn test_missing_anchor_is_critical() {
    let mut program = sample_program(1, 3);
    program.phases[0].weeks[0].days[0].exercises.remove(0);
    let report = review(&program);

    assert!(!report.passed);
    assert!(report.has_critical());
    assert_eq!(
      report.critical_messages(),
      vec!["Accumulation Block wk1 Monday: missing anchor lift"]
    );
  }

  #[test]
  fn test_anchor_tier_alone_is_not_an_anchor() {
    let mut program = sample_program(1, 3);
    program.phases[0].weeks[0].days[0].exercises[0].category = ExerciseCategory::CompoundAccessory;
    let report = review(&program);

    assert!(!report.passed);
    assert_eq!(
      report.critical_messages(),
      vec!["Accumulation Block wk1 Monday: missing anchor lift"]
    );
  }

  #[test]
  fn test_anchor_in_second_position_is_critical() {
    let mut program = sample_program(1, 3);
    let day = &mut program.phases[0].weeks[0].days[0];
    day.exercises.swap(0, 1);
    day.exercises[0].is_anchor_lift = true;
    let report = review(&program);

    assert!(!report.passed);
    assert_eq!(
      report.critical_messages(),
      vec!["Accumulation Block wk1 Monday: anchor lift is not the first exercise"]
    );
  }

  #[test]
  fn test_duration_mismatch_is_critical() {
    let mut program = sample_program(2, 3);
    program.duration_weeks_total = 3;
    let report = review(&program);

    assert!(report.critical_messages()[0].contains("total 2 weeks, program declares 3"));
  }

  #[test]
  fn test_missing_warm_up_is_minor_and_passes() {
    let mut program = sample_program(1, 3);
    program.phases[0].weeks[0].days[0].warm_up = None;
    let report = review(&program);

    assert!(report.passed);
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].severity, Severity::Minor);
    assert_eq!(report.findings[0].category, FindingCategory::Recovery);
  }

  #[test]
  fn test_rpe_drift_is_major() {
    let mut program = sample_program(1, 3);
    // phase ceiling is 8.0
    program.phases[0].weeks[0].days[0].exercises[0].rpe = Some(9.5);
    let report = review(&program);

    assert!(!report.passed);
    assert!(!report.has_critical());
    assert_eq!(report.findings[0].category, FindingCategory::Intensity);
  }

  #[test]
  fn test_deload_volume_must_drop() {
    let mut program = periodized_program();
    assert!(review(&program).passed);

    let heavy_week = program.phases[2].weeks[0].clone();
    program.phases[3].weeks = vec![heavy_week];
    let report = review(&program);

    assert!(report
      .findings
      .iter()
      .any(|f| f.category == FindingCategory::Recovery && f.message.contains("deload volume")));
  }

  #[test]
  fn test_findings_sorted_by_severity() {
    let mut program = sample_program(1, 3);
    program.coach_intro.clear();
    program.phases[0].weeks[0].days[2] = {
      let mut day = strength_day(DayOfWeek::Wednesday, "Bench Press");
      day.exercises.clear();
      day
    };
    let report = review(&program);

    assert_eq!(report.findings.first().unwrap().severity, Severity::Critical);
    assert_eq!(report.findings.last().unwrap().severity, Severity::Minor);
  }

  #[test]
  fn test_no_rest_day_flagged() {
    let mut program = sample_program(1, 3);
    for (i, day) in program.phases[0].weeks[0].days.iter_mut().enumerate() {
      if day.is_rest_day {
        *day = strength_day(DayOfWeek::ALL[i], "Back Squat");
      }
    }
    let report = review(&program);
    assert!(report.findings.iter().any(|f| f.message.contains("no rest day")));
  }
}
