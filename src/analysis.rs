//! Deterministic analysis layer for program generation
//!
//! Computes individualized volume landmarks and strength-ratio weak points
//! from the user profile. Claude receives these pre-computed numbers in its
//! prompts, and the validators use them as reference bounds.

use serde::{Deserialize, Serialize};

use crate::models::{
  MuscleGroup, MuscleLandmarks, Priority, StrengthProfile, VolumeLandmarks, VolumeParameters,
  WeakPointArea, WeakPointIntervention,
};

/// ---------------------------------------------------------------------------
/// Volume Landmarks
/// ---------------------------------------------------------------------------

/// Documented bounds for the calculator inputs; anything outside is clamped
pub const TRAINING_AGE_RANGE: (f64, f64) = (0.0, 30.0);
pub const RATING_RANGE: (u8, u8) = (1, 10);
pub const COMBINED_MULTIPLIER_RANGE: (f64, f64) = (0.6, 1.4);

/// Baseline weekly sets (MEV, MAV, MRV) for an intermediate lifter with average recovery
fn base_landmarks(muscle: MuscleGroup) -> (f64, f64, f64) {
  match muscle {
    MuscleGroup::Chest => (8.0, 16.0, 22.0),
    MuscleGroup::Back => (10.0, 18.0, 25.0),
    MuscleGroup::Quads => (8.0, 15.0, 20.0),
    MuscleGroup::Hamstrings => (6.0, 12.0, 20.0),
    MuscleGroup::Glutes => (0.0, 8.0, 16.0),
    MuscleGroup::Shoulders => (8.0, 19.0, 26.0),
    MuscleGroup::Biceps => (8.0, 17.0, 26.0),
    MuscleGroup::Triceps => (6.0, 12.0, 18.0),
    MuscleGroup::Calves => (8.0, 14.0, 20.0),
  }
}

/// Trained lifters need more volume to progress and tolerate more
fn training_age_multiplier(years: f64) -> f64 {
  let years = if years.is_finite() {
    years.clamp(TRAINING_AGE_RANGE.0, TRAINING_AGE_RANGE.1)
  } else {
    TRAINING_AGE_RANGE.0
  };
  match years {
    y if y < 1.0 => 0.8,
    y if y < 3.0 => 1.0,
    y if y < 5.0 => 1.1,
    _ => 1.2,
  }
}

/// 1 -> 0.8, 10 -> 1.2
fn recovery_multiplier(rating: u8) -> f64 {
  let r = rating.clamp(RATING_RANGE.0, RATING_RANGE.1) as f64;
  0.8 + (r - 1.0) * (0.4 / 9.0)
}

/// 1 -> 1.1, 10 -> 0.8
fn stress_multiplier(rating: u8) -> f64 {
  let s = rating.clamp(RATING_RANGE.0, RATING_RANGE.1) as f64;
  1.1 - (s - 1.0) * (0.3 / 9.0)
}

/// Combined adjustment applied to the base table
pub fn volume_multiplier(params: &VolumeParameters) -> f64 {
  let combined = training_age_multiplier(params.training_age_years)
    * recovery_multiplier(params.recovery_capacity)
    * stress_multiplier(params.stress_level);
  combined.clamp(COMBINED_MULTIPLIER_RANGE.0, COMBINED_MULTIPLIER_RANGE.1)
}

/// Compute MEV/MAV/MRV for all nine muscle groups
///
/// MEV is scaled by training age only (the floor for progress moves with
/// experience), MAV and MRV by the full recovery-adjusted multiplier. The
/// ordering MEV <= MAV <= MRV always holds in the output.
pub fn calculate_all_muscle_landmarks(params: &VolumeParameters) -> MuscleLandmarks {
  let full = volume_multiplier(params);
  let age = training_age_multiplier(params.training_age_years);

  MuscleGroup::ALL
    .iter()
    .map(|&muscle| {
      let (mev, mav, mrv) = base_landmarks(muscle);
      let mev = (mev * age).round() as u32;
      let mav = ((mav * full).round() as u32).max(mev);
      let mrv = ((mrv * full).round() as u32).max(mav);
      (muscle, VolumeLandmarks { mev, mav, mrv })
    })
    .collect()
}

/// ---------------------------------------------------------------------------
/// Weak Point Analysis
/// ---------------------------------------------------------------------------

/// A ratio is a weak point when it falls below this fraction of its standard
pub const WEAK_POINT_THRESHOLD: f64 = 0.90;

/// Deficit at or above which a weak point is High priority
const HIGH_PRIORITY_DEFICIT: f64 = 0.20;

/// Published standard ratios between the competition lifts
pub mod standards {
  pub const OVERHEAD_PRESS_TO_BENCH: f64 = 0.65;
  pub const BENCH_TO_SQUAT: f64 = 0.75;
  pub const SQUAT_TO_DEADLIFT: f64 = 0.80;
  pub const DEADLIFT_TO_SQUAT: f64 = 1.20;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrengthRatios {
  pub overhead_press_to_bench: f64,
  pub bench_to_squat: f64,
  pub squat_to_deadlift: f64,
  pub deadlift_to_squat: f64,
}

impl StrengthRatios {
  pub fn from_profile(profile: &StrengthProfile) -> Self {
    Self {
      overhead_press_to_bench: profile.overhead_press / profile.bench,
      bench_to_squat: profile.bench / profile.squat,
      squat_to_deadlift: profile.squat / profile.deadlift,
      deadlift_to_squat: profile.deadlift / profile.squat,
    }
  }

  /// (area, ratio name, current, standard) for every tracked ratio
  fn comparisons(&self) -> [(WeakPointArea, &'static str, f64, f64); 4] {
    [
      (
        WeakPointArea::WeakVerticalPress,
        "overheadPressToBench",
        self.overhead_press_to_bench,
        standards::OVERHEAD_PRESS_TO_BENCH,
      ),
      (
        WeakPointArea::WeakHorizontalPress,
        "benchToSquat",
        self.bench_to_squat,
        standards::BENCH_TO_SQUAT,
      ),
      (
        WeakPointArea::WeakQuads,
        "squatToDeadlift",
        self.squat_to_deadlift,
        standards::SQUAT_TO_DEADLIFT,
      ),
      (
        WeakPointArea::WeakPosteriorChain,
        "deadliftToSquat",
        self.deadlift_to_squat,
        standards::DEADLIFT_TO_SQUAT,
      ),
    ]
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeakPointFinding {
  pub area: WeakPointArea,
  pub ratio_name: String,
  pub current_ratio: f64,
  pub target_ratio: f64,
  /// Fractional shortfall against the standard (0.25 = 25% below)
  pub deficit: f64,
  pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeakPointAnalysis {
  pub ratios: StrengthRatios,
  /// Largest deficit first
  pub primary_weak_points: Vec<WeakPointArea>,
  pub findings: Vec<WeakPointFinding>,
}

/// Compare lift ratios against standards and rank the shortfalls
pub fn enhanced_weak_point_analysis(profile: &StrengthProfile) -> WeakPointAnalysis {
  let ratios = StrengthRatios::from_profile(profile);

  let mut findings: Vec<WeakPointFinding> = ratios
    .comparisons()
    .into_iter()
    .filter(|(_, _, current, standard)| *current < standard * WEAK_POINT_THRESHOLD)
    .map(|(area, name, current, standard)| {
      let deficit = (standard - current) / standard;
      let priority = if deficit >= HIGH_PRIORITY_DEFICIT {
        Priority::High
      } else {
        Priority::Moderate
      };
      WeakPointFinding {
        area,
        ratio_name: name.to_string(),
        current_ratio: round3(current),
        target_ratio: standard,
        deficit: round3(deficit),
        priority,
      }
    })
    .collect();

  findings.sort_by(|a, b| b.deficit.total_cmp(&a.deficit));

  WeakPointAnalysis {
    ratios,
    primary_weak_points: findings.iter().map(|f| f.area).collect(),
    findings,
  }
}

impl WeakPointAnalysis {
  /// Interventions a compliant program would carry for these weak points
  pub fn recommended_interventions(&self) -> Vec<WeakPointIntervention> {
    self
      .findings
      .iter()
      .map(|f| {
        let (weekly_volume, exercises) = intervention_template(f.area, f.priority);
        WeakPointIntervention {
          target_area: f.area,
          current_ratio: f.current_ratio,
          target_ratio: f.target_ratio,
          priority: f.priority,
          weekly_volume,
          reassessment_period_weeks: match f.priority {
            Priority::High => 4,
            _ => 6,
          },
          exercises: exercises.iter().map(|e| e.to_string()).collect(),
          notes: Some(format!(
            "{} is {:.0}% below standard",
            f.ratio_name,
            f.deficit * 100.0
          )),
        }
      })
      .collect()
  }
}

fn intervention_template(area: WeakPointArea, priority: Priority) -> (u32, &'static [&'static str]) {
  let volume = match priority {
    Priority::High => 6,
    Priority::Moderate => 4,
    Priority::Low => 2,
  };
  let exercises: &'static [&'static str] = match area {
    WeakPointArea::WeakVerticalPress => &["Seated Dumbbell Press", "Push Press", "Lateral Raise"],
    WeakPointArea::WeakHorizontalPress => &["Close-Grip Bench Press", "Dumbbell Bench Press"],
    WeakPointArea::WeakQuads => &["Front Squat", "Pause Squat", "Leg Press"],
    WeakPointArea::WeakPosteriorChain => &["Romanian Deadlift", "Good Morning", "Hip Thrust"],
  };
  (volume, exercises)
}

fn round3(v: f64) -> f64 {
  (v * 1000.0).round() / 1000.0
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
