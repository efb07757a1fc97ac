//! Prompt construction for the three generation steps
//!
//! Every builder is a pure function of its inputs: no clock, no randomness,
//! and only ordered collections, so the same inputs always render the same
//! prompt text.

use serde::Serialize;

use crate::analysis::WeakPointAnalysis;
use crate::models::{MuscleLandmarks, ProgramScaffold, SessionContext, UserProfile};

const COACH_SYSTEM: &str = include_str!("prompts/coach_system.txt");
const VOLUME_GUIDELINES: &str = include_str!("prompts/volume_guidelines.txt");
const AUTOREGULATION_GUIDELINES: &str = include_str!("prompts/autoregulation_guidelines.txt");
const PERIODIZATION_GUIDELINES: &str = include_str!("prompts/periodization_guidelines.txt");

/// ---------------------------------------------------------------------------
/// Prompt
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStep {
  MacroStructure,
  SessionDetail,
  Narrative,
}

impl GenerationStep {
  pub fn as_str(&self) -> &'static str {
    match self {
      GenerationStep::MacroStructure => "macro-structure",
      GenerationStep::SessionDetail => "session detail",
      GenerationStep::Narrative => "narrative",
    }
  }

  fn marker(&self) -> &'static str {
    match self {
      GenerationStep::MacroStructure => "STEP: MACRO_STRUCTURE",
      GenerationStep::SessionDetail => "STEP: SESSION_DETAIL",
      GenerationStep::Narrative => "STEP: NARRATIVE",
    }
  }
}

impl std::fmt::Display for GenerationStep {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
  pub step: GenerationStep,
  pub system: String,
  pub user: String,
  pub max_tokens: u32,
}

/// ---------------------------------------------------------------------------
/// Shared sections
/// ---------------------------------------------------------------------------

fn profile_section(profile: &UserProfile) -> String {
  let preferred = if profile.preferred_training_days.is_empty() {
    "no preference".to_string()
  } else {
    profile
      .preferred_training_days
      .iter()
      .map(|d| d.as_str())
      .collect::<Vec<_>>()
      .join(", ")
  };
  let equipment = if profile.equipment.is_empty() {
    "bodyweight only".to_string()
  } else {
    profile.equipment.join(", ")
  };

  format!(
    "ATHLETE PROFILE:\n\
     - Experience: {}\n\
     - Primary goal: {}\n\
     - Training days per week: {} (preferred: {})\n\
     - Session duration: {} minutes\n\
     - Equipment: {}\n\
     - Limitations: {}\n",
    profile.experience_level.as_str(),
    profile.primary_goal,
    profile.training_frequency_days,
    preferred,
    profile.session_duration_minutes,
    equipment,
    profile.limitations.as_deref().unwrap_or("none"),
  )
}

fn landmarks_section(landmarks: &MuscleLandmarks) -> String {
  let mut out = String::from("VOLUME LANDMARKS (weekly working sets):\n");
  for (muscle, lm) in landmarks {
    out.push_str(&format!(
      "- {}: MEV {} / MAV {} / MRV {}\n",
      muscle, lm.mev, lm.mav, lm.mrv
    ));
  }
  out
}

fn weak_point_section(analysis: Option<&WeakPointAnalysis>) -> String {
  let mut out = String::from("WEAK POINTS:\n");
  match analysis {
    None => out.push_str("- not analyzed (incomplete strength data)\n"),
    Some(a) if a.findings.is_empty() => out.push_str("- none identified\n"),
    Some(a) => {
      for f in &a.findings {
        out.push_str(&format!(
          "- {}: {} {:.3} vs standard {:.3} ({:?} priority)\n",
          f.area, f.ratio_name, f.current_ratio, f.target_ratio, f.priority
        ));
      }
      out.push_str(
        "Include one weakPointInterventions entry per weak point, with weeklyVolume >= 4 \
         for High priority and reassessmentPeriodWeeks <= 8.\n",
      );
    }
  }
  out
}

/// ---------------------------------------------------------------------------
/// Step 1: Macro-structure
/// ---------------------------------------------------------------------------

pub fn build_macro_structure_prompt(
  profile: &UserProfile,
  landmarks: &MuscleLandmarks,
  weak_points: Option<&WeakPointAnalysis>,
) -> Prompt {
  let user = format!(
    r#"{marker}
Design the macro-structure of a {weeks}-week training program. Do not list exercises yet.

{profile}
PERIODIZATION MODEL: {model}

{landmarks}
{weak_points}
{volume}
{autoregulation}
{periodization}
Respond with JSON in this exact shape:
{{
  "programName": "string",
  "description": "string",
  "durationWeeksTotal": {weeks},
  "periodizationModel": "{model}",
  "phases": [
    {{
      "phaseName": "string",
      "phaseType": "Accumulation | Intensification | Realization | Deload",
      "durationWeeks": 1,
      "primaryGoal": "string",
      "rpeTarget": {{ "min": 6.0, "max": 8.0, "target": 7.0 }},
      "volumeDistribution": [{{ "muscleGroup": "chest", "weeklyVolume": 12, "percentageOfMav": 80.0 }}],
      "weeks": [
        {{
          "weekNumber": 1,
          "progressionStrategy": "string",
          "intensityFocus": "string",
          "days": [{{ "dayOfWeek": "Monday", "isRestDay": false, "focus": "Lower Body Strength" }}]
        }}
      ]
    }}
  ],
  "weakPointInterventions": []
}}"#,
    marker = GenerationStep::MacroStructure.marker(),
    weeks = profile.program_duration_weeks,
    profile = profile_section(profile),
    model = profile.periodization_model(),
    landmarks = landmarks_section(landmarks),
    weak_points = weak_point_section(weak_points),
    volume = VOLUME_GUIDELINES,
    autoregulation = AUTOREGULATION_GUIDELINES,
    periodization = PERIODIZATION_GUIDELINES,
  );

  Prompt {
    step: GenerationStep::MacroStructure,
    system: COACH_SYSTEM.to_string(),
    user,
    max_tokens: 4096,
  }
}

/// ---------------------------------------------------------------------------
/// Step 2: Session detail (one call per training day)
/// ---------------------------------------------------------------------------

pub fn build_session_prompt(profile: &UserProfile, session: &SessionContext) -> Prompt {
  let rpe = match session.rpe_target {
    Some(t) => format!("RPE {:.1}-{:.1}, target {:.1}", t.min, t.max, t.target),
    None => "not specified".to_string(),
  };

  let user = format!(
    r#"{marker}
Write the full session for one training day.

{profile}
SESSION CONTEXT:
- Day: {day}
- Focus: {focus}
- Phase: {phase} ({phase_type})
- Week number: {week}
- Intensity focus: {intensity}
- Progression strategy: {progression}
- Phase RPE band: {rpe}

RULES:
- Exactly one exercise is the anchor lift: tier "Anchor", category "Anchor_Lift", isAnchorLift true, listed first.
- Fit the session into {minutes} minutes including warm-up.
- Every exercise has sets >= 1 and, where prescribed, an RPE between 1 and 10.

{autoregulation}
Respond with JSON in this exact shape:
{{
  "dayOfWeek": "{day}",
  "isRestDay": false,
  "focus": "{focus}",
  "warmUp": ["string"],
  "exercises": [
    {{
      "name": "string",
      "sets": 4,
      "reps": "5 or \"6-8\"",
      "rest": "3 min",
      "rpe": 7.5,
      "tier": "Anchor | Primary | Secondary | Accessory",
      "category": "Anchor_Lift | Compound_Accessory | Isolation | Core | Cardio | Mobility",
      "notes": "string",
      "weight": "string",
      "isAnchorLift": true,
      "muscleGroups": ["quads"]
    }}
  ],
  "coolDown": ["string"],
  "estimatedDurationMinutes": {minutes}
}}"#,
    marker = GenerationStep::SessionDetail.marker(),
    profile = profile_section(profile),
    day = session.day_of_week,
    focus = session.focus,
    phase = session.phase_name,
    phase_type = session.phase_type,
    week = session.week_number,
    intensity = session.intensity_focus,
    progression = session.progression_strategy,
    rpe = rpe,
    minutes = profile.session_duration_minutes,
    autoregulation = AUTOREGULATION_GUIDELINES,
  );

  Prompt {
    step: GenerationStep::SessionDetail,
    system: COACH_SYSTEM.to_string(),
    user,
    max_tokens: 2048,
  }
}

/// ---------------------------------------------------------------------------
/// Step 3: Narrative
/// ---------------------------------------------------------------------------

pub fn build_narrative_prompt(
  profile: &UserProfile,
  scaffold: &ProgramScaffold,
  anchor_lifts: &[String],
) -> Prompt {
  let scaffold_json =
    serde_json::to_string_pretty(scaffold).unwrap_or_else(|_| scaffold.program_name.clone());
  let anchors = if anchor_lifts.is_empty() {
    "none".to_string()
  } else {
    anchor_lifts.join(", ")
  };

  let user = format!(
    r#"{marker}
Write the coach's introduction and general advice for this finished program.
Speak directly to the athlete in a warm, confident coaching voice.

{profile}
ANCHOR LIFTS: {anchors}

PROGRAM STRUCTURE:
{scaffold}

Respond with JSON in this exact shape:
{{
  "coachIntro": "2-3 paragraphs",
  "generalAdvice": "bullet-style advice on recovery, nutrition and autoregulation"
}}"#,
    marker = GenerationStep::Narrative.marker(),
    profile = profile_section(profile),
    anchors = anchors,
    scaffold = scaffold_json,
  );

  Prompt {
    step: GenerationStep::Narrative,
    system: COACH_SYSTEM.to_string(),
    user,
    max_tokens: 1500,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::analysis::{calculate_all_muscle_landmarks, enhanced_weak_point_analysis};
  use crate::models::DayOfWeek;
  use crate::test_utils::{sample_profile, sample_scaffold};

  #[test]
  fn test_macro_prompt_is_deterministic() {
    let profile = sample_profile();
    let landmarks = calculate_all_muscle_landmarks(&profile.volume_parameters);
    let analysis = profile.strength_profile().map(|s| enhanced_weak_point_analysis(&s));

    let a = build_macro_structure_prompt(&profile, &landmarks, analysis.as_ref());
    let b = build_macro_structure_prompt(&profile, &landmarks, analysis.as_ref());
    assert_eq!(a, b);
  }

  #[test]
  fn test_macro_prompt_embeds_inputs() {
    let profile = sample_profile();
    let landmarks = calculate_all_muscle_landmarks(&profile.volume_parameters);
    let analysis = profile.strength_profile().map(|s| enhanced_weak_point_analysis(&s));
    let prompt = build_macro_structure_prompt(&profile, &landmarks, analysis.as_ref());

    assert_eq!(prompt.step, GenerationStep::MacroStructure);
    assert!(prompt.user.contains("STEP: MACRO_STRUCTURE"));
    assert!(prompt.user.contains("Block Periodization"));
    assert!(prompt.user.contains("- chest: MEV"));
    assert!(prompt.user.contains("WEAK_VERTICAL_PRESS"));
    assert!(prompt.user.contains("VOLUME GUIDELINES"));
    assert!(prompt.user.contains("AUTOREGULATION GUIDELINES"));
    assert!(prompt.user.contains("PERIODIZATION GUIDELINES"));
    assert!(prompt.user.contains("barbell"));
  }

  #[test]
  fn test_macro_prompt_without_strength_data() {
    let mut profile = sample_profile();
    profile.strength = None;
    let landmarks = calculate_all_muscle_landmarks(&profile.volume_parameters);
    let prompt = build_macro_structure_prompt(&profile, &landmarks, None);

    assert!(prompt.user.contains("not analyzed"));
  }

  #[test]
  fn test_session_prompt_embeds_day_context() {
    let profile = sample_profile();
    let scaffold = sample_scaffold(2, 3);
    let session = &scaffold.training_sessions()[4];
    let prompt = build_session_prompt(&profile, session);

    assert_eq!(prompt.step, GenerationStep::SessionDetail);
    assert!(prompt.user.contains(&format!("- Day: {}", DayOfWeek::Wednesday)));
    assert!(prompt.user.contains("- Week number: 2"));
    assert!(prompt.user.contains("- Intensity focus: Moderate"));
    assert!(prompt.user.contains("RPE 6.0-8.0, target 7.0"));
  }

  #[test]
  fn test_narrative_prompt_embeds_scaffold() {
    let profile = sample_profile();
    let scaffold = sample_scaffold(1, 3);
    let anchors = vec!["Back Squat".to_string(), "Deadlift".to_string()];
    let prompt = build_narrative_prompt(&profile, &scaffold, &anchors);

    assert_eq!(prompt.step, GenerationStep::Narrative);
    assert!(prompt.user.contains("ANCHOR LIFTS: Back Squat, Deadlift"));
    assert!(prompt.user.contains(&scaffold.program_name));
    assert_eq!(prompt, build_narrative_prompt(&profile, &scaffold, &anchors));
  }
}
