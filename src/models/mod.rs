pub mod generation;
pub mod profile;
pub mod program;

pub use generation::{
  DaySlot, NarrativeContent, ProgramScaffold, ScaffoldDay, ScaffoldPhase, ScaffoldWeek,
  SessionContext,
};
pub use profile::{
  ExperienceLevel, MuscleGroup, MuscleLandmarks, StrengthInputs, StrengthProfile, UserProfile,
  VolumeLandmarks, VolumeParameters,
};
pub use program::{
  DayOfWeek, ExerciseCategory, ExerciseDetail, ExerciseTier, MuscleVolume, PhaseType, Priority,
  Reps, RpeTarget, TrainingPhase, TrainingProgram, TrainingWeek, WeakPointArea,
  WeakPointIntervention, WorkoutDay,
};
