//! Punishment escalation
//!
//! A scored offense is looked up in the detection's threshold table
//! ([`PunishmentLevels`]); every reached [`PunishmentType`] is rendered
//! from its template and performed through the host's [`Effects`].

pub mod controller;
pub mod effects;
pub mod kind;
pub mod levels;
pub mod penalty;
pub mod template;

pub use controller::{PunishmentController, PunishmentOutcome};
pub use effects::{EffectCall, Effects, RecordingEffects};
pub use kind::PunishmentType;
pub use levels::PunishmentLevels;
pub use penalty::{SETBACK_POSITION, ThresholdPenalty};
pub use template::TemplateVars;
