//! Built-in stages and the standard detection pipeline.
//!
//! - [`SpeedCheck`]: consecutive moves faster than the walk speed
//! - [`ReachCheck`]: attacks beyond the maximum reach
//!
//! [`standard_detection`] wires both checks together with the history
//! heuristic and the threshold penalty.

pub mod reach;
pub mod speed;

use crate::config::DetectionConfig;
use crate::detection::{Detection, DetectionId};
use crate::error::StageError;
use crate::heuristic::HistoryHeuristic;
use crate::punishment::ThresholdPenalty;
use crate::stage::{Stage, StageKind, StageModelArchetype, StageModels};

pub use reach::{REACH_DISTANCE, ReachCheck};
pub use speed::{HORIZONTAL_DELTA, SPEED_MODIFIER, SpeedCheck};

/// Keys of every stage [`standard_detection`] registers.
pub const BUILTIN_STAGE_KEYS: [&str; 4] = [
    SpeedCheck::KEY,
    ReachCheck::KEY,
    HistoryHeuristic::KEY,
    ThresholdPenalty::KEY,
];

/// Stage models holding every built-in stage.
///
/// # Errors
///
/// Returns a [`StageError`] if a built-in key collides, which only happens
/// if the built-ins themselves are misdeclared.
pub fn standard_models() -> Result<StageModels, StageError> {
    let mut models = StageModels::standard();
    models.register(Stage::check(SpeedCheck))?;
    models.register(Stage::check(ReachCheck))?;
    models.register(Stage::heuristic(HistoryHeuristic))?;
    models.register(Stage::penalty(ThresholdPenalty))?;
    Ok(models)
}

/// One archetype per family, applying the configuration's stage overrides.
///
/// Without overrides every stage is accepted. A non-empty include list
/// restricts each family to the listed keys; excluded keys are always
/// rejected.
#[must_use]
pub fn standard_archetypes(config: &DetectionConfig) -> Vec<StageModelArchetype> {
    let overrides = config.stages.clone().unwrap_or_default();
    StageKind::ALL
        .iter()
        .map(|&kind| {
            let mut archetype = if overrides.include.is_empty() {
                StageModelArchetype::all(kind)
            } else {
                overrides
                    .include
                    .iter()
                    .fold(StageModelArchetype::new(kind), |a, key| a.include(key.clone()))
            };
            for key in &overrides.exclude {
                archetype = archetype.exclude(key.clone());
            }
            archetype
        })
        .collect()
}

/// Assembles a detection from the built-in stages.
///
/// # Errors
///
/// Returns a [`StageError`] if the stage cycle cannot be built.
pub fn standard_detection(id: DetectionId, config: DetectionConfig) -> Result<Detection, StageError> {
    let archetypes = standard_archetypes(&config);
    Detection::new(id, config, standard_models()?, archetypes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StageOverrides;

    fn keys(detection: &Detection) -> Vec<String> {
        detection
            .cycle()
            .iter()
            .map(|(_, key, _)| key.to_string())
            .collect()
    }

    #[test]
    fn test_standard_pipeline_order() {
        let detection =
            standard_detection(DetectionId::new("all"), DetectionConfig::named("All")).unwrap();
        assert_eq!(keys(&detection), vec!["speed", "reach", "history", "threshold"]);
    }

    #[test]
    fn test_exclude_override() {
        let mut config = DetectionConfig::named("Movement Speed");
        config.stages = Some(StageOverrides {
            include: Vec::new(),
            exclude: vec!["reach".into()],
        });
        let detection = standard_detection(DetectionId::new("movement-speed"), config).unwrap();
        assert_eq!(keys(&detection), vec!["speed", "history", "threshold"]);
    }

    #[test]
    fn test_include_override_restricts_every_family() {
        let mut config = DetectionConfig::named("Reach");
        config.stages = Some(StageOverrides {
            include: vec!["reach".into(), "threshold".into()],
            exclude: Vec::new(),
        });
        let detection = standard_detection(DetectionId::new("reach"), config).unwrap();
        assert_eq!(keys(&detection), vec!["reach", "threshold"]);
        assert_eq!(detection.cycle().size_of(StageKind::Heuristic), 0);
    }

    #[test]
    fn test_builtin_keys_match_models() {
        let models = standard_models().unwrap();
        for key in BUILTIN_STAGE_KEYS {
            assert!(
                StageKind::ALL
                    .iter()
                    .any(|kind| models.expect_model(*kind).get(key).is_some()),
                "{key} not registered"
            );
        }
    }
}
