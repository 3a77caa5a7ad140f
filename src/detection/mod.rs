//! Detections and their orchestration
//!
//! A [`Detection`] bundles a configuration with the stage models and
//! archetypes that make up its pipeline. Detections are owned by a
//! [`DetectionManager`], which also owns the sequence engine, the capture
//! registry and the collaborators every detection shares.

pub mod manager;
pub mod runtime;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::DetectionConfig;
use crate::error::StageError;
use crate::sequence::{BlueprintKey, SequenceBlueprint};
use crate::stage::{CheckContext, Stage, StageCycle, StageModelArchetype, StageModels};
use crate::time::TickRate;

pub use manager::{DetectionManager, NoPermissions, Permissions};
pub use runtime::Runtime;

/// Stable identifier of a detection, e.g. `movement-speed`.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionId(String);

impl DetectionId {
    /// Wraps an id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DetectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One detection: configuration plus its stage pipeline.
#[derive(Debug)]
pub struct Detection {
    id: DetectionId,
    config: DetectionConfig,
    models: StageModels,
    archetypes: Vec<StageModelArchetype>,
    cycle: StageCycle,
}

impl Detection {
    /// Assembles a detection and materializes its stage cycle.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::OutOfBounds`] if an archetype's bounds are not
    /// met by the registered stages.
    pub fn new(
        id: DetectionId,
        config: DetectionConfig,
        models: StageModels,
        archetypes: Vec<StageModelArchetype>,
    ) -> Result<Self, StageError> {
        let cycle = StageCycle::build(&models, &archetypes)?;
        Ok(Self {
            id,
            config,
            models,
            archetypes,
            cycle,
        })
    }

    /// Detection id.
    #[must_use]
    pub const fn id(&self) -> &DetectionId {
        &self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Registered stage models.
    #[must_use]
    pub const fn models(&self) -> &StageModels {
        &self.models
    }

    /// Archetypes the cycle is built from.
    #[must_use]
    pub fn archetypes(&self) -> &[StageModelArchetype] {
        &self.archetypes
    }

    /// The materialized stage cycle.
    #[must_use]
    pub const fn cycle(&self) -> &StageCycle {
        &self.cycle
    }

    /// Replaces the configuration and rebuilds the cycle.
    ///
    /// On error the detection is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::OutOfBounds`] if the rebuilt cycle violates an
    /// archetype's bounds.
    pub fn reload(
        &mut self,
        config: DetectionConfig,
        archetypes: Vec<StageModelArchetype>,
    ) -> Result<(), StageError> {
        let cycle = StageCycle::build(&self.models, &archetypes)?;
        self.config = config;
        self.archetypes = archetypes;
        self.cycle = cycle;
        Ok(())
    }

    /// Blueprints of every check stage in the cycle.
    #[must_use]
    pub fn blueprints(&self, tick_rate: TickRate) -> Vec<(BlueprintKey, Arc<SequenceBlueprint>)> {
        let ctx = CheckContext {
            detection: &self.id,
            config: &self.config,
            tick_rate,
        };
        self.cycle
            .iter()
            .filter_map(|(_, key, stage)| match stage {
                Stage::Check(check) => Some((
                    BlueprintKey::new(self.id.clone(), key),
                    Arc::new(check.blueprint(&ctx)),
                )),
                Stage::Heuristic(_) | Stage::Penalty(_) => None,
            })
            .collect()
    }
}
