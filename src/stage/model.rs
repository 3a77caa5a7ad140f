//! Stage registries.

use indexmap::IndexMap;
use tracing::trace;

use crate::error::StageError;

use super::{Stage, StageKind};

/// Insertion-ordered registry of the stages of one family.
#[derive(Debug, Clone)]
pub struct StageModel {
    kind: StageKind,
    stages: IndexMap<String, Stage>,
}

impl StageModel {
    /// Creates an empty model for `kind`.
    #[must_use]
    pub fn new(kind: StageKind) -> Self {
        Self {
            kind,
            stages: IndexMap::new(),
        }
    }

    /// Family of the model.
    #[must_use]
    pub const fn kind(&self) -> StageKind {
        self.kind
    }

    /// Registers a stage.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::WrongFamily`] if the stage belongs to another
    /// family and [`StageError::Duplicate`] if its key is taken.
    pub fn register(&mut self, stage: Stage) -> Result<(), StageError> {
        let key = stage.key().to_string();
        if stage.kind() != self.kind {
            return Err(StageError::WrongFamily {
                model: self.kind.as_str(),
                stage: stage.kind().as_str(),
                key,
            });
        }
        if self.stages.contains_key(&key) {
            return Err(StageError::Duplicate {
                model: self.kind.as_str(),
                key,
            });
        }
        trace!(model = %self.kind, %key, "stage registered");
        self.stages.insert(key, stage);
        Ok(())
    }

    /// Stage registered under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Stage> {
        self.stages.get(key)
    }

    /// Removes a stage, keeping the order of the rest.
    pub fn unregister(&mut self, key: &str) -> Option<Stage> {
        self.stages.shift_remove(key)
    }

    /// Stages in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Stage)> {
        self.stages.iter().map(|(key, stage)| (key.as_str(), stage))
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns `true` if no stage is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// The models of one detection, one per family at most.
#[derive(Debug, Clone, Default)]
pub struct StageModels {
    models: IndexMap<StageKind, StageModel>,
}

impl StageModels {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set with an empty model for every family.
    #[must_use]
    pub fn standard() -> Self {
        let mut models = Self::new();
        for kind in StageKind::ALL {
            models.insert(StageModel::new(kind));
        }
        models
    }

    /// Adds or replaces the model of its family.
    pub fn insert(&mut self, model: StageModel) -> Option<StageModel> {
        self.models.insert(model.kind(), model)
    }

    /// Registers a stage into the model of its family, creating the model
    /// if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::Duplicate`] if the key is taken.
    pub fn register(&mut self, stage: Stage) -> Result<(), StageError> {
        self.models
            .entry(stage.kind())
            .or_insert_with(|| StageModel::new(stage.kind()))
            .register(stage)
    }

    /// Model of a family, if present.
    #[must_use]
    pub fn model(&self, kind: StageKind) -> Option<&StageModel> {
        self.models.get(&kind)
    }

    /// Model of a family.
    ///
    /// # Panics
    ///
    /// Panics if the detection has no model for `kind`.
    #[must_use]
    pub fn expect_model(&self, kind: StageKind) -> &StageModel {
        self.models
            .get(&kind)
            .unwrap_or_else(|| panic!("no {kind} model registered"))
    }

    /// Mutable model of a family, if present.
    pub fn model_mut(&mut self, kind: StageKind) -> Option<&mut StageModel> {
        self.models.get_mut(&kind)
    }
}
