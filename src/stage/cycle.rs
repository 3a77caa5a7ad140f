//! Materialized stage pipeline.
//!
//! A [`StageCycle`] is built once per detection (and rebuilt on reload). It
//! is an immutable list of accepted `(model, stage)` pairs, grouped by model
//! in first-seen archetype order, walked by a forward-only cursor:
//!
//! ```text
//! reset() -> before first
//! next()  -> Check:speed -> Check:reach -> Heuristic:history -> Penalty:threshold -> false
//! ```

use indexmap::IndexMap;
use tracing::debug;

use crate::error::StageError;

use super::{Stage, StageKind, StageModelArchetype, StageModels};

#[derive(Debug, Clone)]
struct Entry {
    kind: StageKind,
    key: String,
    stage: Stage,
}

/// Accepted stages of one detection with a cursor.
#[derive(Debug, Clone, Default)]
pub struct StageCycle {
    entries: Vec<Entry>,
    cursor: Option<usize>,
}

impl StageCycle {
    /// Resolves `archetypes` against `models`.
    ///
    /// Archetypes whose model is absent are skipped. A stage accepted by
    /// several archetypes appears once per accepting archetype, so
    /// `total_size` is the sum of every archetype's accepted count.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::OutOfBounds`] when an archetype accepts fewer
    /// than its minimum or more than its maximum number of stages.
    pub fn build(
        models: &StageModels,
        archetypes: &[StageModelArchetype],
    ) -> Result<Self, StageError> {
        let mut groups: IndexMap<StageKind, Vec<(String, Stage)>> = IndexMap::new();

        for archetype in archetypes {
            let kind = archetype.kind();
            let Some(model) = models.model(kind) else {
                debug!(model = %kind, "no model for archetype, skipping");
                continue;
            };

            let mut accepted = 0usize;
            for (key, stage) in model.iter() {
                if !archetype.accepts(key, stage) {
                    continue;
                }
                accepted += 1;
                groups
                    .entry(kind)
                    .or_default()
                    .push((key.to_string(), stage.clone()));
            }

            let (min, max) = archetype.bounds();
            if accepted < min || accepted > max {
                return Err(StageError::OutOfBounds {
                    model: kind.as_str(),
                    accepted,
                    min,
                    max,
                });
            }
        }

        let entries = groups
            .into_iter()
            .flat_map(|(kind, stages)| {
                stages
                    .into_iter()
                    .map(move |(key, stage)| Entry { kind, key, stage })
            })
            .collect();

        Ok(Self {
            entries,
            cursor: None,
        })
    }

    /// Moves to the next pair. Returns `false` once every pair was visited.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        let next = self.cursor.map_or(0, |cursor| cursor.saturating_add(1));
        if next < self.entries.len() {
            self.cursor = Some(next);
            true
        } else {
            self.cursor = Some(self.entries.len());
            false
        }
    }

    /// Rewinds to before the first pair.
    pub const fn reset(&mut self) {
        self.cursor = None;
    }

    fn current(&self) -> Option<&Entry> {
        self.cursor.and_then(|cursor| self.entries.get(cursor))
    }

    /// Model of the current pair.
    #[must_use]
    pub fn model(&self) -> Option<StageKind> {
        self.current().map(|entry| entry.kind)
    }

    /// Stage of the current pair.
    #[must_use]
    pub fn stage(&self) -> Option<&Stage> {
        self.current().map(|entry| &entry.stage)
    }

    /// Key of the current pair.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.current().map(|entry| entry.key.as_str())
    }

    /// Number of stages in the current model; `0` when not positioned.
    #[must_use]
    pub fn size(&self) -> usize {
        self.model().map_or(0, |kind| self.size_of(kind))
    }

    /// Number of accepted stages of one model.
    #[must_use]
    pub fn size_of(&self, kind: StageKind) -> usize {
        self.entries.iter().filter(|entry| entry.kind == kind).count()
    }

    /// Number of accepted stages across all models.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.entries.len()
    }

    /// Whether a stage with `key` was accepted into `kind`.
    #[must_use]
    pub fn contains(&self, kind: StageKind, key: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.kind == kind && entry.key == key)
    }

    /// All pairs in order, independent of the cursor.
    pub fn iter(&self) -> impl Iterator<Item = (StageKind, &str, &Stage)> {
        self.entries
            .iter()
            .map(|entry| (entry.kind, entry.key.as_str(), &entry.stage))
    }
}
