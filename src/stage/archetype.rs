//! Stage selection rules.

use std::collections::HashSet;
use std::sync::Arc;

use super::{Stage, StageKind};

/// Ad-hoc acceptance predicate.
pub type StageFilter = Arc<dyn Fn(&Stage) -> bool + Send + Sync>;

/// Selects stages from one model.
///
/// A stage is accepted iff it is not excluded and it is either included by
/// key or matches any filter. Exclusion always wins. The number of accepted
/// stages must fall within `min..=max`.
#[derive(Clone)]
pub struct StageModelArchetype {
    kind: StageKind,
    include: Vec<String>,
    exclude: HashSet<String>,
    filters: Vec<StageFilter>,
    min: usize,
    max: usize,
}

impl StageModelArchetype {
    /// Creates an archetype for `kind` that accepts nothing yet.
    #[must_use]
    pub fn new(kind: StageKind) -> Self {
        Self {
            kind,
            include: Vec::new(),
            exclude: HashSet::new(),
            filters: Vec::new(),
            min: 0,
            max: usize::MAX,
        }
    }

    /// Creates an archetype accepting every stage of `kind`.
    #[must_use]
    pub fn all(kind: StageKind) -> Self {
        Self::new(kind).filter(|_| true)
    }

    /// Includes a stage by key.
    #[must_use]
    pub fn include(mut self, key: impl Into<String>) -> Self {
        self.include.push(key.into());
        self
    }

    /// Excludes a stage by key.
    #[must_use]
    pub fn exclude(mut self, key: impl Into<String>) -> Self {
        self.exclude.insert(key.into());
        self
    }

    /// Adds an acceptance predicate.
    #[must_use]
    pub fn filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&Stage) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(f));
        self
    }

    /// Inclusive minimum number of accepted stages.
    #[must_use]
    pub const fn min(mut self, min: usize) -> Self {
        self.min = min;
        self
    }

    /// Inclusive maximum number of accepted stages.
    #[must_use]
    pub const fn max(mut self, max: usize) -> Self {
        self.max = max;
        self
    }

    /// Model family this archetype selects from.
    #[must_use]
    pub const fn kind(&self) -> StageKind {
        self.kind
    }

    /// Inclusive bounds on the accepted count.
    #[must_use]
    pub const fn bounds(&self) -> (usize, usize) {
        (self.min, self.max)
    }

    /// Whether `stage` registered under `key` is accepted.
    #[must_use]
    pub fn accepts(&self, key: &str, stage: &Stage) -> bool {
        if self.exclude.contains(key) {
            return false;
        }
        self.include.iter().any(|included| included == key)
            || self.filters.iter().any(|filter| filter(stage))
    }
}

impl std::fmt::Debug for StageModelArchetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageModelArchetype")
            .field("kind", &self.kind)
            .field("include", &self.include)
            .field("exclude", &self.exclude)
            .field("filters", &self.filters.len())
            .field("min", &self.min)
            .field("max", &self.max)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::testing::NamedCheck;
    use proptest::prelude::*;

    #[test]
    fn test_empty_archetype_accepts_nothing() {
        let stage = Stage::check(NamedCheck("speed"));
        assert!(!StageModelArchetype::new(StageKind::Check).accepts("speed", &stage));
    }

    #[test]
    fn test_include_by_key() {
        let stage = Stage::check(NamedCheck("speed"));
        let archetype = StageModelArchetype::new(StageKind::Check).include("speed");
        assert!(archetype.accepts("speed", &stage));
    }

    #[test]
    fn test_filter_accepts() {
        let stage = Stage::check(NamedCheck("speed"));
        let archetype =
            StageModelArchetype::new(StageKind::Check).filter(|s| s.key().starts_with("sp"));
        assert!(archetype.accepts("speed", &stage));
    }

    #[test]
    fn test_exclude_beats_filter() {
        let stage = Stage::check(NamedCheck("speed"));
        let archetype = StageModelArchetype::all(StageKind::Check).exclude("speed");
        assert!(!archetype.accepts("speed", &stage));
    }

    proptest! {
        #[test]
        fn prop_included_and_excluded_is_rejected(key in "[a-z]{1,12}") {
            let stage = Stage::check(NamedCheck("any"));
            let archetype = StageModelArchetype::all(StageKind::Check)
                .include(key.clone())
                .exclude(key.clone());
            prop_assert!(!archetype.accepts(&key, &stage));
        }
    }
}
