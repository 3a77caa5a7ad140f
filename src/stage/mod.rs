//! Stage pipeline
//!
//! A detection analyses completed sequences in three families of stages:
//!
//! - **Check**: yields a sequence blueprint for the engine
//! - **Heuristic**: reads a summary and attaches a severity report
//! - **Penalty**: reads a summary and performs a response
//!
//! Stages are stateless and registered once into a [`StageModel`] per
//! family. A [`StageCycle`] filters the models through ordered
//! [`StageModelArchetype`]s and iterates the accepted stages.

pub mod archetype;
pub mod context;
pub mod cycle;
pub mod model;
pub mod summary;

use std::sync::Arc;

use crate::heuristic::HeuristicReport;
use crate::sequence::SequenceBlueprint;

pub use archetype::{StageFilter, StageModelArchetype};
pub use context::{CheckContext, StageContext};
pub use cycle::StageCycle;
pub use model::{StageModel, StageModels};
pub use summary::{Offense, Report, ReportKind, Summary};

/// Stage family.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum StageKind {
    /// Sequence producers
    Check,
    /// Severity analysers
    Heuristic,
    /// Responders
    Penalty,
}

impl StageKind {
    /// All families in pipeline order.
    pub const ALL: [Self; 3] = [Self::Check, Self::Heuristic, Self::Penalty];

    /// Lowercase family name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Check => "check",
            Self::Heuristic => "heuristic",
            Self::Penalty => "penalty",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produces the sequence a detection watches for.
pub trait Check: Send + Sync {
    /// Registry key.
    fn key(&self) -> &str;

    /// Builds the blueprint for one detection's configuration.
    fn blueprint(&self, ctx: &CheckContext<'_>) -> SequenceBlueprint;
}

/// Derives a severity adjustment for a completed sequence.
pub trait Heuristic: Send + Sync {
    /// Registry key.
    fn key(&self) -> &str;

    /// Returns a report, or `None` when nothing applies.
    fn analyze(&self, ctx: &StageContext<'_>, summary: &Summary) -> Option<HeuristicReport>;
}

/// Responds to a completed sequence.
pub trait Penalty: Send + Sync {
    /// Registry key.
    fn key(&self) -> &str;

    /// Performs the response, attaching what was done to the summary.
    fn apply(&self, ctx: &StageContext<'_>, summary: &mut Summary);
}

/// One registered stage.
#[derive(Clone)]
pub enum Stage {
    /// Sequence producer
    Check(Arc<dyn Check>),
    /// Severity analyser
    Heuristic(Arc<dyn Heuristic>),
    /// Responder
    Penalty(Arc<dyn Penalty>),
}

impl Stage {
    /// Wraps a check.
    pub fn check(check: impl Check + 'static) -> Self {
        Self::Check(Arc::new(check))
    }

    /// Wraps a heuristic.
    pub fn heuristic(heuristic: impl Heuristic + 'static) -> Self {
        Self::Heuristic(Arc::new(heuristic))
    }

    /// Wraps a penalty.
    pub fn penalty(penalty: impl Penalty + 'static) -> Self {
        Self::Penalty(Arc::new(penalty))
    }

    /// Registry key.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Check(check) => check.key(),
            Self::Heuristic(heuristic) => heuristic.key(),
            Self::Penalty(penalty) => penalty.key(),
        }
    }

    /// Family of the stage.
    #[must_use]
    pub const fn kind(&self) -> StageKind {
        match self {
            Self::Check(_) => StageKind::Check,
            Self::Heuristic(_) => StageKind::Heuristic,
            Self::Penalty(_) => StageKind::Penalty,
        }
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("kind", &self.kind())
            .field("key", &self.key())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Minimal stages for registry and cycle tests.

    use super::*;
    use crate::event::EventKind;
    use crate::sequence::Action;

    pub struct NamedCheck(pub &'static str);

    impl Check for NamedCheck {
        fn key(&self) -> &str {
            self.0
        }

        fn blueprint(&self, _ctx: &CheckContext<'_>) -> SequenceBlueprint {
            SequenceBlueprint::builder(self.0)
                .then(Action::on(EventKind::Join))
                .build()
        }
    }

    pub struct NamedHeuristic(pub &'static str);

    impl Heuristic for NamedHeuristic {
        fn key(&self) -> &str {
            self.0
        }

        fn analyze(&self, _ctx: &StageContext<'_>, _summary: &Summary) -> Option<HeuristicReport> {
            None
        }
    }

    pub struct NamedPenalty(pub &'static str);

    impl Penalty for NamedPenalty {
        fn key(&self) -> &str {
            self.0
        }

        fn apply(&self, _ctx: &StageContext<'_>, _summary: &mut Summary) {}
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_stage_kind_and_key() {
        let stage = Stage::check(NamedCheck("speed"));
        assert_eq!(stage.kind(), StageKind::Check);
        assert_eq!(stage.key(), "speed");
        assert_eq!(Stage::heuristic(NamedHeuristic("h")).kind(), StageKind::Heuristic);
        assert_eq!(Stage::penalty(NamedPenalty("p")).kind(), StageKind::Penalty);
    }

    #[test]
    fn test_debug_shows_key() {
        let debug = format!("{:?}", Stage::penalty(NamedPenalty("threshold")));
        assert!(debug.contains("threshold"));
        assert!(debug.contains("Penalty"));
    }
}
