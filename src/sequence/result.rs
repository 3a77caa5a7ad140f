//! Outcome of a completed sequence.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::capture::CaptureContainer;
use crate::event::SubjectId;

/// One evaluated action of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SequencePoint {
    /// Action index within the blueprint
    pub action: usize,
    /// Whether the evaluation passed
    pub passed: bool,
    /// When the evaluation happened
    pub at: DateTime<Utc>,
}

/// Everything a completed sequence hands to the stage pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct SequenceResult {
    /// Blueprint name
    pub blueprint: String,
    /// Subject the sequence ran for
    pub subject: SubjectId,
    /// First event time
    pub started_at: DateTime<Utc>,
    /// Completion time
    pub completed_at: DateTime<Utc>,
    /// Evaluated actions, in order
    pub points: Vec<SequencePoint>,
    /// Final captures
    pub captures: CaptureContainer,
}

impl SequenceResult {
    /// Number of passed evaluations.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.points.iter().filter(|p| p.passed).count()
    }

    /// Number of failed evaluations.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.points.len() - self.passed()
    }

    /// Fraction of passed evaluations in `[0, 1]`; `0` when nothing was evaluated.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn pass_fraction(&self) -> f64 {
        let total = self.points.len();
        if total == 0 {
            return 0.0;
        }
        self.passed() as f64 / total as f64
    }

    /// Time between the first event and completion.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.completed_at - self.started_at
    }
}
