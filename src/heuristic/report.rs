//! Heuristic output attached to a summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::history::RecordId;
use super::severity::SeverityTransform;

/// Severity adjustment derived from a prior punishment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeuristicReport {
    /// Curve applied to the base severity
    pub transform: SeverityTransform,
    /// Prior punishment the curve was derived from
    pub punishment_id: RecordId,
    /// Punishment count at that record
    pub punishment_count: u32,
    /// When the prior punishment was issued
    pub issued_at: DateTime<Utc>,
}

impl HeuristicReport {
    /// Applies the carried transform.
    #[must_use]
    pub fn apply(&self, severity: f64) -> f64 {
        self.transform.apply(severity)
    }
}
