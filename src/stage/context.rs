//! What stages get to see.

use chrono::{DateTime, Utc};

use crate::config::DetectionConfig;
use crate::detection::DetectionId;
use crate::heuristic::PunishmentHistory;
use crate::punishment::Effects;
use crate::time::TickRate;

/// Input of [`super::Check::blueprint`].
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    /// Owning detection
    pub detection: &'a DetectionId,
    /// Detection configuration
    pub config: &'a DetectionConfig,
    /// Server tick length
    pub tick_rate: TickRate,
}

/// Input of heuristic and penalty stages.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    /// Owning detection
    pub detection: &'a DetectionId,
    /// Detection configuration
    pub config: &'a DetectionConfig,
    /// Punishment history collaborator
    pub history: &'a dyn PunishmentHistory,
    /// Host effects
    pub effects: &'a dyn Effects,
    /// Analysis time
    pub now: DateTime<Utc>,
}

impl std::fmt::Debug for StageContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("detection", self.detection)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}
