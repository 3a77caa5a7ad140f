//! Severity threshold table.

use crate::config::PunishmentLevel;

use super::kind::PunishmentType;

/// Threshold table mapping severity percentages to punishments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PunishmentLevels {
    levels: Vec<PunishmentLevel>,
}

impl PunishmentLevels {
    /// Builds a table, ordering rows by threshold.
    #[must_use]
    pub fn new(mut levels: Vec<PunishmentLevel>) -> Self {
        levels.sort_by(|a, b| a.threshold.total_cmp(&b.threshold));
        Self { levels }
    }

    /// Every punishment whose threshold `severity` reaches, in ascending
    /// threshold order.
    #[must_use]
    pub fn reached(&self, severity: f64) -> Vec<PunishmentType> {
        self.levels
            .iter()
            .take_while(|level| severity >= level.threshold)
            .map(|level| level.punishment)
            .collect()
    }

    /// Lowest configured threshold.
    #[must_use]
    pub fn lowest_threshold(&self) -> Option<f64> {
        self.levels.first().map(|level| level.threshold)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Returns `true` if no row is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

impl From<&[PunishmentLevel]> for PunishmentLevels {
    fn from(levels: &[PunishmentLevel]) -> Self {
        Self::new(levels.to_vec())
    }
}
