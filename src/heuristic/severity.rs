//! Severity curve.

use serde::{Deserialize, Serialize};

use crate::config::HeuristicModifier;

/// Smallest divider a transform will use.
pub const MIN_DIVIDER: f64 = 1.0;

/// Escalation curve `severity = (old * 100 / divider) ^ power / 100`.
///
/// Carried as data so reports can be serialized and replayed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityTransform {
    divider: f64,
    power: f64,
}

impl SeverityTransform {
    /// Creates a transform; dividers below [`MIN_DIVIDER`] are raised to it.
    #[must_use]
    pub const fn new(divider: f64, power: f64) -> Self {
        Self {
            divider: divider.max(MIN_DIVIDER),
            power,
        }
    }

    /// Transform for a subject with `count` prior punishments.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn for_count(modifier: &HeuristicModifier, count: u32) -> Self {
        Self::new(modifier.divider_base - count as f64, modifier.power)
    }

    /// Effective divider.
    #[must_use]
    pub const fn divider(&self) -> f64 {
        self.divider
    }

    /// Exponent.
    #[must_use]
    pub const fn power(&self) -> f64 {
        self.power
    }

    /// Applies the curve to `old`.
    #[must_use]
    pub fn apply(&self, old: f64) -> f64 {
        (old * 100.0 / self.divider).powf(self.power) / 100.0
    }
}
