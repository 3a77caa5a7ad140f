//! Per-completion report accumulation.

use indexmap::IndexMap;
use serde::Serialize;

use crate::config::DetectionConfig;
use crate::detection::DetectionId;
use crate::event::SubjectId;
use crate::heuristic::HeuristicReport;
use crate::punishment::PunishmentOutcome;
use crate::sequence::{BlueprintKey, SequenceResult};

/// Discriminant used to address reports.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// [`Report::Heuristic`]
    Heuristic,
    /// [`Report::Offense`]
    Offense,
    /// [`Report::Penalty`]
    Penalty,
}

/// Severity of one completed sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Offense {
    /// Pass fraction scaled into the configured range
    pub base: f64,
    /// Base after the heuristic transform, clamped to the range
    pub severity: f64,
}

impl Offense {
    /// Severity as an integer percentage.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn percentage(&self) -> u32 {
        self.severity.round().max(0.0) as u32
    }
}

/// One report attached to a summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "report", rename_all = "snake_case")]
pub enum Report {
    /// History-derived severity transform
    Heuristic(HeuristicReport),
    /// Computed severity
    Offense(Offense),
    /// Punishments issued
    Penalty(Vec<PunishmentOutcome>),
}

impl Report {
    /// Discriminant of this report.
    #[must_use]
    pub const fn kind(&self) -> ReportKind {
        match self {
            Self::Heuristic(_) => ReportKind::Heuristic,
            Self::Offense(_) => ReportKind::Offense,
            Self::Penalty(_) => ReportKind::Penalty,
        }
    }
}

/// A completed sequence travelling through the heuristic and penalty
/// stages of its detection.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    detection: DetectionId,
    check: String,
    result: SequenceResult,
    reports: IndexMap<ReportKind, Report>,
}

impl Summary {
    /// Wraps a completed sequence.
    #[must_use]
    pub fn new(key: BlueprintKey, result: SequenceResult) -> Self {
        Self {
            detection: key.detection,
            check: key.check,
            result,
            reports: IndexMap::new(),
        }
    }

    /// Owning detection.
    #[must_use]
    pub const fn detection(&self) -> &DetectionId {
        &self.detection
    }

    /// Check that produced the sequence.
    #[must_use]
    pub fn check(&self) -> &str {
        &self.check
    }

    /// Subject of the sequence.
    #[must_use]
    pub const fn subject(&self) -> SubjectId {
        self.result.subject
    }

    /// The sequence outcome.
    #[must_use]
    pub const fn result(&self) -> &SequenceResult {
        &self.result
    }

    /// Attaches a report, replacing one of the same kind.
    pub fn attach(&mut self, report: Report) -> Option<Report> {
        self.reports.insert(report.kind(), report)
    }

    /// Report of a kind.
    #[must_use]
    pub fn report(&self, kind: ReportKind) -> Option<&Report> {
        self.reports.get(&kind)
    }

    /// The heuristic report, if a heuristic attached one.
    #[must_use]
    pub fn heuristic(&self) -> Option<&HeuristicReport> {
        match self.reports.get(&ReportKind::Heuristic) {
            Some(Report::Heuristic(report)) => Some(report),
            _ => None,
        }
    }

    /// The computed offense, if a penalty attached one.
    #[must_use]
    pub fn offense(&self) -> Option<Offense> {
        match self.reports.get(&ReportKind::Offense) {
            Some(Report::Offense(offense)) => Some(*offense),
            _ => None,
        }
    }

    /// Punishments issued, if a penalty ran.
    #[must_use]
    pub fn outcomes(&self) -> &[PunishmentOutcome] {
        match self.reports.get(&ReportKind::Penalty) {
            Some(Report::Penalty(outcomes)) => outcomes,
            _ => &[],
        }
    }

    /// Number of attached reports.
    #[must_use]
    pub fn report_count(&self) -> usize {
        self.reports.len()
    }

    /// Computes the offense for `config`'s severity range.
    ///
    /// The base is the pass fraction scaled into the range; the heuristic
    /// transform (when attached) is applied and the result clamped back into
    /// the range.
    #[must_use]
    pub fn compute_offense(&self, config: &DetectionConfig) -> Offense {
        let (min, max) = (config.heuristic_range_minimum, config.heuristic_range_maximum);
        let base = (max - min).mul_add(self.result.pass_fraction(), min);
        let raw = self.heuristic().map_or(base, |report| report.apply(base));
        Offense {
            base,
            severity: raw.clamp(min.min(max), max.max(min)),
        }
    }

    /// Human readable one-line description used in report templates.
    #[must_use]
    pub fn describe(&self) -> String {
        let result = &self.result;
        format!(
            "{} passed {}/{} evaluations in {}ms",
            result.blueprint,
            result.passed(),
            result.points.len(),
            result.duration().num_milliseconds()
        )
    }
}
