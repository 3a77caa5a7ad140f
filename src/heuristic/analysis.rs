//! History-driven severity escalation.

use chrono::TimeDelta;
use tracing::{debug, warn};

use crate::stage::{Heuristic, StageContext, Summary};

use super::history::HISTORY_VERSION;
use super::report::HeuristicReport;
use super::severity::SeverityTransform;

/// Escalates severity for subjects punished recently by the same detection.
///
/// The newest record inside the configured window decides the transform.
/// Without a configured modifier, or without a recent record, no report is
/// attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryHeuristic;

impl HistoryHeuristic {
    /// Registry key.
    pub const KEY: &'static str = "history";
}

impl Heuristic for HistoryHeuristic {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn analyze(&self, ctx: &StageContext<'_>, summary: &Summary) -> Option<HeuristicReport> {
        let modifier = ctx.config.heuristic_modifier?;
        let subject = summary.subject();
        let window = TimeDelta::hours(i64::from(modifier.relevant_punishment_inhours));

        let ids = match ctx
            .history
            .punishment_ids(HISTORY_VERSION, subject, ctx.detection)
        {
            Ok(ids) => ids,
            Err(e) => {
                warn!(detection = %ctx.detection, %subject, error = %e, "history lookup failed");
                return None;
            }
        };

        for id in ids {
            let record = match ctx.history.punishment(id) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    warn!(detection = %ctx.detection, %id, error = %e, "history record unreadable");
                    continue;
                }
            };
            if ctx.now - record.issued_at > window {
                continue;
            }
            let count = match ctx.history.punishment_count(id) {
                Ok(count) => count,
                Err(e) => {
                    warn!(detection = %ctx.detection, %id, error = %e, "punishment count failed");
                    continue;
                }
            };
            let transform = SeverityTransform::for_count(&modifier, count);
            debug!(
                detection = %ctx.detection,
                %subject,
                count,
                divider = transform.divider(),
                "prior punishment escalates severity"
            );
            return Some(HeuristicReport {
                transform,
                punishment_id: id,
                punishment_count: count,
                issued_at: record.issued_at,
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureContainer;
    use crate::config::{DetectionConfig, HeuristicModifier};
    use crate::detection::DetectionId;
    use crate::error::HistoryError;
    use crate::event::SubjectId;
    use crate::heuristic::{MemoryHistory, PunishmentHistory, PunishmentRecord, RecordId};
    use crate::punishment::{PunishmentType, RecordingEffects};
    use crate::sequence::{BlueprintKey, SequenceResult};
    use chrono::{DateTime, Utc};

    fn config(modifier: bool) -> DetectionConfig {
        let mut config = DetectionConfig::named("Movement Speed");
        if modifier {
            config.heuristic_modifier = Some(HeuristicModifier {
                divider_base: 100.0,
                relevant_punishment_inhours: 24,
                power: 2.0,
            });
        }
        config
    }

    fn summary(subject: SubjectId, now: DateTime<Utc>) -> Summary {
        Summary::new(
            BlueprintKey::new(DetectionId::new("movement-speed"), "speed"),
            SequenceResult {
                blueprint: "speed".into(),
                subject,
                started_at: now,
                completed_at: now,
                points: Vec::new(),
                captures: CaptureContainer::new(),
            },
        )
    }

    fn analyze(
        config: &DetectionConfig,
        history: &dyn PunishmentHistory,
        subject: SubjectId,
        now: DateTime<Utc>,
    ) -> Option<HeuristicReport> {
        let detection = DetectionId::new("movement-speed");
        let effects = RecordingEffects::new();
        let ctx = StageContext {
            detection: &detection,
            config,
            history,
            effects: &effects,
            now,
        };
        HistoryHeuristic.analyze(&ctx, &summary(subject, now))
    }

    fn record(subject: SubjectId, at: DateTime<Utc>) -> PunishmentRecord {
        PunishmentRecord::new(
            DetectionId::new("movement-speed"),
            subject,
            at,
            PunishmentType::Warn,
        )
    }

    #[test]
    fn test_recent_record_yields_transform() {
        let subject = SubjectId::random();
        let now = Utc::now();
        let history = MemoryHistory::new();
        history.record(record(subject, now - TimeDelta::hours(1))).unwrap();

        let report = analyze(&config(true), &history, subject, now).unwrap();
        assert_eq!(report.punishment_count, 1);
        assert!((report.transform.divider() - 99.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_newest_record_in_window_wins() {
        let subject = SubjectId::random();
        let now = Utc::now();
        let older = record(subject, now - TimeDelta::hours(3));
        let newer = record(subject, now - TimeDelta::hours(1));
        let newer_id = newer.id;
        let history = MemoryHistory::from_records(vec![older, newer]);

        let report = analyze(&config(true), &history, subject, now).unwrap();
        assert_eq!(report.punishment_id, newer_id);
        assert_eq!(report.punishment_count, 2);
    }

    #[test]
    fn test_records_outside_window_ignored() {
        let subject = SubjectId::random();
        let now = Utc::now();
        let history = MemoryHistory::new();
        history.record(record(subject, now - TimeDelta::hours(25))).unwrap();
        assert!(analyze(&config(true), &history, subject, now).is_none());
    }

    #[test]
    fn test_no_modifier_no_report() {
        let subject = SubjectId::random();
        let now = Utc::now();
        let history = MemoryHistory::new();
        history.record(record(subject, now)).unwrap();
        assert!(analyze(&config(false), &history, subject, now).is_none());
    }

    struct BrokenHistory;

    impl PunishmentHistory for BrokenHistory {
        fn punishment_ids(
            &self,
            _version: u32,
            _subject: SubjectId,
            _detection: &DetectionId,
        ) -> Result<Vec<RecordId>, HistoryError> {
            Err(HistoryError::Unavailable("database offline".into()))
        }

        fn punishment(&self, _id: RecordId) -> Result<Option<PunishmentRecord>, HistoryError> {
            Ok(None)
        }

        fn punishment_count(&self, _id: RecordId) -> Result<u32, HistoryError> {
            Ok(0)
        }

        fn record(&self, record: PunishmentRecord) -> Result<RecordId, HistoryError> {
            Ok(record.id)
        }
    }

    #[test]
    fn test_history_failure_yields_no_report() {
        assert!(analyze(&config(true), &BrokenHistory, SubjectId::random(), Utc::now()).is_none());
    }
}
