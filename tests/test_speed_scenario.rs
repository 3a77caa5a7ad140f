mod common;

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use common::VigilProcess;

use vigil::config::{ConfigLoader, EngineConfig};
use vigil::detection::{DetectionId, DetectionManager};
use vigil::event::{DomainEvent, EventPayload, SubjectId, Vec3};
use vigil::heuristic::{MemoryHistory, PunishmentHistory, PunishmentRecord};
use vigil::punishment::{EffectCall, Effects, PunishmentType, RecordingEffects};
use vigil::stage::Summary;

// ============================================================================
// Helpers
// ============================================================================

fn config() -> EngineConfig {
    let loaded = ConfigLoader::with_defaults()
        .load(&VigilProcess::fixture_path("movement_speed.yaml"))
        .expect("fixture should load");
    (*loaded.config).clone()
}

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
}

fn movement(subject: SubjectId, at: DateTime<Utc>, x: f64, dx: f64, material: &str) -> DomainEvent {
    DomainEvent::new(
        subject,
        at,
        EventPayload::Move {
            from: Vec3::new(x, 64.0, 0.0),
            to: Vec3::new(x + dx, 64.0, 0.0),
            on_ground: true,
            world: "overworld".into(),
            material: material.into(),
        },
    )
}

struct Harness {
    manager: DetectionManager,
    history: Arc<MemoryHistory>,
    effects: Arc<RecordingEffects>,
}

impl Harness {
    fn new(config: &EngineConfig, records: Vec<PunishmentRecord>) -> Self {
        let history = Arc::new(MemoryHistory::from_records(records));
        let effects = Arc::new(RecordingEffects::new());
        let manager = DetectionManager::from_config(
            config,
            Arc::clone(&history) as Arc<dyn PunishmentHistory>,
            Arc::clone(&effects) as Arc<dyn Effects>,
        )
        .expect("standard detections should assemble");
        Self {
            manager,
            history,
            effects,
        }
    }

    /// Two consecutive moves of `dx` blocks, 50ms apart.
    fn run_fast(&mut self, subject: SubjectId, at: DateTime<Utc>, dx: f64, material: &str) -> Vec<Summary> {
        let mut summaries = self
            .manager
            .on_domain_event(&movement(subject, at, 0.0, dx, material));
        summaries.extend(self.manager.on_domain_event(&movement(
            subject,
            at + TimeDelta::milliseconds(50),
            dx,
            dx,
            material,
        )));
        summaries
    }
}

fn prior(subject: SubjectId, issued_at: DateTime<Utc>) -> PunishmentRecord {
    PunishmentRecord::new(
        DetectionId::new("movement-speed"),
        subject,
        issued_at,
        PunishmentType::Warn,
    )
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn recent_punishment_escalates_to_warn() {
    let subject = SubjectId::random();
    let mut harness = Harness::new(&config(), vec![prior(subject, noon() - TimeDelta::hours(1))]);

    let summaries = harness.run_fast(subject, noon(), 0.9, "stone");
    assert_eq!(summaries.len(), 1);
    let summary = &summaries[0];
    assert_eq!(summary.check(), "speed");

    let report = summary.heuristic().expect("recent punishment should be found");
    assert_eq!(report.punishment_count, 1);
    assert!((report.transform.divider() - 99.0).abs() < f64::EPSILON);

    let offense = summary.offense().expect("penalty should compute an offense");
    assert!((offense.base - 50.0).abs() < 1e-9);
    assert!((offense.severity - 25.507_601_265_177_02).abs() < 1e-9);
    assert_eq!(offense.percentage(), 26);

    let outcomes = summary.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].punishment, PunishmentType::Warn);
    assert!(outcomes[0].succeeded());

    assert_eq!(
        harness.effects.calls(),
        vec![
            EffectCall::Notify {
                subject,
                message: "You were caught by Movement Speed (26% certainty)".into(),
            },
            EffectCall::Teleport {
                subject,
                to: Vec3::new(0.0, 64.0, 0.0),
            },
        ]
    );
    assert_eq!(harness.history.len(), 2);
}

#[test]
fn stale_punishment_is_ignored() {
    let subject = SubjectId::random();
    let mut harness = Harness::new(&config(), vec![prior(subject, noon() - TimeDelta::hours(25))]);

    let summaries = harness.run_fast(subject, noon(), 0.9, "stone");
    let summary = &summaries[0];
    assert!(summary.heuristic().is_none());
    assert_eq!(summary.offense().unwrap().percentage(), 50);
}

#[test]
fn punishments_of_other_subjects_do_not_count() {
    let subject = SubjectId::random();
    let mut harness = Harness::new(
        &config(),
        vec![prior(SubjectId::random(), noon() - TimeDelta::minutes(5))],
    );
    let summaries = harness.run_fast(subject, noon(), 0.9, "stone");
    assert!(summaries[0].heuristic().is_none());
}

#[test]
fn issued_punishment_feeds_the_next_analysis() {
    let subject = SubjectId::random();
    let mut harness = Harness::new(&config(), Vec::new());

    let first = harness.run_fast(subject, noon(), 0.9, "stone");
    assert!(first[0].heuristic().is_none());
    assert_eq!(harness.history.len(), 1);

    let later = noon() + TimeDelta::minutes(10);
    let second = harness.run_fast(subject, later, 0.9, "stone");
    let report = second[0].heuristic().expect("first punishment should count");
    assert_eq!(report.punishment_count, 1);
    assert_eq!(harness.history.len(), 2);
}

#[test]
fn ice_raises_the_speed_limit() {
    let subject = SubjectId::random();
    let mut harness = Harness::new(&config(), Vec::new());
    assert!(harness.run_fast(subject, noon(), 0.7, "ice").is_empty());
    assert!(harness.effects.calls().is_empty());

    let later = noon() + TimeDelta::seconds(5);
    assert_eq!(harness.run_fast(subject, later, 0.7, "stone").len(), 1);
}

#[test]
fn offline_subject_is_not_recorded() {
    let subject = SubjectId::random();
    let mut harness = Harness::new(&config(), Vec::new());
    harness.effects.set_offline(subject);

    let summaries = harness.run_fast(subject, noon(), 0.9, "stone");
    let outcome = &summaries[0].outcomes()[0];
    assert!(!outcome.succeeded());
    assert!(outcome.record.is_none());
    assert!(harness.history.is_empty());
    assert!(harness.effects.calls().is_empty(), "no setback after a failed warn");
}

#[test]
fn reach_is_excluded_by_the_fixture() {
    let harness = Harness::new(&config(), Vec::new());
    let id = DetectionId::new("movement-speed");
    let kinds = harness.manager.engine().event_kinds_of(&id);
    assert!(kinds.iter().all(|kind| kind.as_str() == "move"), "{kinds:?}");
}

#[test]
fn full_range_reaches_every_level() {
    let mut config = config();
    let detection = config.detections.get_mut("movement-speed").unwrap();
    detection.heuristic_range_maximum = 100.0;
    detection.heuristic_modifier = None;

    let subject = SubjectId::random();
    let mut harness = Harness::new(&config, Vec::new());
    let summaries = harness.run_fast(subject, noon(), 0.9, "stone");
    let issued: Vec<PunishmentType> = summaries[0]
        .outcomes()
        .iter()
        .map(|o| o.punishment)
        .collect();
    assert_eq!(issued, vec![PunishmentType::Warn, PunishmentType::Kick]);
}
