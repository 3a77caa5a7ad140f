//! The detection context object.
//!
//! [`DetectionManager`] owns every registry of one engine instance: the
//! registered detections (and through them the stage models), the sequence
//! engine, the capture key declarations, and the shared collaborators
//! (punishment history, effects, permissions). Nothing is process-wide.
//!
//! Event flow:
//!
//! ```text
//! on_domain_event ─▶ SequenceEngine::on_event ─▶ Completion
//!                                                   │
//!                    Summary ◀─ Penalty ◀─ Heuristic ◀┘ (StageCycle walk)
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::capture::CaptureRegistry;
use crate::checks;
use crate::config::{DetectionConfig, EngineConfig};
use crate::error::{ConfigError, StageError, VigilError};
use crate::event::{DomainEvent, EventKind, SubjectId};
use crate::heuristic::PunishmentHistory;
use crate::punishment::Effects;
use crate::sequence::{BlueprintKey, BypassTicket, Completion, SequenceBlueprint, SequenceEngine};
use crate::stage::{Report, Stage, StageContext, Summary};
use crate::time::TickRate;

use super::{Detection, DetectionId};

// ============================================================================
// Permissions
// ============================================================================

/// Boolean permission lookups provided by the host.
pub trait Permissions: Send + Sync {
    /// Whether `subject` holds `permission`.
    fn has_permission(&self, subject: SubjectId, permission: &str) -> bool;
}

/// Grants nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPermissions;

impl Permissions for NoPermissions {
    fn has_permission(&self, _subject: SubjectId, _permission: &str) -> bool {
        false
    }
}

// ============================================================================
// DetectionManager
// ============================================================================

/// Owns detections, the sequence engine and the shared collaborators.
pub struct DetectionManager {
    detections: IndexMap<DetectionId, Detection>,
    engine: SequenceEngine,
    captures: CaptureRegistry,
    history: Arc<dyn PunishmentHistory>,
    effects: Arc<dyn Effects>,
    permissions: Arc<dyn Permissions>,
}

impl DetectionManager {
    /// Creates a manager without detections.
    #[must_use]
    pub fn new(
        tick_rate: TickRate,
        history: Arc<dyn PunishmentHistory>,
        effects: Arc<dyn Effects>,
    ) -> Self {
        Self {
            detections: IndexMap::new(),
            engine: SequenceEngine::new(tick_rate),
            captures: CaptureRegistry::new(),
            history,
            effects,
            permissions: Arc::new(NoPermissions),
        }
    }

    /// Creates a manager with the standard detection for every configured
    /// detection id.
    ///
    /// # Errors
    ///
    /// Returns an error if a detection's stage cycle cannot be built or its
    /// capture keys conflict with another detection's.
    pub fn from_config(
        config: &EngineConfig,
        history: Arc<dyn PunishmentHistory>,
        effects: Arc<dyn Effects>,
    ) -> Result<Self, VigilError> {
        let mut manager = Self::new(config.tick_rate(), history, effects);
        for (id, detection) in &config.detections {
            let detection = checks::standard_detection(DetectionId::new(id.as_str()), detection.clone())?;
            manager.register(detection)?;
        }
        Ok(manager)
    }

    /// Replaces the permission lookup.
    #[must_use]
    pub fn with_permissions(mut self, permissions: Arc<dyn Permissions>) -> Self {
        self.permissions = permissions;
        self
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Registers a detection and its check blueprints.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::DuplicateDetection`] if the id is taken, or a
    /// capture conflict if a blueprint redeclares a key with another kind.
    pub fn register(&mut self, detection: Detection) -> Result<(), VigilError> {
        if self.detections.contains_key(detection.id()) {
            return Err(StageError::DuplicateDetection(detection.id().to_string()).into());
        }
        self.install_blueprints(detection.blueprints(self.engine.tick_rate()))?;
        info!(
            detection = %detection.id(),
            name = detection.name(),
            stages = detection.cycle().total_size(),
            "detection registered"
        );
        self.detections.insert(detection.id().clone(), detection);
        Ok(())
    }

    /// Removes a detection, its blueprints and its live sequences.
    pub fn unregister(&mut self, id: &DetectionId) -> Option<Detection> {
        let removed = self.detections.shift_remove(id)?;
        let blueprints = self.engine.unregister_detection(id);
        info!(detection = %id, blueprints, "detection unloaded");
        Some(removed)
    }

    /// Applies a new configuration to a registered detection.
    ///
    /// The stage cycle is rebuilt from the configuration's overrides and the
    /// detection's blueprints are re-registered, which discards its live
    /// sequences.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownDetection`] if `id` is not registered,
    /// or a stage error if the rebuilt cycle is invalid (the detection is
    /// then left unchanged).
    pub fn reload(&mut self, id: &DetectionId, config: DetectionConfig) -> Result<(), VigilError> {
        let archetypes = checks::standard_archetypes(&config);
        let detection = self
            .detections
            .get_mut(id)
            .ok_or_else(|| ConfigError::UnknownDetection(id.to_string()))?;
        detection.reload(config, archetypes)?;

        self.engine.unregister_detection(id);
        let blueprints = self
            .expect_detection(id)
            .blueprints(self.engine.tick_rate());
        self.install_blueprints(blueprints)?;
        info!(detection = %id, "detection reloaded");
        Ok(())
    }

    /// Applies a whole engine configuration: known detections are reloaded,
    /// new ones registered and missing ones unloaded.
    ///
    /// # Errors
    ///
    /// Returns the first registration or reload error.
    pub fn apply_config(&mut self, config: &EngineConfig) -> Result<(), VigilError> {
        let stale: Vec<DetectionId> = self
            .detections
            .keys()
            .filter(|id| !config.detections.contains_key(id.as_str()))
            .cloned()
            .collect();
        for id in &stale {
            self.unregister(id);
        }
        for (id, detection_config) in &config.detections {
            let id = DetectionId::new(id.as_str());
            if self.detections.contains_key(&id) {
                self.reload(&id, detection_config.clone())?;
            } else {
                self.register(checks::standard_detection(id, detection_config.clone())?)?;
            }
        }
        Ok(())
    }

    fn install_blueprints(
        &mut self,
        blueprints: Vec<(BlueprintKey, Arc<SequenceBlueprint>)>,
    ) -> Result<(), VigilError> {
        for (_, blueprint) in &blueprints {
            self.captures.declare_all(blueprint.captures())?;
        }
        for (key, blueprint) in blueprints {
            self.engine.register(key, blueprint);
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Event routing
    // ------------------------------------------------------------------------

    /// Routes one domain event and analyses every sequence it completes.
    ///
    /// Subjects holding a detection's bypass permission never start that
    /// detection's sequences. A `Quit` event drops the subject's live
    /// sequences after routing.
    pub fn on_domain_event(&mut self, event: &DomainEvent) -> Vec<Summary> {
        let subject = event.subject;
        let detections = &self.detections;
        let permissions = &self.permissions;
        let completions = self.engine.on_event(event, |key| {
            detections.get(&key.detection).is_some_and(|detection| {
                detection
                    .config()
                    .bypass_permission
                    .as_deref()
                    .is_none_or(|permission| !permissions.has_permission(subject, permission))
            })
        });

        let summaries = completions
            .into_iter()
            .filter_map(|completion| self.analyse(completion))
            .collect();

        if event.kind() == EventKind::Quit {
            let dropped = self.engine.remove_subject(subject);
            debug!(%subject, dropped, "subject left");
        }
        summaries
    }

    /// Walks the owning detection's stage cycle over one completion.
    fn analyse(&mut self, completion: Completion) -> Option<Summary> {
        let Completion { key, result } = completion;
        let Some(detection) = self.detections.get_mut(&key.detection) else {
            debug!(%key, "completion for unknown detection, skipping");
            return None;
        };

        let mut summary = Summary::new(key, result);
        let ctx = StageContext {
            detection: &detection.id,
            config: &detection.config,
            history: self.history.as_ref(),
            effects: self.effects.as_ref(),
            now: summary.result().completed_at,
        };

        let cycle = &mut detection.cycle;
        cycle.reset();
        while cycle.next() {
            let Some(stage) = cycle.stage().cloned() else {
                continue;
            };
            match stage {
                Stage::Check(_) => {}
                Stage::Heuristic(heuristic) => {
                    if let Some(report) = heuristic.analyze(&ctx, &summary) {
                        summary.attach(Report::Heuristic(report));
                    }
                }
                Stage::Penalty(penalty) => penalty.apply(&ctx, &mut summary),
            }
        }

        info!(
            detection = %summary.detection(),
            check = summary.check(),
            subject = %summary.subject(),
            severity = summary.offense().map(|o| o.severity),
            punishments = summary.outcomes().len(),
            "sequence analysed"
        );
        Some(summary)
    }

    /// Discards every live sequence whose window elapsed at `now`.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        self.engine.sweep(now)
    }

    /// Suppresses routing of the given detections' event kinds for `subject`
    /// until the returned ticket is closed or dropped.
    #[must_use]
    pub fn request_bypass_ticket(
        &self,
        subject: SubjectId,
        detections: &[DetectionId],
    ) -> BypassTicket {
        let kinds = detections
            .iter()
            .flat_map(|id| self.engine.event_kinds_of(id))
            .collect::<Vec<_>>();
        BypassTicket::acquire(self.engine.bypass(), subject, kinds)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// A registered detection.
    #[must_use]
    pub fn detection(&self, id: &DetectionId) -> Option<&Detection> {
        self.detections.get(id)
    }

    /// A registered detection.
    ///
    /// # Panics
    ///
    /// Panics if no detection with `id` is registered.
    #[must_use]
    pub fn expect_detection(&self, id: &DetectionId) -> &Detection {
        self.detections
            .get(id)
            .unwrap_or_else(|| panic!("detection '{id}' is not registered"))
    }

    /// Registered detections in registration order.
    pub fn detections(&self) -> impl Iterator<Item = &Detection> {
        self.detections.values()
    }

    /// The sequence engine.
    #[must_use]
    pub const fn engine(&self) -> &SequenceEngine {
        &self.engine
    }

    /// Declared capture keys.
    #[must_use]
    pub const fn captures(&self) -> &CaptureRegistry {
        &self.captures
    }

    /// Punishment history collaborator.
    #[must_use]
    pub fn history(&self) -> &dyn PunishmentHistory {
        self.history.as_ref()
    }
}

impl std::fmt::Debug for DetectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionManager")
            .field("detections", &self.detections.keys().collect::<Vec<_>>())
            .field("live", &self.engine.live_count())
            .field("captures", &self.captures.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PunishmentLevel;
    use crate::event::EventPayload;
    use crate::heuristic::MemoryHistory;
    use crate::punishment::{EffectCall, PunishmentType, RecordingEffects};
    use crate::sequence::Action;
    use crate::stage::{Check, CheckContext, StageKind, StageModelArchetype, StageModels};
    use chrono::TimeDelta;
    use std::collections::HashSet;

    /// Completes on a join followed by an interact within 10 ticks.
    struct JoinInteract;

    impl Check for JoinInteract {
        fn key(&self) -> &str {
            "join-interact"
        }

        fn blueprint(&self, ctx: &CheckContext<'_>) -> SequenceBlueprint {
            SequenceBlueprint::builder("join-interact")
                .then(Action::on(EventKind::Join))
                .then(Action::on(EventKind::Interact).delay(ctx.tick_rate.ticks(10)))
                .build()
        }
    }

    struct Granted(HashSet<SubjectId>);

    impl Permissions for Granted {
        fn has_permission(&self, subject: SubjectId, permission: &str) -> bool {
            permission == "vigil.bypass" && self.0.contains(&subject)
        }
    }

    fn config() -> DetectionConfig {
        let mut config = DetectionConfig::named("Join Interact");
        config.bypass_permission = Some("vigil.bypass".into());
        config.punishment_levels = vec![PunishmentLevel {
            threshold: 50.0,
            punishment: PunishmentType::Warn,
        }];
        config
    }

    fn detection(config: DetectionConfig) -> Detection {
        let mut models = StageModels::standard();
        models.register(Stage::check(JoinInteract)).unwrap();
        models
            .register(Stage::heuristic(crate::heuristic::HistoryHeuristic))
            .unwrap();
        models
            .register(Stage::penalty(crate::punishment::ThresholdPenalty))
            .unwrap();
        Detection::new(
            DetectionId::new("join-interact"),
            config,
            models,
            StageKind::ALL.iter().map(|k| StageModelArchetype::all(*k)).collect(),
        )
        .unwrap()
    }

    fn manager() -> (DetectionManager, Arc<RecordingEffects>) {
        let effects = Arc::new(RecordingEffects::new());
        let mut manager = DetectionManager::new(
            TickRate::default(),
            Arc::new(MemoryHistory::new()),
            Arc::clone(&effects) as Arc<dyn Effects>,
        );
        manager.register(detection(config())).unwrap();
        (manager, effects)
    }

    fn event(subject: SubjectId, at: DateTime<Utc>, payload: EventPayload) -> DomainEvent {
        DomainEvent::new(subject, at, payload)
    }

    fn interact() -> EventPayload {
        EventPayload::Interact {
            position: crate::event::Vec3::default(),
        }
    }

    #[test]
    fn test_completion_runs_pipeline() {
        let (mut manager, effects) = manager();
        let subject = SubjectId::random();
        let t0 = Utc::now();
        assert!(manager.on_domain_event(&event(subject, t0, EventPayload::Join)).is_empty());
        let summaries =
            manager.on_domain_event(&event(subject, t0 + TimeDelta::milliseconds(100), interact()));
        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.check(), "join-interact");
        assert!((summary.offense().unwrap().severity - 100.0).abs() < 1e-9);
        assert_eq!(summary.outcomes().len(), 1);
        assert!(matches!(&effects.calls()[0], EffectCall::Notify { message, .. } if message.contains("Join Interact")));
    }

    #[test]
    fn test_bypass_permission_prevents_start() {
        let subject = SubjectId::random();
        let (manager, _) = manager();
        let mut manager =
            manager.with_permissions(Arc::new(Granted(std::iter::once(subject).collect())));
        let t0 = Utc::now();
        manager.on_domain_event(&event(subject, t0, EventPayload::Join));
        assert_eq!(manager.engine().live_count(), 0);

        let other = SubjectId::random();
        manager.on_domain_event(&event(other, t0, EventPayload::Join));
        assert_eq!(manager.engine().live_count(), 1);
    }

    #[test]
    fn test_bypass_ticket_suppresses_until_closed() {
        let (mut manager, _) = manager();
        let subject = SubjectId::random();
        let t0 = Utc::now();
        let ticket = manager.request_bypass_ticket(subject, &[DetectionId::new("join-interact")]);
        manager.on_domain_event(&event(subject, t0, EventPayload::Join));
        assert_eq!(manager.engine().live_count(), 0);

        ticket.close();
        manager.on_domain_event(&event(subject, t0, EventPayload::Join));
        assert_eq!(manager.engine().live_count(), 1);
    }

    #[test]
    fn test_sweep_expires_without_summary() {
        let (mut manager, effects) = manager();
        let subject = SubjectId::random();
        let t0 = Utc::now();
        manager.on_domain_event(&event(subject, t0, EventPayload::Join));
        assert_eq!(manager.sweep(t0 + TimeDelta::seconds(1)), 1);
        let late = manager.on_domain_event(&event(subject, t0 + TimeDelta::seconds(1), interact()));
        assert!(late.is_empty());
        assert!(effects.calls().is_empty());
    }

    #[test]
    fn test_quit_drops_live_sequences() {
        let (mut manager, _) = manager();
        let subject = SubjectId::random();
        let t0 = Utc::now();
        manager.on_domain_event(&event(subject, t0, EventPayload::Join));
        manager.on_domain_event(&event(subject, t0, EventPayload::Quit));
        assert_eq!(manager.engine().live_count(), 0);
    }

    #[test]
    fn test_duplicate_detection_rejected() {
        let (mut manager, _) = manager();
        let err = manager.register(detection(config())).unwrap_err();
        assert!(matches!(err, VigilError::Stage(StageError::DuplicateDetection(_))));
    }

    #[test]
    fn test_unregister_removes_blueprints() {
        let (mut manager, _) = manager();
        let id = DetectionId::new("join-interact");
        manager.on_domain_event(&event(SubjectId::random(), Utc::now(), EventPayload::Join));
        assert!(manager.unregister(&id).is_some());
        assert_eq!(manager.engine().live_count(), 0);
        assert_eq!(manager.engine().blueprints().count(), 0);
        assert!(manager.detection(&id).is_none());
    }

    #[test]
    fn test_reload_unknown_detection() {
        let (mut manager, _) = manager();
        let err = manager
            .reload(&DetectionId::new("missing"), config())
            .unwrap_err();
        assert!(matches!(err, VigilError::Config(ConfigError::UnknownDetection(_))));
    }

    #[test]
    #[should_panic(expected = "detection 'missing' is not registered")]
    fn test_expect_detection_panics() {
        let (manager, _) = manager();
        let _ = manager.expect_detection(&DetectionId::new("missing"));
    }
}
