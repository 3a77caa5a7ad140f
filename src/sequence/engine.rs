//! Sequence engine orchestration.
//!
//! The `SequenceEngine` owns every registered blueprint and the live
//! sequences per subject. Each inbound event is routed to the subject's
//! live sequences first; blueprints not yet running for the subject are
//! then instantiated when the event matches their first action.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::{debug, info, trace};

use crate::detection::DetectionId;
use crate::event::{DomainEvent, EventKind, SubjectId};
use crate::observability::metrics;
use crate::time::TickRate;

use super::blueprint::{BlueprintKey, SequenceBlueprint};
use super::bypass::{BypassRegistry, TicketId};
use super::instance::{Sequence, SequenceState, Step};
use super::result::SequenceResult;

/// A sequence that completed while processing an event.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Blueprint the sequence instantiated
    pub key: BlueprintKey,
    /// Outcome handed to the stage pipeline
    pub result: SequenceResult,
}

/// Registry of blueprints and their live instances.
pub struct SequenceEngine {
    /// Registered blueprints in registration order
    blueprints: IndexMap<BlueprintKey, Arc<SequenceBlueprint>>,
    /// Live sequences per subject
    live: HashMap<SubjectId, Vec<Sequence>>,
    /// Outstanding observer suppressions
    bypass: Arc<BypassRegistry>,
    /// Tick length handed to conditions
    tick_rate: TickRate,
}

impl SequenceEngine {
    /// Creates an empty engine.
    #[must_use]
    pub fn new(tick_rate: TickRate) -> Self {
        Self {
            blueprints: IndexMap::new(),
            live: HashMap::new(),
            bypass: Arc::new(BypassRegistry::new()),
            tick_rate,
        }
    }

    /// Tick length handed to conditions.
    #[must_use]
    pub const fn tick_rate(&self) -> TickRate {
        self.tick_rate
    }

    /// Registers a blueprint under `key`.
    ///
    /// Replacing an existing blueprint discards its live instances.
    pub fn register(&mut self, key: BlueprintKey, blueprint: Arc<SequenceBlueprint>) {
        if blueprint.is_empty() {
            debug!(%key, "registering blueprint without actions; it will never start");
        }
        if self.blueprints.insert(key.clone(), blueprint).is_some() {
            self.discard_where(|seq| seq.key() == &key);
        }
        trace!(%key, "blueprint registered");
    }

    /// Removes a blueprint and its live instances.
    pub fn unregister(&mut self, key: &BlueprintKey) -> bool {
        let removed = self.blueprints.shift_remove(key).is_some();
        if removed {
            self.discard_where(|seq| seq.key() == key);
        }
        removed
    }

    /// Removes every blueprint owned by `detection`.
    ///
    /// Returns the number of blueprints removed.
    pub fn unregister_detection(&mut self, detection: &DetectionId) -> usize {
        let before = self.blueprints.len();
        self.blueprints.retain(|key, _| &key.detection != detection);
        let removed = before - self.blueprints.len();
        if removed > 0 {
            self.discard_where(|seq| &seq.key().detection == detection);
        }
        removed
    }

    /// Blueprint registered under `key`.
    #[must_use]
    pub fn blueprint(&self, key: &BlueprintKey) -> Option<&Arc<SequenceBlueprint>> {
        self.blueprints.get(key)
    }

    /// Registered blueprints in registration order.
    pub fn blueprints(&self) -> impl Iterator<Item = (&BlueprintKey, &Arc<SequenceBlueprint>)> {
        self.blueprints.iter()
    }

    /// Event kinds observed by the blueprints of `detection`.
    #[must_use]
    pub fn event_kinds_of(&self, detection: &DetectionId) -> Vec<EventKind> {
        let mut kinds = Vec::new();
        for (key, blueprint) in &self.blueprints {
            if &key.detection != detection {
                continue;
            }
            for kind in blueprint.event_kinds() {
                if !kinds.contains(&kind) {
                    kinds.push(kind);
                }
            }
        }
        kinds
    }

    /// Routes one event.
    ///
    /// `may_start` is consulted before a new instance is created; it is the
    /// hook for permission checks. Returns the sequences that completed.
    pub fn on_event(
        &mut self,
        event: &DomainEvent,
        may_start: impl Fn(&BlueprintKey) -> bool,
    ) -> Vec<Completion> {
        let subject = event.subject;
        if self.bypass.is_suppressed(subject, event.kind()) {
            trace!(%subject, kind = %event.kind(), "event suppressed by bypass ticket");
            return Vec::new();
        }

        let mut completions = Vec::new();
        let live = self.live.entry(subject).or_default();

        for seq in live.iter_mut() {
            let step = seq.advance(event);
            observe_step(seq.key(), subject, step);
        }
        let (finished, active): (Vec<Sequence>, Vec<Sequence>) =
            std::mem::take(live).into_iter().partition(Sequence::is_finished);

        // An instance that failed or expired on this event frees its slot so
        // the same event may start a fresh one; a completed one does not.
        let running: HashSet<BlueprintKey> = active
            .iter()
            .chain(
                finished
                    .iter()
                    .filter(|seq| seq.state() == SequenceState::Completed),
            )
            .map(|seq| seq.key().clone())
            .collect();
        *live = active;
        completions.extend(finished.into_iter().filter_map(into_completion));

        for (key, blueprint) in &self.blueprints {
            if running.contains(key) || !blueprint.starts_on(event) || !may_start(key) {
                continue;
            }
            let mut seq = Sequence::new(
                key.clone(),
                Arc::clone(blueprint),
                subject,
                event.at,
                self.tick_rate,
            );
            metrics::record_sequence_started(key.detection.as_str());
            let step = seq.advance(event);
            observe_step(key, subject, step);
            if seq.is_finished() {
                completions.extend(into_completion(seq));
            } else {
                live.push(seq);
            }
        }

        if live.is_empty() {
            self.live.remove(&subject);
        }
        metrics::set_live_sequences(self.live_count());
        completions
    }

    /// Discards every live sequence whose window elapsed at `now`.
    ///
    /// Returns the number of expired sequences.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let mut expired = 0;
        for (subject, live) in &mut self.live {
            live.retain_mut(|seq| {
                if !seq.is_expired(now) {
                    return true;
                }
                seq.expire();
                debug!(key = %seq.key(), %subject, "sequence expired");
                metrics::record_sequence_expired(seq.key().detection.as_str());
                expired += 1;
                false
            });
        }
        self.live.retain(|_, live| !live.is_empty());
        if expired > 0 {
            metrics::set_live_sequences(self.live_count());
        }
        expired
    }

    /// Suppresses routing of `kind` events for `subject`.
    pub fn avoid_observer(&self, subject: SubjectId, kind: EventKind) -> TicketId {
        self.bypass.avoid(subject, kind)
    }

    /// Releases a suppression obtained from [`Self::avoid_observer`].
    pub fn unavoid_observer(&self, subject: SubjectId, kind: EventKind, ticket: TicketId) -> bool {
        self.bypass.unavoid(subject, kind, ticket)
    }

    /// Shared handle to the bypass registry.
    #[must_use]
    pub fn bypass(&self) -> Arc<BypassRegistry> {
        Arc::clone(&self.bypass)
    }

    /// Drops all live sequences of a subject (e.g. on disconnect).
    pub fn remove_subject(&mut self, subject: SubjectId) -> usize {
        let removed = self.live.remove(&subject).map_or(0, |live| live.len());
        metrics::set_live_sequences(self.live_count());
        removed
    }

    /// Live sequences of one subject.
    #[must_use]
    pub fn live_for(&self, subject: SubjectId) -> &[Sequence] {
        self.live.get(&subject).map_or(&[][..], Vec::as_slice)
    }

    /// Total number of live sequences.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.values().map(Vec::len).sum()
    }

    fn discard_where(&mut self, matches: impl Fn(&Sequence) -> bool) {
        for live in self.live.values_mut() {
            live.retain(|seq| !matches(seq));
        }
        self.live.retain(|_, live| !live.is_empty());
    }
}

impl std::fmt::Debug for SequenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceEngine")
            .field("blueprints", &self.blueprints.len())
            .field("live", &self.live_count())
            .field("tick_rate", &self.tick_rate)
            .finish_non_exhaustive()
    }
}

fn observe_step(key: &BlueprintKey, subject: SubjectId, step: Step) {
    match step {
        Step::Ignored | Step::Held => {}
        Step::Advanced { cursor } => trace!(%key, %subject, cursor, "sequence advanced"),
        Step::Completed => {
            info!(%key, %subject, "sequence completed");
            metrics::record_sequence_completed(key.detection.as_str());
        }
        Step::Failed(reason) => {
            debug!(%key, %subject, reason = reason.as_str(), "sequence discarded");
            if matches!(reason, super::instance::FailReason::Expired) {
                metrics::record_sequence_expired(key.detection.as_str());
            } else {
                metrics::record_sequence_failed(key.detection.as_str(), reason.as_str());
            }
        }
    }
}

fn into_completion(seq: Sequence) -> Option<Completion> {
    if seq.state() != SequenceState::Completed {
        return None;
    }
    let key = seq.key().clone();
    Some(Completion {
        key,
        result: seq.into_result(),
    })
}
