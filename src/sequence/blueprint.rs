//! Declarative multi-step sequence definitions.

use std::sync::Arc;

use crate::capture::{CaptureKey, Capturable, DeclaredKey};
use crate::detection::DetectionId;
use crate::event::{DomainEvent, EventKind};

use super::action::Action;
use super::process::{Condition, Process, ProcessResult};

/// Identifies a registered blueprint: the detection and the check that
/// produced it.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct BlueprintKey {
    /// Owning detection
    pub detection: DetectionId,
    /// Producing check
    pub check: String,
}

impl BlueprintKey {
    /// Creates a key.
    #[must_use]
    pub fn new(detection: DetectionId, check: impl Into<String>) -> Self {
        Self {
            detection,
            check: check.into(),
        }
    }
}

impl std::fmt::Display for BlueprintKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.detection, self.check)
    }
}

/// Predicate deciding whether a blueprint may start for an event.
pub type Gate = Arc<dyn Fn(&DomainEvent) -> bool + Send + Sync>;

/// Immutable, shareable description of a behavioral sequence.
///
/// Built once (usually by a check) and shared by every live sequence that
/// instantiates it.
pub struct SequenceBlueprint {
    name: String,
    actions: Vec<Action>,
    post_conditions: Vec<Condition>,
    captures: Vec<DeclaredKey>,
    gate: Option<Gate>,
}

impl SequenceBlueprint {
    /// Starts building a blueprint.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> BlueprintBuilder {
        BlueprintBuilder {
            blueprint: Self {
                name: name.into(),
                actions: Vec::new(),
                post_conditions: Vec::new(),
                captures: Vec::new(),
                gate: None,
            },
        }
    }

    /// Blueprint name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ordered actions.
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Action at `index`.
    #[must_use]
    pub fn action(&self, index: usize) -> Option<&Action> {
        self.actions.get(index)
    }

    /// Number of actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns `true` if the blueprint has no actions and can never start.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Conditions evaluated after the last action passes.
    #[must_use]
    pub fn post_conditions(&self) -> &[Condition] {
        &self.post_conditions
    }

    /// Capture keys every instance is seeded with.
    #[must_use]
    pub fn captures(&self) -> &[DeclaredKey] {
        &self.captures
    }

    /// Event kinds this blueprint reacts to, deduplicated in action order.
    #[must_use]
    pub fn event_kinds(&self) -> Vec<EventKind> {
        let mut kinds = Vec::new();
        for action in &self.actions {
            if !kinds.contains(&action.kind()) {
                kinds.push(action.kind());
            }
        }
        kinds
    }

    /// Whether a new instance may start for `event`.
    ///
    /// Requires the first action to wait for the event's kind and the gate
    /// (if any) to allow it.
    #[must_use]
    pub fn starts_on(&self, event: &DomainEvent) -> bool {
        self.actions
            .first()
            .is_some_and(|first| first.kind() == event.kind())
            && self.gate.as_ref().is_none_or(|gate| gate(event))
    }
}

impl std::fmt::Debug for SequenceBlueprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceBlueprint")
            .field("name", &self.name)
            .field("actions", &self.actions)
            .field("post_conditions", &self.post_conditions.len())
            .field("captures", &self.captures)
            .field("gated", &self.gate.is_some())
            .finish()
    }
}

/// Builder for [`SequenceBlueprint`].
pub struct BlueprintBuilder {
    blueprint: SequenceBlueprint,
}

impl BlueprintBuilder {
    /// Appends an action.
    #[must_use]
    pub fn then(mut self, action: Action) -> Self {
        self.blueprint.actions.push(action);
        self
    }

    /// Appends a post-completion condition.
    #[must_use]
    pub fn post_condition<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Process<'_>) -> ProcessResult + Send + Sync + 'static,
    {
        self.blueprint
            .post_conditions
            .push(super::process::condition(f));
        self
    }

    /// Seeds every instance's captures with `key`'s default.
    #[must_use]
    pub fn capture<T: Capturable>(mut self, key: &CaptureKey<T>) -> Self {
        self.blueprint.captures.push(key.declared());
        self
    }

    /// Restricts when a new instance may start.
    #[must_use]
    pub fn gate<F>(mut self, f: F) -> Self
    where
        F: Fn(&DomainEvent) -> bool + Send + Sync + 'static,
    {
        self.blueprint.gate = Some(Arc::new(f));
        self
    }

    /// Finishes the blueprint.
    #[must_use]
    pub fn build(self) -> SequenceBlueprint {
        self.blueprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventPayload, SubjectId};
    use chrono::Utc;

    fn join(subject: SubjectId) -> DomainEvent {
        DomainEvent::new(subject, Utc::now(), EventPayload::Join)
    }

    #[test]
    fn test_event_kinds_deduplicated() {
        let blueprint = SequenceBlueprint::builder("combo")
            .then(Action::on(EventKind::Move))
            .then(Action::on(EventKind::Attack))
            .then(Action::on(EventKind::Move))
            .build();
        assert_eq!(blueprint.event_kinds(), vec![EventKind::Move, EventKind::Attack]);
        assert_eq!(blueprint.len(), 3);
    }

    #[test]
    fn test_starts_on_first_action_kind_only() {
        let blueprint = SequenceBlueprint::builder("join-then-move")
            .then(Action::on(EventKind::Join))
            .then(Action::on(EventKind::Move))
            .build();
        assert!(blueprint.starts_on(&join(SubjectId::random())));

        let reversed = SequenceBlueprint::builder("move-then-join")
            .then(Action::on(EventKind::Move))
            .then(Action::on(EventKind::Join))
            .build();
        assert!(!reversed.starts_on(&join(SubjectId::random())));
    }

    #[test]
    fn test_gate_blocks_start() {
        let allowed = SubjectId::random();
        let blueprint = SequenceBlueprint::builder("gated")
            .then(Action::on(EventKind::Join))
            .gate(move |event| event.subject == allowed)
            .build();
        assert!(blueprint.starts_on(&join(allowed)));
        assert!(!blueprint.starts_on(&join(SubjectId::random())));
    }

    #[test]
    fn test_empty_blueprint_never_starts() {
        let blueprint = SequenceBlueprint::builder("empty").build();
        assert!(blueprint.is_empty());
        assert!(!blueprint.starts_on(&join(SubjectId::random())));
    }
}
