//! Live sequence instances.
//!
//! A [`Sequence`] binds one subject to one blueprint and walks its actions
//! as matching events arrive:
//!
//! ```text
//! (created on first matching event) -> Active(i) -> Active(i + 1)
//!                                                -> Completed
//!                                                -> Failed
//!                                                -> Expired
//! ```
//!
//! Events of the wrong kind never cause a transition. An event arriving
//! after the current action's window has elapsed expires the sequence
//! before its conditions are evaluated.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use crate::capture::CaptureContainer;
use crate::event::{DomainEvent, SubjectId};
use crate::time::TickRate;

use super::action::ScheduleState;
use super::blueprint::{BlueprintKey, SequenceBlueprint};
use super::process::{Process, Verdict, evaluate_all};
use super::result::{SequencePoint, SequenceResult};

/// Lifecycle state of a live sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    /// Waiting for the action at `cursor`
    Active {
        /// Index of the awaited action
        cursor: usize,
    },
    /// All actions and post-conditions passed
    Completed,
    /// A condition or post-condition ended the sequence
    Failed,
    /// No qualifying event arrived within the window
    Expired,
}

/// Why a sequence was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailReason {
    /// A condition of the action at `action` ended the sequence
    Condition {
        /// Index of the failing action
        action: usize,
    },
    /// A post-completion condition rejected the sequence
    PostCondition,
    /// The window of the awaited action elapsed
    Expired,
}

impl FailReason {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Condition { .. } => "condition",
            Self::PostCondition => "post_condition",
            Self::Expired => "expired",
        }
    }
}

/// Result of offering one event to a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Event does not concern the awaited action
    Ignored,
    /// Conditions asked to wait (or a schedule needs more repeats)
    Held,
    /// Cursor moved to `cursor`
    Advanced {
        /// New cursor
        cursor: usize,
    },
    /// Sequence completed
    Completed,
    /// Sequence was discarded
    Failed(FailReason),
}

/// One live instance of a blueprint for one subject.
#[derive(Debug)]
pub struct Sequence {
    key: BlueprintKey,
    blueprint: Arc<SequenceBlueprint>,
    subject: SubjectId,
    captures: CaptureContainer,
    state: SequenceState,
    started_at: DateTime<Utc>,
    last_action_at: Option<DateTime<Utc>>,
    schedules: Vec<ScheduleState>,
    points: Vec<SequencePoint>,
    tick_rate: TickRate,
}

impl Sequence {
    /// Creates a sequence waiting for its first action.
    #[must_use]
    pub fn new(
        key: BlueprintKey,
        blueprint: Arc<SequenceBlueprint>,
        subject: SubjectId,
        started_at: DateTime<Utc>,
        tick_rate: TickRate,
    ) -> Self {
        let captures = CaptureContainer::seeded(blueprint.captures());
        let schedules = vec![ScheduleState::default(); blueprint.len()];
        Self {
            key,
            blueprint,
            subject,
            captures,
            state: SequenceState::Active { cursor: 0 },
            started_at,
            last_action_at: None,
            schedules,
            points: Vec::new(),
            tick_rate,
        }
    }

    /// Key of the blueprint this sequence instantiates.
    #[must_use]
    pub const fn key(&self) -> &BlueprintKey {
        &self.key
    }

    /// The blueprint.
    #[must_use]
    pub fn blueprint(&self) -> &SequenceBlueprint {
        &self.blueprint
    }

    /// Subject the sequence runs for.
    #[must_use]
    pub const fn subject(&self) -> SubjectId {
        self.subject
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SequenceState {
        self.state
    }

    /// Index of the awaited action, while active.
    #[must_use]
    pub const fn cursor(&self) -> Option<usize> {
        match self.state {
            SequenceState::Active { cursor } => Some(cursor),
            _ => None,
        }
    }

    /// Whether the sequence reached a terminal state.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        !matches!(self.state, SequenceState::Active { .. })
    }

    /// Captures gathered so far.
    #[must_use]
    pub const fn captures(&self) -> &CaptureContainer {
        &self.captures
    }

    /// Time of the last action that advanced or re-armed the sequence.
    #[must_use]
    pub const fn last_action_at(&self) -> Option<DateTime<Utc>> {
        self.last_action_at
    }

    /// Counted repeats of the scheduled action at `action`.
    #[must_use]
    pub fn repeats(&self, action: usize) -> u32 {
        self.schedules.get(action).map_or(0, ScheduleState::repeats)
    }

    /// Evaluations recorded so far.
    #[must_use]
    pub fn points(&self) -> &[SequencePoint] {
        &self.points
    }

    /// Instant after which the awaited action can no longer arrive.
    ///
    /// `None` before the first action and for actions without a window.
    #[must_use]
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        let cursor = self.cursor()?;
        let last = self.last_action_at?;
        let window = self.blueprint.action(cursor)?.window();
        if window <= TimeDelta::zero() {
            return None;
        }
        last.checked_add_signed(window)
    }

    /// Whether the awaited action's window has elapsed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.deadline().is_some_and(|deadline| now > deadline)
    }

    /// Marks the sequence as expired.
    pub const fn expire(&mut self) {
        self.state = SequenceState::Expired;
    }

    /// Offers one event to the sequence.
    pub fn advance(&mut self, event: &DomainEvent) -> Step {
        let Some(cursor) = self.cursor() else {
            return Step::Ignored;
        };
        if event.subject != self.subject {
            return Step::Ignored;
        }

        let blueprint = Arc::clone(&self.blueprint);
        let Some(action) = blueprint.action(cursor) else {
            return Step::Ignored;
        };
        if action.kind() != event.kind() {
            return Step::Ignored;
        }

        if self.is_expired(event.at) {
            self.expire();
            return Step::Failed(FailReason::Expired);
        }

        let schedule = action.schedule();
        if let Some(repeat) = schedule {
            if !self.schedules[cursor].is_due(repeat, event.at) {
                return Step::Ignored;
            }
        }

        let result = {
            let mut process = Process::new(
                event,
                &mut self.captures,
                self.last_action_at,
                self.tick_rate,
            );
            action.evaluate(&mut process)
        };

        match result.verdict() {
            Verdict::Next => {
                self.record(cursor, true, event.at);
                self.last_action_at = Some(event.at);
                if let Some(repeat) = schedule {
                    if !self.schedules[cursor].count(repeat, event.at) {
                        return Step::Held;
                    }
                }
                if cursor + 1 < blueprint.len() {
                    self.state = SequenceState::Active { cursor: cursor + 1 };
                    Step::Advanced { cursor: cursor + 1 }
                } else {
                    self.finish(event)
                }
            }
            Verdict::Skip => {
                self.record(cursor, false, event.at);
                Step::Held
            }
            Verdict::End { passed: true } => {
                self.record(cursor, true, event.at);
                self.last_action_at = Some(event.at);
                self.finish(event)
            }
            Verdict::End { passed: false } => {
                self.record(cursor, false, event.at);
                self.state = SequenceState::Failed;
                Step::Failed(FailReason::Condition { action: cursor })
            }
        }
    }

    /// Runs the blueprint's post-completion conditions.
    fn finish(&mut self, event: &DomainEvent) -> Step {
        let blueprint = Arc::clone(&self.blueprint);
        let result = {
            let mut process = Process::new(
                event,
                &mut self.captures,
                self.last_action_at,
                self.tick_rate,
            );
            evaluate_all(blueprint.post_conditions(), &mut process)
        };

        if result.is_next() || result.is_pass() {
            self.state = SequenceState::Completed;
            Step::Completed
        } else {
            self.state = SequenceState::Failed;
            Step::Failed(FailReason::PostCondition)
        }
    }

    fn record(&mut self, action: usize, passed: bool, at: DateTime<Utc>) {
        self.points.push(SequencePoint { action, passed, at });
    }

    /// Consumes a completed sequence into its result.
    #[must_use]
    pub fn into_result(self) -> SequenceResult {
        let completed_at = self.last_action_at.unwrap_or(self.started_at);
        SequenceResult {
            blueprint: self.blueprint.name().to_string(),
            subject: self.subject,
            started_at: self.started_at,
            completed_at,
            points: self.points,
            captures: self.captures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureKey;
    use crate::detection::DetectionId;
    use crate::event::{EventKind, EventPayload};
    use crate::sequence::Action;

    const COUNTER: CaptureKey<i64> = CaptureKey::new("counter", 0);

    fn key() -> BlueprintKey {
        BlueprintKey::new(DetectionId::new("test"), "check")
    }

    fn event(subject: SubjectId, at: DateTime<Utc>, payload: EventPayload) -> DomainEvent {
        DomainEvent::new(subject, at, payload)
    }

    fn start(blueprint: SequenceBlueprint, subject: SubjectId, at: DateTime<Utc>) -> Sequence {
        Sequence::new(key(), Arc::new(blueprint), subject, at, TickRate::default())
    }

    #[test]
    fn test_single_next_action_completes_after_one_event() {
        let subject = SubjectId::random();
        let now = Utc::now();
        let blueprint = SequenceBlueprint::builder("one")
            .then(Action::on(EventKind::Join).condition(|p| p.next()))
            .build();
        let mut seq = start(blueprint, subject, now);

        assert_eq!(seq.advance(&event(subject, now, EventPayload::Join)), Step::Completed);
        assert_eq!(seq.state(), SequenceState::Completed);
        let result = seq.into_result();
        assert_eq!(result.points.len(), 1);
        assert!((result.pass_fraction() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_end_without_pass_fails() {
        let subject = SubjectId::random();
        let now = Utc::now();
        let blueprint = SequenceBlueprint::builder("fail")
            .then(Action::on(EventKind::Join).condition(|p| p.end()))
            .build();
        let mut seq = start(blueprint, subject, now);

        assert_eq!(
            seq.advance(&event(subject, now, EventPayload::Join)),
            Step::Failed(FailReason::Condition { action: 0 })
        );
        assert_eq!(seq.state(), SequenceState::Failed);
    }

    #[test]
    fn test_end_with_pass_completes_early() {
        let subject = SubjectId::random();
        let now = Utc::now();
        let blueprint = SequenceBlueprint::builder("shortcut")
            .then(Action::on(EventKind::Join).condition(|p| p.pass()))
            .then(Action::on(EventKind::Quit))
            .build();
        let mut seq = start(blueprint, subject, now);
        assert_eq!(seq.advance(&event(subject, now, EventPayload::Join)), Step::Completed);
    }

    #[test]
    fn test_wrong_kind_is_ignored() {
        let subject = SubjectId::random();
        let now = Utc::now();
        let blueprint = SequenceBlueprint::builder("join")
            .then(Action::on(EventKind::Join))
            .build();
        let mut seq = start(blueprint, subject, now);
        assert_eq!(seq.advance(&event(subject, now, EventPayload::Quit)), Step::Ignored);
        assert_eq!(seq.cursor(), Some(0));
    }

    #[test]
    fn test_other_subject_is_ignored() {
        let subject = SubjectId::random();
        let now = Utc::now();
        let blueprint = SequenceBlueprint::builder("join")
            .then(Action::on(EventKind::Join))
            .build();
        let mut seq = start(blueprint, subject, now);
        assert_eq!(
            seq.advance(&event(SubjectId::random(), now, EventPayload::Join)),
            Step::Ignored
        );
    }

    #[test]
    fn test_skip_holds_cursor() {
        let subject = SubjectId::random();
        let now = Utc::now();
        let blueprint = SequenceBlueprint::builder("wait")
            .then(Action::on(EventKind::Join))
            .then(Action::on(EventKind::Interact).condition(|p| {
                let seen = p.captures_mut().transform(&COUNTER, |n| n + 1, 0);
                if seen < 2 { p.skip() } else { p.next() }
            }))
            .build();
        let mut seq = start(blueprint, subject, now);
        let interact = EventPayload::Interact {
            position: crate::event::Vec3::default(),
        };

        assert_eq!(
            seq.advance(&event(subject, now, EventPayload::Join)),
            Step::Advanced { cursor: 1 }
        );
        assert_eq!(seq.advance(&event(subject, now, interact.clone())), Step::Held);
        assert_eq!(seq.cursor(), Some(1));
        assert_eq!(seq.advance(&event(subject, now, interact)), Step::Completed);

        let result = seq.into_result();
        assert_eq!(result.passed(), 2);
        assert_eq!(result.failed(), 1);
    }

    #[test]
    fn test_expires_after_window() {
        let subject = SubjectId::random();
        let now = Utc::now();
        let blueprint = SequenceBlueprint::builder("timed")
            .then(Action::on(EventKind::Join))
            .then(
                Action::on(EventKind::Quit)
                    .delay(TimeDelta::seconds(2))
                    .expire(TimeDelta::seconds(1)),
            )
            .build();
        let mut seq = start(blueprint, subject, now);
        seq.advance(&event(subject, now, EventPayload::Join));

        assert_eq!(seq.deadline(), Some(now + TimeDelta::seconds(3)));
        assert!(!seq.is_expired(now + TimeDelta::seconds(3)));
        assert!(seq.is_expired(now + TimeDelta::milliseconds(3001)));

        let late = event(subject, now + TimeDelta::seconds(4), EventPayload::Quit);
        assert_eq!(seq.advance(&late), Step::Failed(FailReason::Expired));
        assert_eq!(seq.state(), SequenceState::Expired);
    }

    #[test]
    fn test_event_within_window_advances() {
        let subject = SubjectId::random();
        let now = Utc::now();
        let blueprint = SequenceBlueprint::builder("timed")
            .then(Action::on(EventKind::Join))
            .then(Action::on(EventKind::Quit).delay(TimeDelta::seconds(2)))
            .build();
        let mut seq = start(blueprint, subject, now);
        seq.advance(&event(subject, now, EventPayload::Join));
        let quit = event(subject, now + TimeDelta::seconds(1), EventPayload::Quit);
        assert_eq!(seq.advance(&quit), Step::Completed);
    }

    #[test]
    fn test_schedule_counts_repeats() {
        let subject = SubjectId::random();
        let now = Utc::now();
        let blueprint = SequenceBlueprint::builder("sample")
            .then(
                Action::on(EventKind::Interact)
                    .repeat(TimeDelta::seconds(2), 5)
                    .condition(|p| p.next()),
            )
            .build();
        let mut seq = start(blueprint, subject, now);
        assert_eq!(seq.repeats(0), 0);

        for i in 0..3 {
            let at = now + TimeDelta::seconds(2 * i);
            let step = seq.advance(&event(
                subject,
                at,
                EventPayload::Interact {
                    position: crate::event::Vec3::default(),
                },
            ));
            assert_eq!(step, Step::Held);
        }
        assert_eq!(seq.repeats(0), 3);
    }

    #[test]
    fn test_schedule_ignores_events_inside_period() {
        let subject = SubjectId::random();
        let now = Utc::now();
        let blueprint = SequenceBlueprint::builder("sample")
            .then(Action::on(EventKind::Join).repeat(TimeDelta::seconds(2), 2))
            .build();
        let mut seq = start(blueprint, subject, now);

        assert_eq!(seq.advance(&event(subject, now, EventPayload::Join)), Step::Held);
        let early = event(subject, now + TimeDelta::seconds(1), EventPayload::Join);
        assert_eq!(seq.advance(&early), Step::Ignored);
        assert_eq!(seq.repeats(0), 1);
        let due = event(subject, now + TimeDelta::seconds(2), EventPayload::Join);
        assert_eq!(seq.advance(&due), Step::Completed);
    }

    #[test]
    fn test_post_condition_rejects() {
        let subject = SubjectId::random();
        let now = Utc::now();
        let blueprint = SequenceBlueprint::builder("post")
            .then(Action::on(EventKind::Join))
            .post_condition(|p| p.end())
            .build();
        let mut seq = start(blueprint, subject, now);
        assert_eq!(
            seq.advance(&event(subject, now, EventPayload::Join)),
            Step::Failed(FailReason::PostCondition)
        );
    }

    #[test]
    fn test_captures_seeded_and_kept_in_result() {
        let subject = SubjectId::random();
        let now = Utc::now();
        let blueprint = SequenceBlueprint::builder("captures")
            .capture(&COUNTER)
            .then(Action::on(EventKind::Join).condition(|p| {
                p.captures_mut().transform(&COUNTER, |n| n + 5, 0);
                p.next()
            }))
            .build();
        let mut seq = start(blueprint, subject, now);
        assert_eq!(seq.captures().get(&COUNTER), Some(0));
        seq.advance(&event(subject, now, EventPayload::Join));
        assert_eq!(seq.into_result().captures.get(&COUNTER), Some(5));
    }

    #[test]
    fn test_finished_sequence_ignores_events() {
        let subject = SubjectId::random();
        let now = Utc::now();
        let blueprint = SequenceBlueprint::builder("once")
            .then(Action::on(EventKind::Join))
            .build();
        let mut seq = start(blueprint, subject, now);
        seq.advance(&event(subject, now, EventPayload::Join));
        assert_eq!(seq.advance(&event(subject, now, EventPayload::Join)), Step::Ignored);
    }
}
