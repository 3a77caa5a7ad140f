//! Blueprint steps.
//!
//! An [`Action`] waits for one event kind and evaluates its conditions in
//! declaration order. Actions with a [`Repeat`] schedule become periodic
//! re-checks: each passing evaluation at least one period after the last
//! counted one bumps the repeat counter, and the action only advances once
//! the configured number of repeats is reached.

use chrono::{DateTime, TimeDelta, Utc};

use crate::event::EventKind;

use super::process::{Condition, Process, ProcessResult, evaluate_all};

/// Periodic re-check schedule of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Repeat {
    /// Minimum spacing between counted evaluations
    pub period: TimeDelta,
    /// Counted evaluations required before the action advances
    pub times: u32,
}

/// One step of a sequence blueprint.
#[derive(Clone)]
pub struct Action {
    kind: EventKind,
    conditions: Vec<Condition>,
    delay: TimeDelta,
    expire: TimeDelta,
    repeat: Option<Repeat>,
}

impl Action {
    /// Creates an action waiting for events of `kind`, with no window.
    #[must_use]
    pub const fn on(kind: EventKind) -> Self {
        Self {
            kind,
            conditions: Vec::new(),
            delay: TimeDelta::zero(),
            expire: TimeDelta::zero(),
            repeat: None,
        }
    }

    /// Appends a condition.
    #[must_use]
    pub fn condition<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Process<'_>) -> ProcessResult + Send + Sync + 'static,
    {
        self.conditions.push(super::process::condition(f));
        self
    }

    /// Appends an already wrapped condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Window after the previous action within which this action's event
    /// must arrive.
    #[must_use]
    pub fn delay(mut self, delay: TimeDelta) -> Self {
        self.delay = delay;
        self
    }

    /// Grace period added to the delay before the sequence expires.
    #[must_use]
    pub fn expire(mut self, expire: TimeDelta) -> Self {
        self.expire = expire;
        self
    }

    /// Turns this action into a periodic re-check.
    ///
    /// A zero period or zero repeat count leaves the action one-shot.
    #[must_use]
    pub fn repeat(mut self, period: TimeDelta, times: u32) -> Self {
        self.repeat = (period > TimeDelta::zero() && times > 0).then_some(Repeat { period, times });
        self
    }

    /// Event kind this action waits for.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// Declared window.
    #[must_use]
    pub fn window(&self) -> TimeDelta {
        self.delay.checked_add(&self.expire).unwrap_or(TimeDelta::MAX)
    }

    /// Repeat schedule, when this is a scheduled action.
    #[must_use]
    pub const fn schedule(&self) -> Option<Repeat> {
        self.repeat
    }

    /// Number of conditions.
    #[must_use]
    pub fn condition_count(&self) -> usize {
        self.conditions.len()
    }

    /// Evaluates all conditions in order.
    pub(crate) fn evaluate(&self, process: &mut Process<'_>) -> ProcessResult {
        evaluate_all(&self.conditions, process)
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("kind", &self.kind)
            .field("conditions", &self.conditions.len())
            .field("delay", &self.delay)
            .field("expire", &self.expire)
            .field("repeat", &self.repeat)
            .finish()
    }
}

/// Repeat bookkeeping for one scheduled action of a live sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleState {
    repeats: u32,
    last_counted: Option<DateTime<Utc>>,
}

impl ScheduleState {
    /// Counted passing evaluations so far.
    #[must_use]
    pub const fn repeats(&self) -> u32 {
        self.repeats
    }

    /// Whether an evaluation at `at` falls on or after the next period boundary.
    #[must_use]
    pub fn is_due(&self, repeat: Repeat, at: DateTime<Utc>) -> bool {
        self.last_counted.is_none_or(|last| at - last >= repeat.period)
    }

    /// Counts a passing evaluation; returns `true` once the schedule is done.
    pub fn count(&mut self, repeat: Repeat, at: DateTime<Utc>) -> bool {
        self.repeats = self.repeats.saturating_add(1);
        self.last_counted = Some(at);
        self.repeats >= repeat.times
    }
}
