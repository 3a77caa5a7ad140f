//! Conditions and the process context they evaluate against.
//!
//! A condition never returns an ad-hoc value: it receives a [`Process`]
//! and must answer with one of the result constructors on it
//! ([`Process::next`], [`Process::skip`], [`Process::end`],
//! [`Process::pass`]).

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use crate::capture::CaptureContainer;
use crate::event::{DomainEvent, SubjectId};
use crate::time::TickRate;

/// Outcome of evaluating a condition or an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Advance the cursor
    Next,
    /// Hold the cursor and wait for another event
    Skip,
    /// Terminate the sequence
    End {
        /// `true` completes the sequence, `false` fails it
        passed: bool,
    },
}

/// Verdict produced through a [`Process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessResult {
    verdict: Verdict,
}

impl ProcessResult {
    pub(crate) const fn from_verdict(verdict: Verdict) -> Self {
        Self { verdict }
    }

    /// The verdict.
    #[must_use]
    pub const fn verdict(self) -> Verdict {
        self.verdict
    }

    /// `true` for [`Verdict::Next`].
    #[must_use]
    pub const fn is_next(self) -> bool {
        matches!(self.verdict, Verdict::Next)
    }

    /// `true` for [`Verdict::Skip`].
    #[must_use]
    pub const fn is_skip(self) -> bool {
        matches!(self.verdict, Verdict::Skip)
    }

    /// `true` for either [`Verdict::End`].
    #[must_use]
    pub const fn is_end(self) -> bool {
        matches!(self.verdict, Verdict::End { .. })
    }

    /// `true` for [`Verdict::End`] marked as passed.
    #[must_use]
    pub const fn is_pass(self) -> bool {
        matches!(self.verdict, Verdict::End { passed: true })
    }
}

/// A single step predicate.
pub type Condition = Arc<dyn Fn(&mut Process<'_>) -> ProcessResult + Send + Sync>;

/// Wraps a closure as a [`Condition`].
pub fn condition<F>(f: F) -> Condition
where
    F: Fn(&mut Process<'_>) -> ProcessResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Evaluation context handed to a condition.
pub struct Process<'a> {
    event: &'a DomainEvent,
    captures: &'a mut CaptureContainer,
    prior: Option<ProcessResult>,
    last_action_at: Option<DateTime<Utc>>,
    tick_rate: TickRate,
}

impl<'a> Process<'a> {
    pub(crate) const fn new(
        event: &'a DomainEvent,
        captures: &'a mut CaptureContainer,
        last_action_at: Option<DateTime<Utc>>,
        tick_rate: TickRate,
    ) -> Self {
        Self {
            event,
            captures,
            prior: None,
            last_action_at,
            tick_rate,
        }
    }

    /// Subject the sequence belongs to.
    #[must_use]
    pub const fn subject(&self) -> SubjectId {
        self.event.subject
    }

    /// The event being evaluated.
    #[must_use]
    pub const fn event(&self) -> &DomainEvent {
        self.event
    }

    /// The sequence's captures.
    #[must_use]
    pub fn captures(&self) -> &CaptureContainer {
        &*self.captures
    }

    /// Mutable access to the sequence's captures.
    pub fn captures_mut(&mut self) -> &mut CaptureContainer {
        &mut *self.captures
    }

    /// Result of the previous condition of the same action, if any.
    #[must_use]
    pub const fn prior(&self) -> Option<ProcessResult> {
        self.prior
    }

    pub(crate) const fn set_prior(&mut self, result: ProcessResult) {
        self.prior = Some(result);
    }

    /// Time of the last action that advanced the sequence.
    ///
    /// `None` while evaluating the first action of a fresh sequence.
    #[must_use]
    pub const fn last_action_at(&self) -> Option<DateTime<Utc>> {
        self.last_action_at
    }

    /// Time since the last action, if there was one.
    #[must_use]
    pub fn elapsed(&self) -> Option<TimeDelta> {
        self.last_action_at.map(|at| self.event.at - at)
    }

    /// Server tick length.
    #[must_use]
    pub const fn tick_rate(&self) -> TickRate {
        self.tick_rate
    }

    /// Advance to the next action.
    #[must_use]
    pub const fn next(&self) -> ProcessResult {
        ProcessResult::from_verdict(Verdict::Next)
    }

    /// Keep the cursor where it is and wait for another event.
    #[must_use]
    pub const fn skip(&self) -> ProcessResult {
        ProcessResult::from_verdict(Verdict::Skip)
    }

    /// Terminate the sequence as failed.
    #[must_use]
    pub const fn end(&self) -> ProcessResult {
        ProcessResult::from_verdict(Verdict::End { passed: false })
    }

    /// Terminate the sequence as passed.
    #[must_use]
    pub const fn pass(&self) -> ProcessResult {
        ProcessResult::from_verdict(Verdict::End { passed: true })
    }

    /// `next()` when `ok`, otherwise `end()`.
    #[must_use]
    pub const fn next_if(&self, ok: bool) -> ProcessResult {
        if ok { self.next() } else { self.end() }
    }
}

impl std::fmt::Debug for Process<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Process")
            .field("subject", &self.event.subject)
            .field("event", &self.event.kind())
            .field("prior", &self.prior)
            .field("last_action_at", &self.last_action_at)
            .finish_non_exhaustive()
    }
}

/// Evaluates `conditions` in order; the first non-`Next` result decides.
///
/// An empty list yields `Next`.
pub(crate) fn evaluate_all(conditions: &[Condition], process: &mut Process<'_>) -> ProcessResult {
    for condition in conditions {
        let result = condition(process);
        process.set_prior(result);
        if !result.is_next() {
            return result;
        }
    }
    process.next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventPayload;

    fn join_event() -> DomainEvent {
        DomainEvent::new(SubjectId::random(), Utc::now(), EventPayload::Join)
    }

    #[test]
    fn test_result_constructors_are_exclusive() {
        let event = join_event();
        let mut captures = CaptureContainer::new();
        let process = Process::new(&event, &mut captures, None, TickRate::default());

        let next = process.next();
        assert!(next.is_next() && !next.is_skip() && !next.is_end());
        let skip = process.skip();
        assert!(skip.is_skip() && !skip.is_next() && !skip.is_end());
        let end = process.end();
        assert!(end.is_end() && !end.is_pass());
        let pass = process.pass();
        assert!(pass.is_end() && pass.is_pass());
    }

    #[test]
    fn test_evaluate_all_empty_is_next() {
        let event = join_event();
        let mut captures = CaptureContainer::new();
        let mut process = Process::new(&event, &mut captures, None, TickRate::default());
        assert!(evaluate_all(&[], &mut process).is_next());
    }

    #[test]
    fn test_evaluate_all_stops_at_first_failure() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let calls = Arc::new(AtomicUsize::new(0));
        let c1 = Arc::clone(&calls);
        let c3 = Arc::clone(&calls);
        let conditions = vec![
            condition(move |p| {
                c1.fetch_add(1, Ordering::SeqCst);
                p.next()
            }),
            condition(|p| p.end()),
            condition(move |p| {
                c3.fetch_add(1, Ordering::SeqCst);
                p.next()
            }),
        ];

        let event = join_event();
        let mut captures = CaptureContainer::new();
        let mut process = Process::new(&event, &mut captures, None, TickRate::default());
        let result = evaluate_all(&conditions, &mut process);
        assert_eq!(result.verdict(), Verdict::End { passed: false });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_prior_is_visible_to_later_conditions() {
        let conditions = vec![
            condition(|p| p.next()),
            condition(|p| p.next_if(p.prior().is_some_and(ProcessResult::is_next))),
        ];
        let event = join_event();
        let mut captures = CaptureContainer::new();
        let mut process = Process::new(&event, &mut captures, None, TickRate::default());
        assert!(evaluate_all(&conditions, &mut process).is_next());
    }

    #[test]
    fn test_elapsed() {
        let event = join_event();
        let mut captures = CaptureContainer::new();
        let earlier = event.at - TimeDelta::seconds(3);
        let process = Process::new(&event, &mut captures, Some(earlier), TickRate::default());
        assert_eq!(process.elapsed(), Some(TimeDelta::seconds(3)));
    }
}
