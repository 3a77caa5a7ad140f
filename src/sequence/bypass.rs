//! Reference-counted observer suppression.
//!
//! A subject is suppressed for an event kind while at least one ticket for
//! that `(subject, kind)` pair is outstanding. Suppression only affects
//! routing of *future* events; live sequences keep their state.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::event::{EventKind, SubjectId};

/// Handle returned by [`BypassRegistry::avoid`].
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(Uuid);

impl TicketId {
    fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for TicketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Outstanding suppressions keyed by subject and event kind.
#[derive(Debug, Default)]
pub struct BypassRegistry {
    avoided: DashMap<(SubjectId, EventKind), HashSet<TicketId>>,
}

impl BypassRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppresses routing of `kind` events for `subject` until the returned
    /// ticket is released.
    pub fn avoid(&self, subject: SubjectId, kind: EventKind) -> TicketId {
        let ticket = TicketId::fresh();
        self.avoided
            .entry((subject, kind))
            .or_default()
            .insert(ticket);
        debug!(%subject, kind = %kind, %ticket, "observer avoided");
        ticket
    }

    /// Releases one ticket. Returns `false` if it was not outstanding.
    pub fn unavoid(&self, subject: SubjectId, kind: EventKind, ticket: TicketId) -> bool {
        let key = (subject, kind);
        let removed = self
            .avoided
            .get_mut(&key)
            .is_some_and(|mut tickets| tickets.remove(&ticket));
        self.avoided.remove_if(&key, |_, tickets| tickets.is_empty());
        if removed {
            debug!(%subject, kind = %kind, %ticket, "observer restored");
        }
        removed
    }

    /// Whether `kind` events for `subject` are currently suppressed.
    #[must_use]
    pub fn is_suppressed(&self, subject: SubjectId, kind: EventKind) -> bool {
        self.avoided
            .get(&(subject, kind))
            .is_some_and(|tickets| !tickets.is_empty())
    }

    /// Number of outstanding tickets for the pair.
    #[must_use]
    pub fn outstanding(&self, subject: SubjectId, kind: EventKind) -> usize {
        self.avoided
            .get(&(subject, kind))
            .map_or(0, |tickets| tickets.len())
    }

    /// Drops every suppression held for `subject`.
    pub fn forget(&self, subject: SubjectId) {
        self.avoided.retain(|(held, _), _| *held != subject);
    }
}

/// Scoped bypass covering one or more event kinds for one subject.
///
/// Releasing happens on [`BypassTicket::close`] or when the ticket is
/// dropped, whichever comes first.
pub struct BypassTicket {
    subject: SubjectId,
    held: Vec<(EventKind, TicketId)>,
    registry: Arc<BypassRegistry>,
}

impl BypassTicket {
    /// Acquires one suppression per kind.
    #[must_use]
    pub fn acquire(
        registry: Arc<BypassRegistry>,
        subject: SubjectId,
        kinds: impl IntoIterator<Item = EventKind>,
    ) -> Self {
        let mut held: Vec<(EventKind, TicketId)> = Vec::new();
        for kind in kinds {
            if held.iter().any(|(k, _)| *k == kind) {
                continue;
            }
            held.push((kind, registry.avoid(subject, kind)));
        }
        Self {
            subject,
            held,
            registry,
        }
    }

    /// Subject this ticket suppresses.
    #[must_use]
    pub const fn subject(&self) -> SubjectId {
        self.subject
    }

    /// Event kinds covered by the ticket.
    pub fn kinds(&self) -> impl Iterator<Item = EventKind> + '_ {
        self.held.iter().map(|(kind, _)| *kind)
    }

    /// Releases the ticket.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        for (kind, ticket) in self.held.drain(..) {
            self.registry.unavoid(self.subject, kind, ticket);
        }
    }
}

impl Drop for BypassTicket {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for BypassTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BypassTicket")
            .field("subject", &self.subject)
            .field("held", &self.held)
            .finish_non_exhaustive()
    }
}
