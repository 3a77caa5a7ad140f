//! Host-side punishment effects.
//!
//! The engine never executes a punishment itself; it asks the host through
//! [`Effects`]. A failing effect is logged by the caller and never retried.

use std::sync::Mutex;

use chrono::TimeDelta;
use serde::Serialize;

use crate::error::EffectError;
use crate::event::{SubjectId, Vec3};

/// Operations the host performs on behalf of the engine.
pub trait Effects: Send + Sync {
    /// Sends a private message to the subject.
    ///
    /// # Errors
    ///
    /// Returns an [`EffectError`] when the host cannot deliver the message.
    fn notify(&self, subject: SubjectId, message: &str) -> Result<(), EffectError>;

    /// Posts a message to a staff channel.
    ///
    /// # Errors
    ///
    /// Returns an [`EffectError`] when the channel is unavailable.
    fn broadcast(&self, channel: &str, message: &str) -> Result<(), EffectError>;

    /// Moves the subject to `to`.
    ///
    /// # Errors
    ///
    /// Returns an [`EffectError`] when the subject cannot be moved.
    fn teleport(&self, subject: SubjectId, to: Vec3) -> Result<(), EffectError>;

    /// Disconnects the subject.
    ///
    /// # Errors
    ///
    /// Returns an [`EffectError`] when the subject cannot be kicked.
    fn kick(&self, subject: SubjectId, reason: &str) -> Result<(), EffectError>;

    /// Bans the subject, permanently when `duration` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an [`EffectError`] when the ban is rejected.
    fn ban(
        &self,
        subject: SubjectId,
        reason: &str,
        duration: Option<TimeDelta>,
    ) -> Result<(), EffectError>;

    /// Runs a host command rendered from a custom template.
    ///
    /// # Errors
    ///
    /// Returns an [`EffectError`] when the command fails.
    fn dispatch(&self, command: &str) -> Result<(), EffectError>;
}

/// One effect invocation, as recorded by [`RecordingEffects`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum EffectCall {
    /// [`Effects::notify`]
    Notify {
        /// Target
        subject: SubjectId,
        /// Message
        message: String,
    },
    /// [`Effects::broadcast`]
    Broadcast {
        /// Channel
        channel: String,
        /// Message
        message: String,
    },
    /// [`Effects::teleport`]
    Teleport {
        /// Target
        subject: SubjectId,
        /// Destination
        to: Vec3,
    },
    /// [`Effects::kick`]
    Kick {
        /// Target
        subject: SubjectId,
        /// Reason shown to the subject
        reason: String,
    },
    /// [`Effects::ban`]
    Ban {
        /// Target
        subject: SubjectId,
        /// Reason shown to the subject
        reason: String,
        /// Ban length in hours; `None` is permanent
        hours: Option<i64>,
    },
    /// [`Effects::dispatch`]
    Dispatch {
        /// Rendered command
        command: String,
    },
}

/// [`Effects`] implementation that records every call.
///
/// Used by the replay command and in tests. Subjects listed as offline make
/// subject-directed effects fail with [`EffectError::Offline`].
#[derive(Debug, Default)]
pub struct RecordingEffects {
    calls: Mutex<Vec<EffectCall>>,
    offline: Mutex<Vec<SubjectId>>,
}

impl RecordingEffects {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a subject as offline.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn set_offline(&self, subject: SubjectId) {
        self.offline
            .lock()
            .expect("offline lock poisoned")
            .push(subject);
    }

    /// Returns every recorded call so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn calls(&self) -> Vec<EffectCall> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    /// Removes and returns every recorded call.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn take(&self) -> Vec<EffectCall> {
        std::mem::take(&mut *self.calls.lock().expect("calls lock poisoned"))
    }

    fn reachable(&self, subject: SubjectId) -> Result<(), EffectError> {
        if self
            .offline
            .lock()
            .expect("offline lock poisoned")
            .contains(&subject)
        {
            return Err(EffectError::Offline(subject.to_string()));
        }
        Ok(())
    }

    fn push(&self, call: EffectCall) {
        self.calls.lock().expect("calls lock poisoned").push(call);
    }
}

impl Effects for RecordingEffects {
    fn notify(&self, subject: SubjectId, message: &str) -> Result<(), EffectError> {
        self.reachable(subject)?;
        self.push(EffectCall::Notify {
            subject,
            message: message.to_string(),
        });
        Ok(())
    }

    fn broadcast(&self, channel: &str, message: &str) -> Result<(), EffectError> {
        self.push(EffectCall::Broadcast {
            channel: channel.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }

    fn teleport(&self, subject: SubjectId, to: Vec3) -> Result<(), EffectError> {
        self.reachable(subject)?;
        self.push(EffectCall::Teleport { subject, to });
        Ok(())
    }

    fn kick(&self, subject: SubjectId, reason: &str) -> Result<(), EffectError> {
        self.reachable(subject)?;
        self.push(EffectCall::Kick {
            subject,
            reason: reason.to_string(),
        });
        Ok(())
    }

    fn ban(
        &self,
        subject: SubjectId,
        reason: &str,
        duration: Option<TimeDelta>,
    ) -> Result<(), EffectError> {
        self.push(EffectCall::Ban {
            subject,
            reason: reason.to_string(),
            hours: duration.map(|d| d.num_hours()),
        });
        Ok(())
    }

    fn dispatch(&self, command: &str) -> Result<(), EffectError> {
        self.push(EffectCall::Dispatch {
            command: command.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_calls_in_order() {
        let effects = RecordingEffects::new();
        let subject = SubjectId::random();
        effects.notify(subject, "hello").unwrap();
        effects.kick(subject, "bye").unwrap();
        let calls = effects.take();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0], EffectCall::Notify { .. }));
        assert!(matches!(calls[1], EffectCall::Kick { .. }));
        assert!(effects.calls().is_empty());
    }

    #[test]
    fn test_offline_subject_fails() {
        let effects = RecordingEffects::new();
        let subject = SubjectId::random();
        effects.set_offline(subject);
        assert_eq!(
            effects.notify(subject, "hello"),
            Err(EffectError::Offline(subject.to_string()))
        );
        assert!(effects.calls().is_empty());
    }

    #[test]
    fn test_ban_hours_serialized() {
        let effects = RecordingEffects::new();
        effects
            .ban(SubjectId::random(), "x", Some(TimeDelta::hours(24)))
            .unwrap();
        let json = serde_json::to_value(&effects.calls()[0]).unwrap();
        assert_eq!(json["effect"], "ban");
        assert_eq!(json["hours"], 24);
    }
}
