//! Game time helpers.
//!
//! Sequence windows are declared in server ticks and evaluated against
//! wall-clock timestamps carried by each domain event. A [`TickRate`]
//! converts between the two; a [`Clock`] supplies "now" to the timer task
//! that sweeps expired sequences.

use std::sync::Mutex;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Milliseconds per tick on a server running at 20 ticks per second.
pub const DEFAULT_TICK_MILLIS: u32 = 50;

/// Length of one server tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TickRate(u32);

impl TickRate {
    /// Creates a tick rate of `millis` milliseconds per tick (minimum 1).
    #[must_use]
    pub const fn from_millis(millis: u32) -> Self {
        if millis == 0 { Self(1) } else { Self(millis) }
    }

    /// Milliseconds per tick.
    #[must_use]
    pub const fn millis(self) -> u32 {
        self.0
    }

    /// Duration of `n` ticks.
    #[must_use]
    pub fn ticks(self, n: u32) -> TimeDelta {
        TimeDelta::milliseconds(i64::from(n) * i64::from(self.0))
    }

    /// Number of whole ticks in `delta` (negative deltas count as zero).
    #[must_use]
    pub fn to_ticks(self, delta: TimeDelta) -> u64 {
        u64::try_from(delta.num_milliseconds()).map_or(0, |ms| ms / u64::from(self.0))
    }
}

impl Default for TickRate {
    fn default() -> Self {
        Self(DEFAULT_TICK_MILLIS)
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Used when replaying recorded events, where "now" is the timestamp of
/// the event being replayed.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub const fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock to `at`. Moving backwards is ignored.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn set(&self, at: DateTime<Utc>) {
        let mut now = self.now.lock().expect("manual clock lock poisoned");
        if at > *now {
            *now = at;
        }
    }

    /// Advances the clock by `delta`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().expect("manual clock lock poisoned");
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("manual clock lock poisoned")
    }
}
