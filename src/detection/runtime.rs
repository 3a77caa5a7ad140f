//! Thread-safe entry point with timer-driven expiry.
//!
//! The host may deliver events from several threads; [`Runtime`] serializes
//! them through a single mutex around the [`DetectionManager`]. A background
//! task sweeps sequences whose windows elapsed even when no further event
//! arrives for their subject.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::event::{DomainEvent, SubjectId};
use crate::sequence::BypassTicket;
use crate::stage::Summary;
use crate::time::Clock;

use super::{DetectionId, DetectionManager};

/// Shared handle to a [`DetectionManager`] plus its expiry timer.
#[derive(Clone)]
pub struct Runtime {
    manager: Arc<Mutex<DetectionManager>>,
    clock: Arc<dyn Clock>,
    sweep_interval: Duration,
    cancel: CancellationToken,
}

impl Runtime {
    /// Wraps a manager. The sweep interval defaults to one server tick.
    #[must_use]
    pub fn new(manager: DetectionManager, clock: Arc<dyn Clock>) -> Self {
        let tick = manager.engine().tick_rate().millis();
        Self {
            manager: Arc::new(Mutex::new(manager)),
            clock,
            sweep_interval: Duration::from_millis(u64::from(tick)),
            cancel: CancellationToken::new(),
        }
    }

    /// Overrides the sweep interval.
    #[must_use]
    pub const fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Locks the manager.
    ///
    /// # Panics
    ///
    /// Panics if a previous holder of the lock panicked.
    pub fn lock(&self) -> MutexGuard<'_, DetectionManager> {
        self.manager.lock().expect("detection manager lock poisoned")
    }

    /// Routes one event. See [`DetectionManager::on_domain_event`].
    ///
    /// # Panics
    ///
    /// Panics if the manager lock is poisoned.
    pub fn on_domain_event(&self, event: &DomainEvent) -> Vec<Summary> {
        self.lock().on_domain_event(event)
    }

    /// See [`DetectionManager::request_bypass_ticket`].
    ///
    /// # Panics
    ///
    /// Panics if the manager lock is poisoned.
    #[must_use]
    pub fn request_bypass_ticket(
        &self,
        subject: SubjectId,
        detections: &[DetectionId],
    ) -> BypassTicket {
        self.lock().request_bypass_ticket(subject, detections)
    }

    /// Spawns the expiry task.
    ///
    /// The task stops when [`Self::shutdown`] is called.
    pub fn start_timer_task(&self) -> JoinHandle<()> {
        let manager = Arc::clone(&self.manager);
        let clock = Arc::clone(&self.clock);
        let cancel = self.cancel.clone();
        let period = self.sweep_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        debug!("expiry task cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        let Ok(mut manager) = manager.lock() else {
                            warn!("detection manager lock poisoned, stopping expiry task");
                            break;
                        };
                        let expired = manager.sweep(clock.now());
                        if expired > 0 {
                            trace!(expired, "expired sequences swept");
                        }
                    }
                }
            }
        })
    }

    /// Stops the expiry task.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("sweep_interval", &self.sweep_interval)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
