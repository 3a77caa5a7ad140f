//! Structured JSONL event stream.
//!
//! The replay command reports what the engine decided as one JSON object per
//! line, separate from the tracing log output.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::detection::DetectionId;
use crate::event::SubjectId;
use crate::punishment::{EffectCall, PunishmentOutcome, PunishmentType};
use crate::stage::Summary;

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted while the engine runs.
///
/// Each variant is tagged with `"type"` when serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A sequence completed and went through the stage pipeline.
    SequenceCompleted {
        /// Completion time of the sequence
        timestamp: DateTime<Utc>,
        /// Owning detection
        detection: DetectionId,
        /// Check that produced the sequence
        check: String,
        /// Subject of the sequence
        subject: SubjectId,
        /// Passed evaluations
        passed: usize,
        /// Failed evaluations
        failed: usize,
        /// Final severity, when a penalty stage computed one
        #[serde(skip_serializing_if = "Option::is_none")]
        severity: Option<f64>,
    },

    /// A punishment level was reached.
    PunishmentIssued {
        /// When the sequence completed
        timestamp: DateTime<Utc>,
        /// Issuing detection
        detection: DetectionId,
        /// Punished subject
        subject: SubjectId,
        /// What was issued
        punishment: PunishmentType,
        /// Rendered template
        message: String,
        /// Effect failure, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// The host was asked to apply an effect.
    EffectPerformed {
        /// When the triggering event happened
        timestamp: DateTime<Utc>,
        /// The effect call
        effect: EffectCall,
    },

    /// A replay ran to the end of its input.
    ReplayFinished {
        /// When the replay finished
        timestamp: DateTime<Utc>,
        /// Domain events read
        events: u64,
        /// Lines that could not be parsed
        skipped: u64,
        /// Completed sequences
        completed: u64,
        /// Punishments issued, including failed ones
        punishments: u64,
    },
}

impl Event {
    /// Event for a summary that left the stage pipeline.
    #[must_use]
    pub fn sequence_completed(summary: &Summary) -> Self {
        let result = summary.result();
        Self::SequenceCompleted {
            timestamp: result.completed_at,
            detection: summary.detection().clone(),
            check: summary.check().to_string(),
            subject: summary.subject(),
            passed: result.passed(),
            failed: result.failed(),
            severity: summary.offense().map(|o| o.severity),
        }
    }

    /// Event for one punishment of a summary.
    #[must_use]
    pub fn punishment_issued(summary: &Summary, outcome: &PunishmentOutcome) -> Self {
        Self::PunishmentIssued {
            timestamp: summary.result().completed_at,
            detection: summary.detection().clone(),
            subject: summary.subject(),
            punishment: outcome.punishment,
            message: outcome.message.clone(),
            error: outcome.error.clone(),
        }
    }
}

/// Wraps an [`Event`] with a monotonically increasing sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    sequence: u64,
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Each call to [`emit`](Self::emit) increments the sequence counter, writes
/// the event as a single JSON line and flushes. Serialization or I/O
/// failures are dropped; the event stream never interrupts detection.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Creates an emitter that discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter appending to the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or opened.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    /// Flushes the underlying writer.
    pub fn flush(&self) {
        if let Ok(mut w) = self.writer.lock() {
            let _ = w.flush();
        }
    }
}
