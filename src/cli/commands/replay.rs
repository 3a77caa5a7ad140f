//! `vigil replay`: feeds recorded domain events through the configured
//! detections and streams what the engine decided as JSONL.
//!
//! Before each event, sequences whose window elapsed at the event's
//! timestamp are swept, so a replay reproduces the expiries the timer task
//! would have performed live.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio::io::AsyncRead;
use tokio_stream::StreamExt;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

use crate::cli::args::ReplayArgs;
use crate::config::ConfigLoader;
use crate::detection::DetectionManager;
use crate::error::VigilError;
use crate::event::DomainEvent;
use crate::heuristic::{MemoryHistory, PunishmentRecord};
use crate::observability::{Event, EventEmitter, init_metrics};
use crate::punishment::{Effects, RecordingEffects};

/// Longest accepted event line in bytes.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Counters reported at the end of a replay.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    /// Events routed to the engine
    pub events: u64,
    /// Lines that were blank-free but unparsable or oversized
    pub skipped: u64,
    /// Sequences that completed
    pub completed: u64,
    /// Punishments issued, failed effects included
    pub punishments: u64,
}

/// Runs the replay command.
///
/// # Errors
///
/// Returns an error if the configuration, history or event file cannot be
/// read, if the detections cannot be assembled, or if the metrics listener
/// cannot be installed.
pub async fn run(args: &ReplayArgs) -> Result<(), VigilError> {
    if let Some(port) = args.metrics_port {
        init_metrics(Some(port))?;
    }

    let loaded = ConfigLoader::with_defaults().load(&args.config)?;
    for warning in &loaded.warnings {
        warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }

    let history = match &args.history {
        Some(path) => load_history(path).await?,
        None => MemoryHistory::new(),
    };
    let effects = Arc::new(RecordingEffects::new());
    let mut manager = DetectionManager::from_config(
        &loaded.config,
        Arc::new(history),
        Arc::clone(&effects) as Arc<dyn Effects>,
    )?;

    let emitter = match &args.output {
        Some(path) => EventEmitter::from_file(path)?,
        None => EventEmitter::stdout(),
    };

    let events = tokio::fs::File::open(&args.events).await?;
    let stats = replay_events(&mut manager, &effects, events, &emitter).await?;

    info!(
        events = stats.events,
        skipped = stats.skipped,
        completed = stats.completed,
        punishments = stats.punishments,
        "replay finished"
    );
    Ok(())
}

/// Reads a JSON array of prior punishment records.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read and a JSON error if it is
/// not an array of records.
pub async fn load_history(path: &Path) -> Result<MemoryHistory, VigilError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let records: Vec<PunishmentRecord> = serde_json::from_str(&raw)?;
    debug!(records = records.len(), file = %path.display(), "punishment history loaded");
    Ok(MemoryHistory::from_records(records))
}

/// Replays newline-delimited domain events through `manager`.
///
/// Emits `SequenceCompleted` and `PunishmentIssued` for every analysed
/// sequence, `EffectPerformed` for every effect drained from `effects`, and a
/// closing `ReplayFinished`. Blank lines are ignored; malformed or oversized
/// lines are logged and skipped.
///
/// # Errors
///
/// Returns an I/O error if reading the input fails.
pub async fn replay_events<R>(
    manager: &mut DetectionManager,
    effects: &RecordingEffects,
    reader: R,
    emitter: &EventEmitter,
) -> Result<ReplayStats, VigilError>
where
    R: AsyncRead + Unpin,
{
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    let mut stats = ReplayStats::default();
    let mut line_number = 0_u64;

    while let Some(line) = lines.next().await {
        line_number += 1;
        let line = match line {
            Ok(line) => line,
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                warn!(line = line_number, limit = MAX_LINE_LENGTH, "event line too long, skipping");
                stats.skipped += 1;
                continue;
            }
            Err(LinesCodecError::Io(e)) => return Err(e.into()),
        };
        if line.trim().is_empty() {
            continue;
        }

        let event: DomainEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = line_number, error = %e, "malformed event, skipping");
                stats.skipped += 1;
                continue;
            }
        };
        stats.events += 1;

        let expired = manager.sweep(event.at);
        if expired > 0 {
            debug!(expired, at = %event.at, "expired sequences swept");
        }

        for summary in manager.on_domain_event(&event) {
            stats.completed += 1;
            emitter.emit(Event::sequence_completed(&summary));
            for outcome in summary.outcomes() {
                stats.punishments += 1;
                emitter.emit(Event::punishment_issued(&summary, outcome));
            }
        }

        for effect in effects.take() {
            emitter.emit(Event::EffectPerformed {
                timestamp: event.at,
                effect,
            });
        }
    }

    emitter.emit(Event::ReplayFinished {
        timestamp: Utc::now(),
        events: stats.events,
        skipped: stats.skipped,
        completed: stats.completed,
        punishments: stats.punishments,
    });
    emitter.flush();
    Ok(stats)
}
