//! Metrics collection for `vigil`.
//!
//! Provides Prometheus-compatible metrics with label cardinality protection
//! and typed convenience functions for recording measurements.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::VigilError;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Maximum length for labels derived from configuration (detection ids,
/// check names).
const MAX_LABEL_LEN: usize = 64;

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without
/// an HTTP endpoint.
///
/// # Errors
///
/// Returns `VigilError::Io` if the recorder or HTTP listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), VigilError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| VigilError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!(
        "vigil_sequences_started_total",
        "Live sequences instantiated from a blueprint"
    );
    describe_counter!(
        "vigil_sequences_completed_total",
        "Sequences that passed every action and post-condition"
    );
    describe_counter!(
        "vigil_sequences_failed_total",
        "Sequences discarded by a failing condition"
    );
    describe_counter!(
        "vigil_sequences_expired_total",
        "Sequences discarded because their window elapsed"
    );
    describe_counter!(
        "vigil_punishments_total",
        "Punishments issued by type"
    );
    describe_gauge!("vigil_live_sequences", "Currently live sequences");
}

/// Records a sequence instantiation.
pub fn record_sequence_started(detection: &str) {
    counter!("vigil_sequences_started_total", "detection" => sanitize_label(detection))
        .increment(1);
}

/// Records a completed sequence.
pub fn record_sequence_completed(detection: &str) {
    counter!("vigil_sequences_completed_total", "detection" => sanitize_label(detection))
        .increment(1);
}

/// Records a sequence discarded by a condition.
pub fn record_sequence_failed(detection: &str, reason: &'static str) {
    counter!(
        "vigil_sequences_failed_total",
        "detection" => sanitize_label(detection),
        "reason" => reason,
    )
    .increment(1);
}

/// Records a sequence discarded by timeout.
pub fn record_sequence_expired(detection: &str) {
    counter!("vigil_sequences_expired_total", "detection" => sanitize_label(detection))
        .increment(1);
}

/// Records an issued punishment.
pub fn record_punishment(punishment: &'static str) {
    counter!("vigil_punishments_total", "type" => punishment).increment(1);
}

/// Sets the live sequence gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_live_sequences(count: usize) {
    gauge!("vigil_live_sequences").set(count as f64);
}

/// Sanitizes a configuration-derived name for use as a metrics label.
///
/// Truncates to [`MAX_LABEL_LEN`] characters and replaces any characters
/// invalid in Prometheus labels with underscores.
fn sanitize_label(name: &str) -> String {
    name.chars()
        .take(MAX_LABEL_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
