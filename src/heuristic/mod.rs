//! Heuristic severity analysis
//!
//! - [`SeverityTransform`]: the escalation curve, as data
//! - [`PunishmentHistory`]: lookups into prior punishments
//! - [`HistoryHeuristic`]: derives a transform from the newest recent record

pub mod analysis;
pub mod history;
pub mod report;
pub mod severity;

pub use analysis::HistoryHeuristic;
pub use history::{HISTORY_VERSION, MemoryHistory, PunishmentHistory, PunishmentRecord, RecordId};
pub use report::HeuristicReport;
pub use severity::{MIN_DIVIDER, SeverityTransform};
