//! Punishment history collaborator.
//!
//! The persistence layer lives in the host; the engine only needs the
//! lookups in [`PunishmentHistory`]. [`MemoryHistory`] is the in-process
//! implementation used by the CLI and tests.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::detection::DetectionId;
use crate::error::HistoryError;
use crate::event::SubjectId;
use crate::punishment::PunishmentType;

/// Schema version of records written by this crate.
pub const HISTORY_VERSION: u32 = 1;

/// Identifier of a stored punishment record.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub Uuid);

impl RecordId {
    /// Creates a random id.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One issued punishment. Read-only once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PunishmentRecord {
    /// Record id
    pub id: RecordId,
    /// Schema version
    #[serde(default = "default_version")]
    pub version: u32,
    /// Detection that issued the punishment
    pub detection: DetectionId,
    /// Punished subject
    pub subject: SubjectId,
    /// Issue time
    pub issued_at: DateTime<Utc>,
    /// What was issued
    pub punishment: PunishmentType,
}

const fn default_version() -> u32 {
    HISTORY_VERSION
}

impl PunishmentRecord {
    /// Creates a record with a fresh id.
    #[must_use]
    pub fn new(
        detection: DetectionId,
        subject: SubjectId,
        issued_at: DateTime<Utc>,
        punishment: PunishmentType,
    ) -> Self {
        Self {
            id: RecordId::random(),
            version: HISTORY_VERSION,
            detection,
            subject,
            issued_at,
            punishment,
        }
    }
}

/// Lookups the heuristics need from the persistence layer.
pub trait PunishmentHistory: Send + Sync {
    /// Ids of the subject's records for one detection, newest first.
    ///
    /// # Errors
    ///
    /// Returns a [`HistoryError`] if the store cannot be queried.
    fn punishment_ids(
        &self,
        version: u32,
        subject: SubjectId,
        detection: &DetectionId,
    ) -> Result<Vec<RecordId>, HistoryError>;

    /// The record with `id`, if it exists.
    ///
    /// # Errors
    ///
    /// Returns a [`HistoryError`] if the store cannot be queried.
    fn punishment(&self, id: RecordId) -> Result<Option<PunishmentRecord>, HistoryError>;

    /// Number of punishments the record's subject had received for the
    /// record's detection up to and including this record.
    ///
    /// # Errors
    ///
    /// Returns a [`HistoryError`] if the store cannot be queried.
    fn punishment_count(&self, id: RecordId) -> Result<u32, HistoryError>;

    /// Appends a record.
    ///
    /// # Errors
    ///
    /// Returns a [`HistoryError`] if the store rejects the write.
    fn record(&self, record: PunishmentRecord) -> Result<RecordId, HistoryError>;
}

/// In-memory [`PunishmentHistory`].
#[derive(Debug, Default)]
pub struct MemoryHistory {
    records: Mutex<Vec<PunishmentRecord>>,
}

impl MemoryHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a history pre-populated with `records`, oldest first.
    #[must_use]
    pub fn from_records(mut records: Vec<PunishmentRecord>) -> Self {
        records.sort_by_key(|record| record.issued_at);
        Self {
            records: Mutex::new(records),
        }
    }

    /// Snapshot of every record, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn records(&self) -> Vec<PunishmentRecord> {
        self.records.lock().expect("history lock poisoned").clone()
    }

    /// Number of stored records.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().expect("history lock poisoned").len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PunishmentHistory for MemoryHistory {
    fn punishment_ids(
        &self,
        version: u32,
        subject: SubjectId,
        detection: &DetectionId,
    ) -> Result<Vec<RecordId>, HistoryError> {
        let records = self
            .records
            .lock()
            .map_err(|e| HistoryError::Unavailable(e.to_string()))?;
        Ok(records
            .iter()
            .rev()
            .filter(|r| r.version == version && r.subject == subject && &r.detection == detection)
            .map(|r| r.id)
            .collect())
    }

    fn punishment(&self, id: RecordId) -> Result<Option<PunishmentRecord>, HistoryError> {
        let records = self
            .records
            .lock()
            .map_err(|e| HistoryError::Unavailable(e.to_string()))?;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    fn punishment_count(&self, id: RecordId) -> Result<u32, HistoryError> {
        let records = self
            .records
            .lock()
            .map_err(|e| HistoryError::Unavailable(e.to_string()))?;
        let Some(position) = records.iter().position(|r| r.id == id) else {
            return Ok(0);
        };
        let target = &records[position];
        let count = records[..=position]
            .iter()
            .filter(|r| r.subject == target.subject && r.detection == target.detection)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    fn record(&self, record: PunishmentRecord) -> Result<RecordId, HistoryError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| HistoryError::Unavailable(e.to_string()))?;
        let id = record.id;
        records.push(record);
        Ok(id)
    }
}
