//! Per-sequence capture storage.

use indexmap::IndexMap;
use serde::Serialize;

use super::key::{CaptureKey, CaptureValue, Capturable, DeclaredKey};

/// Mapping from capture key to value, scoped to one live sequence.
///
/// Holds at most one value per key. Only conditions evaluated for the
/// owning sequence mutate it; it is dropped with the sequence (or moved
/// into the summary on completion).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CaptureContainer {
    values: IndexMap<&'static str, CaptureValue>,
}

impl CaptureContainer {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a container pre-populated with each key's default.
    #[must_use]
    pub fn seeded<'a>(keys: impl IntoIterator<Item = &'a DeclaredKey>) -> Self {
        let values = keys
            .into_iter()
            .map(|key| (key.name, key.default.clone()))
            .collect();
        Self { values }
    }

    /// Returns the stored value, if present and of the key's kind.
    #[must_use]
    pub fn get<T: Capturable>(&self, key: &CaptureKey<T>) -> Option<T> {
        self.values.get(key.name()).and_then(T::from_value)
    }

    /// Returns the stored value or the key's declared default.
    #[must_use]
    pub fn get_or_default<T: Capturable>(&self, key: &CaptureKey<T>) -> T {
        self.get(key).unwrap_or_else(|| key.default_value())
    }

    /// Stores `value`, replacing any previous value.
    pub fn put<T: Capturable>(&mut self, key: &CaptureKey<T>, value: T) {
        self.values.insert(key.name(), value.into_value());
    }

    /// Stores `value` only if the key is absent.
    ///
    /// Returns `true` if the value was stored.
    pub fn put_once<T: Capturable>(&mut self, key: &CaptureKey<T>, value: T) -> bool {
        if self.values.contains_key(key.name()) {
            return false;
        }
        self.values.insert(key.name(), value.into_value());
        true
    }

    /// Replaces the current value (or `default` when absent) with `f(current)`.
    ///
    /// Returns the new value.
    pub fn transform<T: Capturable>(
        &mut self,
        key: &CaptureKey<T>,
        f: impl FnOnce(T) -> T,
        default: T,
    ) -> T {
        let current = self.get(key).unwrap_or(default);
        let next = f(current);
        self.values.insert(key.name(), next.clone().into_value());
        next
    }

    /// Copies every entry of `other` into this container; `other` wins on conflict.
    pub fn merge(&mut self, other: &Self) {
        for (name, value) in &other.values {
            self.values.insert(*name, value.clone());
        }
    }

    /// Returns `true` if a value is stored for `key`.
    #[must_use]
    pub fn contains<T: Capturable>(&self, key: &CaptureKey<T>) -> bool {
        self.values.contains_key(key.name())
    }

    /// Removes and returns the value for `key`.
    pub fn remove<T: Capturable>(&mut self, key: &CaptureKey<T>) -> Option<T> {
        self.values
            .shift_remove(key.name())
            .and_then(|v| T::from_value(&v))
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &CaptureValue)> {
        self.values.iter().map(|(name, value)| (*name, value))
    }
}
