//! Capture key declarations owned by a detection manager.

use indexmap::IndexMap;
use tracing::trace;

use crate::error::CaptureError;

use super::key::DeclaredKey;

/// Set of capture keys known to one engine instance.
///
/// Names are unique: redeclaring a name with the same kind is a no-op,
/// redeclaring it with a different kind is rejected.
#[derive(Debug, Default)]
pub struct CaptureRegistry {
    keys: IndexMap<&'static str, DeclaredKey>,
}

impl CaptureRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a key.
    ///
    /// # Errors
    ///
    /// Returns `CaptureError::Conflict` if the name is already declared
    /// with a different kind.
    pub fn declare(&mut self, key: &DeclaredKey) -> Result<(), CaptureError> {
        if let Some(existing) = self.keys.get(key.name) {
            if existing.kind_name() != key.kind_name() {
                return Err(CaptureError::Conflict {
                    name: key.name.to_string(),
                    existing: existing.kind_name(),
                    requested: key.kind_name(),
                });
            }
            return Ok(());
        }
        trace!(name = key.name, kind = key.kind_name(), "capture key declared");
        self.keys.insert(key.name, key.clone());
        Ok(())
    }

    /// Declares every key, stopping at the first conflict.
    ///
    /// # Errors
    ///
    /// Returns the first `CaptureError::Conflict` encountered.
    pub fn declare_all<'a>(
        &mut self,
        keys: impl IntoIterator<Item = &'a DeclaredKey>,
    ) -> Result<(), CaptureError> {
        for key in keys {
            self.declare(key)?;
        }
        Ok(())
    }

    /// Looks up a declared key by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DeclaredKey> {
        self.keys.get(name)
    }

    /// Number of declared keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if no keys are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
