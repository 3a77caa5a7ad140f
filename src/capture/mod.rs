//! Capture store
//!
//! Derived measurements computed while a sequence runs (speed modifiers,
//! positional deltas, counters) live in a per-sequence
//! [`CaptureContainer`] addressed by typed [`CaptureKey`]s.
//!
//! - [`CaptureKey`]: named key with a declared kind and default
//! - [`CaptureContainer`]: one value per key, scoped to a live sequence
//! - [`CaptureRegistry`]: the key declarations known to an engine instance

pub mod container;
pub mod key;
pub mod registry;

pub use container::CaptureContainer;
pub use key::{CaptureKey, CaptureValue, Capturable, DeclaredKey};
pub use registry::CaptureRegistry;
