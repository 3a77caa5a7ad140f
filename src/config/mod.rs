//! Configuration module
//!
//! Loads and validates the engine's YAML configuration: tick length and
//! per-detection thresholds, severity curves, punishment levels and speed
//! modifiers.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLimits, ConfigLoader, LoadResult, LoadWarning, LoaderOptions};
pub use schema::*;
pub use validation::{ValidationResult, Validator};
