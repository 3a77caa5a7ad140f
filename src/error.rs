//! Error types for `Vigil`
//!
//! Errors are split by concern: configuration loading, stage registry
//! wiring, capture key declaration, punishment history access and
//! punishment effects. The top-level [`VigilError`] aggregates them and
//! maps each onto a process exit code for the CLI.
//!
//! Evaluation failures inside a sequence are *not* errors: a failed or
//! expired sequence is simply discarded. Lookup-contract violations
//! (`expect_*` accessors) panic instead of returning an error.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `vigil` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Stage wiring error (duplicate stage, archetype bounds)
    pub const STAGE_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `vigil` operations.
#[derive(Debug, Error)]
pub enum VigilError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Stage registry or stage cycle error
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Capture key declaration error
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// Punishment history lookup error
    #[error(transparent)]
    History(#[from] HistoryError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl VigilError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Stage(_) | Self::Capture(_) => ExitCode::STAGE_ERROR,
            Self::History(_) => ExitCode::ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}")]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Configuration file exceeds the size limit
    #[error("configuration too large: {size} bytes (limit: {limit})")]
    TooLarge {
        /// Actual file size in bytes
        size: usize,
        /// Configured limit in bytes
        limit: usize,
    },

    /// A required `${VAR:?message}` environment variable is unset
    #[error("environment variable '{var}' is not set: {message}")]
    EnvVarNotSet {
        /// Variable name
        var: String,
        /// Message from the directive
        message: String,
    },

    /// A detection id was referenced that has no configuration
    #[error("no configuration for detection '{0}'")]
    UnknownDetection(String),
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., `detections.speed.heuristic-modifier.power`)
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - validation failure that prevents configuration from being used
    Error,
    /// Warning - potential issue that does not prevent configuration loading
    Warning,
}

// ============================================================================
// Stage Errors
// ============================================================================

/// Stage model registration and stage cycle construction errors.
#[derive(Debug, Error)]
pub enum StageError {
    /// A stage with the same key is already registered in the model
    #[error("stage '{key}' is already registered in the {model} model")]
    Duplicate {
        /// Model family name
        model: &'static str,
        /// Stage key
        key: String,
    },

    /// A stage was registered into a model of a different family
    #[error("cannot register {stage} stage '{key}' into the {model} model")]
    WrongFamily {
        /// Model family name
        model: &'static str,
        /// Family of the offending stage
        stage: &'static str,
        /// Stage key
        key: String,
    },

    /// An archetype accepted a number of stages outside its bounds
    #[error("archetype for the {model} model accepted {accepted} stages (allowed {min}..={max})")]
    OutOfBounds {
        /// Model family name
        model: &'static str,
        /// Number of stages accepted
        accepted: usize,
        /// Inclusive minimum
        min: usize,
        /// Inclusive maximum
        max: usize,
    },

    /// A detection with the same id is already registered
    #[error("detection '{0}' is already registered")]
    DuplicateDetection(String),
}

// ============================================================================
// Capture Errors
// ============================================================================

/// Capture key declaration errors.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// A key name was declared twice with different value kinds
    #[error("capture key '{name}' already declared as {existing}, cannot redeclare as {requested}")]
    Conflict {
        /// Key name
        name: String,
        /// Kind of the existing declaration
        existing: &'static str,
        /// Kind of the conflicting declaration
        requested: &'static str,
    },
}

// ============================================================================
// History Errors
// ============================================================================

/// Errors raised by a punishment history collaborator.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The backing store could not be reached
    #[error("punishment history unavailable: {0}")]
    Unavailable(String),

    /// A stored record could not be decoded
    #[error("corrupt punishment record {id}: {message}")]
    Corrupt {
        /// Record id
        id: String,
        /// Decoder message
        message: String,
    },
}

// ============================================================================
// Effect Errors
// ============================================================================

/// Failures reported by the host when applying a punishment effect.
///
/// These are logged and never retried or escalated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EffectError {
    /// The subject is no longer connected
    #[error("subject {0} is offline")]
    Offline(String),

    /// The host refused to apply the effect
    #[error("effect denied: {0}")]
    Denied(String),

    /// Any other host-side failure
    #[error("effect failed: {0}")]
    Failed(String),
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `vigil` operations.
pub type Result<T> = std::result::Result<T, VigilError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::SUCCESS, 0);
        assert_eq!(ExitCode::ERROR, 1);
        assert_eq!(ExitCode::CONFIG_ERROR, 2);
        assert_eq!(ExitCode::IO_ERROR, 3);
        assert_eq!(ExitCode::STAGE_ERROR, 5);
        assert_eq!(ExitCode::USAGE_ERROR, 64);
        assert_eq!(ExitCode::INTERRUPTED, 130);
    }

    #[test]
    fn test_stage_error_exit_code() {
        let err: VigilError = StageError::Duplicate {
            model: "check",
            key: "speed".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), ExitCode::STAGE_ERROR);
    }

    #[test]
    fn test_config_error_exit_code() {
        let err: VigilError = ConfigError::MissingFile {
            path: PathBuf::from("/test"),
        }
        .into();
        assert_eq!(err.exit_code(), ExitCode::CONFIG_ERROR);
    }

    #[test]
    fn test_io_error_exit_code() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: VigilError = io_err.into();
        assert_eq!(err.exit_code(), ExitCode::IO_ERROR);
    }

    #[test]
    fn test_validation_issue_display() {
        let issue = ValidationIssue {
            path: "detections.speed.heuristic-modifier.power".to_string(),
            message: "power must be positive".to_string(),
            severity: Severity::Error,
        };
        assert_eq!(
            issue.to_string(),
            "error: power must be positive at detections.speed.heuristic-modifier.power"
        );
    }

    #[test]
    fn test_out_of_bounds_display() {
        let err = StageError::OutOfBounds {
            model: "penalty",
            accepted: 0,
            min: 1,
            max: 4,
        };
        assert_eq!(
            err.to_string(),
            "archetype for the penalty model accepted 0 stages (allowed 1..=4)"
        );
    }

    #[test]
    fn test_effect_error_display() {
        let err = EffectError::Offline("steve".to_string());
        assert_eq!(err.to_string(), "subject steve is offline");
    }
}
