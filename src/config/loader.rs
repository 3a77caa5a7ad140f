//! Configuration loader.
//!
//! Loading pipeline:
//! 1. Size check against [`ConfigLimits`]
//! 2. Environment variable expansion on the raw text
//! 3. YAML parsing into [`EngineConfig`]
//! 4. Validation (all issues collected)
//! 5. Freeze with `Arc`

use std::path::Path;
use std::sync::Arc;

use crate::config::schema::EngineConfig;
use crate::config::validation::Validator;
use crate::error::ConfigError;

// ============================================================================
// Public API
// ============================================================================

/// Options for the configuration loader.
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// Limits for configuration size.
    pub config_limits: ConfigLimits,
}

/// Limits for configuration size to prevent resource exhaustion.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum configuration file size in bytes.
    pub max_config_size: usize,

    /// Maximum number of configured detections.
    pub max_detections: usize,

    /// Maximum number of punishment levels per detection.
    pub max_punishment_levels: usize,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_config_size: env_or("VIGIL_MAX_CONFIG_SIZE", 1024 * 1024),
            max_detections: env_or("VIGIL_MAX_DETECTIONS", 256),
            max_punishment_levels: env_or("VIGIL_MAX_PUNISHMENT_LEVELS", 32),
        }
    }
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: Arc<EngineConfig>,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

impl std::fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} ({location})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    /// Creates a new configuration loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Creates a new configuration loader with default options.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LoaderOptions::default())
    }

    /// Loads a configuration file and returns the frozen configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read or exceeds the size limit
    /// - A required environment variable is unset
    /// - YAML parsing fails
    /// - Validation fails
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let limit = self.options.config_limits.max_config_size;
        let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if size > limit {
            return Err(ConfigError::TooLarge { size, limit });
        }

        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        self.load_str(&raw, path)
    }

    /// Loads configuration from already-read text; `origin` is used in
    /// error messages.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`], minus file access.
    pub fn load_str(&self, raw: &str, origin: &Path) -> Result<LoadResult, ConfigError> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        let mut warnings = Vec::new();

        let substituted = substitute_env(raw, origin, &mut warnings)?;

        if substituted.trim().is_empty() {
            return Err(ConfigError::ParseError {
                path: origin.to_path_buf(),
                line: None,
                message: "configuration file is empty".to_string(),
            });
        }

        let config: EngineConfig =
            serde_yaml::from_str(&substituted).map_err(|e| ConfigError::ParseError {
                path: origin.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        let report = Validator::new().validate(&config, &self.options.config_limits);
        if report.has_errors() {
            return Err(ConfigError::ValidationError {
                path: origin.display().to_string(),
                errors: report.errors,
            });
        }

        warnings.extend(report.warnings.into_iter().map(|issue| LoadWarning {
            message: issue.message,
            location: Some(issue.path),
        }));

        Ok(LoadResult {
            config: Arc::new(config),
            warnings,
        })
    }
}

// ============================================================================
// Environment Variable Substitution
// ============================================================================

/// Expands environment variables in raw YAML text.
///
/// Supports:
/// - `${VAR}`: value, or empty with a warning when unset
/// - `${VAR:-default}`: default when unset
/// - `${VAR:?message}`: error when unset
/// - `$$`: literal `$`
fn substitute_env(
    raw: &str,
    origin: &Path,
    warnings: &mut Vec<LoadWarning>,
) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(at) = rest.find('$') {
        out.push_str(&rest[..at]);
        let tail = &rest[at + 1..];
        if let Some(after) = tail.strip_prefix('$') {
            out.push('$');
            rest = after;
            continue;
        }
        let Some(body) = tail.strip_prefix('{') else {
            out.push('$');
            rest = tail;
            continue;
        };
        let Some(close) = body.find('}') else {
            return Err(ConfigError::ParseError {
                path: origin.to_path_buf(),
                line: None,
                message: "unterminated ${...} expression".to_string(),
            });
        };

        let spec = &body[..close];
        rest = &body[close + 1..];
        out.push_str(&expand(spec, origin, warnings)?);
    }
    out.push_str(rest);
    Ok(out)
}

fn expand(
    spec: &str,
    origin: &Path,
    warnings: &mut Vec<LoadWarning>,
) -> Result<String, ConfigError> {
    let (name, fallback) = spec
        .split_once(':')
        .map_or((spec, None), |(name, fallback)| (name, Some(fallback)));

    if let Ok(value) = std::env::var(name) {
        return Ok(value);
    }

    match fallback {
        Some(fallback) if fallback.starts_with('-') => Ok(fallback[1..].to_string()),
        Some(fallback) if fallback.starts_with('?') => Err(ConfigError::EnvVarNotSet {
            var: name.to_string(),
            message: fallback[1..].to_string(),
        }),
        _ => {
            warnings.push(LoadWarning {
                message: format!("environment variable '{name}' is not set, using empty string"),
                location: Some(origin.display().to_string()),
            });
            Ok(String::new())
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
