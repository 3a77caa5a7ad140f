//! `vigil validate`.

use crate::cli::args::ValidateArgs;
use crate::config::{ConfigLoader, LoadWarning};
use crate::error::{ConfigError, Severity, ValidationIssue, VigilError};

/// Validates every configuration file, stopping at the first invalid one.
///
/// # Errors
///
/// Returns an I/O error for a missing file, a [`ConfigError`] for an
/// unparsable or invalid one, and, with `--strict`, a validation error for
/// a file that only produced warnings.
pub fn run(args: &ValidateArgs) -> Result<(), VigilError> {
    let loader = ConfigLoader::with_defaults();
    for path in &args.files {
        if !path.exists() {
            return Err(VigilError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            )));
        }
        tracing::info!(file = %path.display(), "validating configuration");

        let load_result = loader.load(path)?;

        for warning in &load_result.warnings {
            tracing::warn!(
                location = warning.location.as_deref().unwrap_or("<unknown>"),
                "{}",
                warning.message
            );
        }

        if args.strict && !load_result.warnings.is_empty() {
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                errors: load_result.warnings.iter().map(as_issue).collect(),
            }
            .into());
        }

        tracing::info!(
            file = %path.display(),
            detections = load_result.config.detections.len(),
            "configuration valid"
        );
    }

    Ok(())
}

fn as_issue(warning: &LoadWarning) -> ValidationIssue {
    ValidationIssue {
        path: warning.location.clone().unwrap_or_default(),
        message: warning.message.clone(),
        severity: Severity::Warning,
    }
}
