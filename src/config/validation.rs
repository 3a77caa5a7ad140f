//! Configuration validation.
//!
//! Validation runs on the deserialized [`EngineConfig`] and collects ALL
//! issues (it doesn't stop at the first) so a single run reports
//! everything wrong with a file.

use crate::checks::BUILTIN_STAGE_KEYS;
use crate::config::loader::ConfigLimits;
use crate::config::schema::{DetectionConfig, EngineConfig};
use crate::error::{Severity, ValidationIssue};
use crate::punishment::template;

// ============================================================================
// Public API
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns every issue found.
    pub fn validate(&mut self, config: &EngineConfig, limits: &ConfigLimits) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        if config.tick_millis == 0 {
            self.add_error("tick-millis", "tick length must be positive");
        }

        if config.detections.is_empty() {
            self.add_warning("detections", "no detections configured");
        }

        if config.detections.len() > limits.max_detections {
            self.add_error(
                "detections",
                format!(
                    "{} detections configured (limit: {})",
                    config.detections.len(),
                    limits.max_detections
                ),
            );
        }

        for (id, detection) in &config.detections {
            self.validate_detection(id, detection, limits);
        }

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Detection Validation
    // ========================================================================

    fn validate_detection(&mut self, id: &str, detection: &DetectionConfig, limits: &ConfigLimits) {
        let base = format!("detections.{id}");

        if id.trim().is_empty() {
            self.add_error(&base, "detection id cannot be empty");
        }
        if detection.name.trim().is_empty() {
            self.add_error(format!("{base}.name"), "detection name cannot be empty");
        }

        let (min, max) = (
            detection.heuristic_range_minimum,
            detection.heuristic_range_maximum,
        );
        if !min.is_finite() || !max.is_finite() {
            self.add_error(&base, "heuristic range bounds must be finite");
        } else if min > max {
            self.add_error(
                format!("{base}.heuristic-range-minimum"),
                format!("range minimum {min} exceeds maximum {max}"),
            );
        }

        match &detection.heuristic_modifier {
            Some(modifier) => {
                let path = format!("{base}.heuristic-modifier");
                if !is_positive(modifier.divider_base) {
                    self.add_error(format!("{path}.divider-base"), "divider base must be positive");
                }
                if !is_positive(modifier.power) {
                    self.add_error(format!("{path}.power"), "power must be positive");
                }
                if modifier.relevant_punishment_inhours == 0 {
                    self.add_warning(
                        format!("{path}.relevant-punishment-inhours"),
                        "a zero-hour window never matches prior punishments",
                    );
                }
            }
            None => self.add_warning(
                &base,
                "no heuristic-modifier; punishment history is ignored",
            ),
        }

        self.validate_levels(&base, detection, limits);
        self.validate_templates(&base, detection);

        let checks = &detection.checks;
        if !is_positive(checks.walk_speed) {
            self.add_error(format!("{base}.checks.walk-speed"), "walk speed must be positive");
        }
        if !is_positive(checks.max_reach) {
            self.add_error(format!("{base}.checks.max-reach"), "max reach must be positive");
        }
        if checks.delay_ticks == 0 {
            self.add_error(format!("{base}.checks.delay-ticks"), "delay must be at least one tick");
        }

        for (material, factor) in &detection.material_modifiers {
            if !is_positive(*factor) {
                self.add_error(
                    format!("{base}.material-modifiers.{material}"),
                    "speed modifiers must be positive",
                );
            }
        }
        for (world, factor) in &detection.world_modifiers {
            if !is_positive(*factor) {
                self.add_error(
                    format!("{base}.world-modifiers.{world}"),
                    "speed modifiers must be positive",
                );
            }
        }

        if let Some(stages) = &detection.stages {
            for key in stages.include.iter().chain(&stages.exclude) {
                if !BUILTIN_STAGE_KEYS.contains(&key.as_str()) {
                    self.add_warning(
                        format!("{base}.stages"),
                        format!("unknown stage '{key}'"),
                    );
                }
            }
        }
    }

    fn validate_levels(&mut self, base: &str, detection: &DetectionConfig, limits: &ConfigLimits) {
        let path = format!("{base}.punishment-levels");
        let levels = &detection.punishment_levels;

        if levels.is_empty() {
            self.add_warning(&path, "no punishment levels; offenses are never punished");
        }
        if levels.len() > limits.max_punishment_levels {
            self.add_error(
                &path,
                format!(
                    "{} levels configured (limit: {})",
                    levels.len(),
                    limits.max_punishment_levels
                ),
            );
        }

        let mut previous: Option<f64> = None;
        for (index, level) in levels.iter().enumerate() {
            if !level.threshold.is_finite() || level.threshold < 0.0 {
                self.add_error(
                    format!("{path}[{index}].threshold"),
                    "threshold must be a non-negative number",
                );
            }
            if previous.is_some_and(|prev| level.threshold < prev) {
                self.add_error(
                    format!("{path}[{index}].threshold"),
                    "thresholds must be in ascending order",
                );
            }
            previous = Some(level.threshold);
        }
    }

    fn validate_templates(&mut self, base: &str, detection: &DetectionConfig) {
        for (punishment, text) in &detection.punishment_templates {
            for unknown in template::unknown_placeholders(text) {
                self.add_warning(
                    format!("{base}.punishment-templates.{punishment}"),
                    format!("unknown placeholder '{{{unknown}}}'"),
                );
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn add_error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
            severity: Severity::Warning,
        });
    }
}

/// `true` for strictly positive numbers; `NaN` is not positive.
fn is_positive(value: f64) -> bool {
    value > 0.0
}
