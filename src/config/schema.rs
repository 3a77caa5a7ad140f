//! Configuration schema types.
//!
//! These types are deserialized from the engine's YAML configuration file.
//! Every key is kebab-case.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::punishment::PunishmentType;
use crate::time::{DEFAULT_TICK_MILLIS, TickRate};

// ============================================================================
// Top-Level Configuration
// ============================================================================

/// Root configuration for an engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Length of one server tick in milliseconds
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u32,

    /// Per-detection configuration keyed by detection id
    #[serde(default)]
    pub detections: IndexMap<String, DetectionConfig>,
}

impl EngineConfig {
    /// Tick length as a [`TickRate`].
    #[must_use]
    pub const fn tick_rate(&self) -> TickRate {
        TickRate::from_millis(self.tick_millis)
    }

    /// Configuration for one detection.
    #[must_use]
    pub fn detection(&self, id: &str) -> Option<&DetectionConfig> {
        self.detections.get(id)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_millis: DEFAULT_TICK_MILLIS,
            detections: IndexMap::new(),
        }
    }
}

const fn default_tick_millis() -> u32 {
    DEFAULT_TICK_MILLIS
}

// ============================================================================
// Detection Configuration
// ============================================================================

/// Settings of one detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DetectionConfig {
    /// Human readable name used in punishment messages
    pub name: String,

    /// Permission that lets a subject bypass this detection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bypass_permission: Option<String>,

    /// Lower end of the severity range
    #[serde(default)]
    pub heuristic_range_minimum: f64,

    /// Upper end of the severity range
    #[serde(default = "default_range_maximum")]
    pub heuristic_range_maximum: f64,

    /// History-based severity escalation; absent disables the history heuristic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heuristic_modifier: Option<HeuristicModifier>,

    /// Ascending severity thresholds
    #[serde(default)]
    pub punishment_levels: Vec<PunishmentLevel>,

    /// Message templates overriding the built-in ones
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub punishment_templates: IndexMap<PunishmentType, String>,

    /// Duration of a temporary ban in hours
    #[serde(default = "default_tempban_hours")]
    pub tempban_hours: u32,

    /// Teleport the subject back to where the offending sequence started
    #[serde(default)]
    pub setback: bool,

    /// Thresholds used by the built-in checks
    #[serde(default)]
    pub checks: CheckSettings,

    /// Speed multipliers keyed by the material the subject stands on
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub material_modifiers: IndexMap<String, f64>,

    /// Speed multipliers keyed by world
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub world_modifiers: IndexMap<String, f64>,

    /// Staff channel for flags and reports
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Stage include/exclude overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stages: Option<StageOverrides>,
}

impl DetectionConfig {
    /// Creates a configuration with defaults for everything but the name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bypass_permission: None,
            heuristic_range_minimum: 0.0,
            heuristic_range_maximum: default_range_maximum(),
            heuristic_modifier: None,
            punishment_levels: Vec::new(),
            punishment_templates: IndexMap::new(),
            tempban_hours: default_tempban_hours(),
            setback: false,
            checks: CheckSettings::default(),
            material_modifiers: IndexMap::new(),
            world_modifiers: IndexMap::new(),
            channel: default_channel(),
            stages: None,
        }
    }

    /// Combined speed multiplier for a material and world.
    ///
    /// Unknown materials and worlds contribute a factor of one.
    #[must_use]
    pub fn speed_modifier(&self, material: &str, world: &str) -> f64 {
        let material = self.material_modifiers.get(material).copied().unwrap_or(1.0);
        let world = self.world_modifiers.get(world).copied().unwrap_or(1.0);
        material * world
    }
}

const fn default_range_maximum() -> f64 {
    100.0
}

const fn default_tempban_hours() -> u32 {
    24
}

fn default_channel() -> String {
    "anticheat".to_string()
}

/// Parameters of the history severity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HeuristicModifier {
    /// Base of the divider; each prior punishment lowers it by one
    pub divider_base: f64,

    /// How far back (in hours) prior punishments are considered
    pub relevant_punishment_inhours: u32,

    /// Exponent of the curve
    pub power: f64,
}

/// One row of the threshold table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PunishmentLevel {
    /// Minimum severity (percent) that triggers the punishment
    pub threshold: f64,

    /// Punishment to issue
    pub punishment: PunishmentType,
}

/// Thresholds used by the built-in checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CheckSettings {
    /// Maximum horizontal distance per movement window
    #[serde(default = "default_walk_speed")]
    pub walk_speed: f64,

    /// Movement window in ticks
    #[serde(default = "default_delay_ticks")]
    pub delay_ticks: u32,

    /// Maximum attack distance
    #[serde(default = "default_max_reach")]
    pub max_reach: f64,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            walk_speed: default_walk_speed(),
            delay_ticks: default_delay_ticks(),
            max_reach: default_max_reach(),
        }
    }
}

const fn default_walk_speed() -> f64 {
    0.32
}

const fn default_delay_ticks() -> u32 {
    40
}

const fn default_max_reach() -> f64 {
    3.1
}

/// Stage include/exclude overrides.
///
/// A non-empty `include` restricts every model to the listed stage keys;
/// `exclude` always wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StageOverrides {
    /// Stage keys to include
    #[serde(default)]
    pub include: Vec<String>,

    /// Stage keys to exclude
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r"
tick-millis: 50
detections:
  movement-speed:
    name: Movement Speed
    bypass-permission: vigil.bypass.speed
    heuristic-range-maximum: 50.0
    heuristic-modifier:
      divider-base: 100
      relevant-punishment-inhours: 24
      power: 2
    punishment-levels:
      - { threshold: 20, punishment: warn }
      - { threshold: 60, punishment: kick }
    punishment-templates:
      warn: 'stop it {subject}'
    checks:
      walk-speed: 0.5
    material-modifiers:
      ice: 2.5
    world-modifiers:
      nether: 1.2
    stages:
      exclude: [reach]
";

    #[test]
    fn test_parse_full_sample() {
        let config: EngineConfig = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(config.tick_rate().millis(), 50);
        let detection = config.detection("movement-speed").unwrap();
        assert_eq!(detection.name, "Movement Speed");
        assert_eq!(detection.bypass_permission.as_deref(), Some("vigil.bypass.speed"));
        assert!((detection.heuristic_range_minimum).abs() < f64::EPSILON);
        assert!((detection.heuristic_range_maximum - 50.0).abs() < f64::EPSILON);
        let modifier = detection.heuristic_modifier.unwrap();
        assert_eq!(modifier.relevant_punishment_inhours, 24);
        assert_eq!(detection.punishment_levels.len(), 2);
        assert_eq!(detection.punishment_levels[1].punishment, PunishmentType::Kick);
        assert_eq!(
            detection.punishment_templates.get(&PunishmentType::Warn).map(String::as_str),
            Some("stop it {subject}")
        );
        assert!((detection.checks.walk_speed - 0.5).abs() < f64::EPSILON);
        assert_eq!(detection.checks.delay_ticks, 40);
        assert_eq!(detection.channel, "anticheat");
        assert_eq!(
            detection.stages.as_ref().unwrap().exclude,
            vec!["reach".to_string()]
        );
    }

    #[test]
    fn test_defaults_for_minimal_detection() {
        let config: EngineConfig =
            serde_yaml::from_str("detections:\n  reach:\n    name: Reach\n").unwrap();
        assert_eq!(config.tick_millis, DEFAULT_TICK_MILLIS);
        let detection = config.detection("reach").unwrap();
        assert!(detection.heuristic_modifier.is_none());
        assert!(detection.punishment_levels.is_empty());
        assert_eq!(detection.tempban_hours, 24);
        assert_eq!(detection.checks, CheckSettings::default());
    }

    #[test]
    fn test_speed_modifier_multiplies() {
        let mut detection = DetectionConfig::named("Speed");
        detection.material_modifiers.insert("ice".into(), 2.0);
        detection.world_modifiers.insert("nether".into(), 1.5);
        assert!((detection.speed_modifier("ice", "nether") - 3.0).abs() < f64::EPSILON);
        assert!((detection.speed_modifier("stone", "overworld") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unknown_punishment_rejected() {
        let yaml = "detections:\n  x:\n    name: X\n    punishment-levels:\n      - { threshold: 1, punishment: explode }\n";
        assert!(serde_yaml::from_str::<EngineConfig>(yaml).is_err());
    }
}
