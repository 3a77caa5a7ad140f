//! Punishment types.

use serde::{Deserialize, Serialize};

/// Closed set of responses to an offense.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PunishmentType {
    /// No-op placeholder level
    Empty,
    /// Private warning to the subject
    Warn,
    /// Notice to the staff channel
    Flag,
    /// Detailed report to the staff channel
    Report,
    /// Disconnect the subject
    Kick,
    /// Ban for a configured number of hours
    #[serde(rename = "tempban")]
    TempBan,
    /// Permanent ban
    Ban,
    /// Host command built from a template
    Custom,
}

impl PunishmentType {
    /// All punishment types in escalation order.
    pub const ALL: [Self; 8] = [
        Self::Empty,
        Self::Warn,
        Self::Flag,
        Self::Report,
        Self::Kick,
        Self::TempBan,
        Self::Ban,
        Self::Custom,
    ];

    /// Stable lowercase name, matching the configuration spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Warn => "warn",
            Self::Flag => "flag",
            Self::Report => "report",
            Self::Kick => "kick",
            Self::TempBan => "tempban",
            Self::Ban => "ban",
            Self::Custom => "custom",
        }
    }

    /// Built-in message template.
    #[must_use]
    pub const fn default_template(self) -> &'static str {
        match self {
            Self::Empty => "",
            Self::Warn => "You were caught by {detection} ({percentage}% certainty)",
            Self::Flag => "[{channel}] {subject} flagged by {detection} ({percentage}%)",
            Self::Report => "[{channel}] {subject} failed {detection} at {time}: {report}",
            Self::Kick => "Kicked by {detection} ({percentage}%)",
            Self::TempBan => "Temporarily banned by {detection} ({percentage}%)",
            Self::Ban => "Banned by {detection} ({percentage}%)",
            Self::Custom => "vigil-punish {subject} {detection} {percentage}",
        }
    }
}

impl std::fmt::Display for PunishmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
