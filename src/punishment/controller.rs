//! Threshold-driven punishment dispatch.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::DetectionConfig;
use crate::detection::DetectionId;
use crate::error::EffectError;
use crate::event::SubjectId;
use crate::heuristic::{PunishmentHistory, PunishmentRecord, RecordId};
use crate::observability::metrics;
use crate::stage::{Offense, StageContext};

use super::effects::Effects;
use super::kind::PunishmentType;
use super::levels::PunishmentLevels;
use super::template::{self, TemplateVars};

/// Time format used for the `{time}` placeholder.
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Result of issuing one punishment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PunishmentOutcome {
    /// What was issued
    pub punishment: PunishmentType,
    /// Rendered template
    pub message: String,
    /// Effect failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// History record written for a successful punishment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<RecordId>,
}

impl PunishmentOutcome {
    /// Whether the effect went through.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Posts every punishment whose threshold an offense reaches.
///
/// Effect failures are logged and reported in the outcome; they are never
/// retried and never escalate to the next level.
pub struct PunishmentController<'a> {
    detection: &'a DetectionId,
    config: &'a DetectionConfig,
    levels: PunishmentLevels,
    history: &'a dyn PunishmentHistory,
    effects: &'a dyn Effects,
    now: DateTime<Utc>,
}

impl<'a> PunishmentController<'a> {
    /// Creates a controller for the detection a stage runs in.
    #[must_use]
    pub fn new(ctx: &StageContext<'a>) -> Self {
        Self {
            detection: ctx.detection,
            config: ctx.config,
            levels: PunishmentLevels::from(ctx.config.punishment_levels.as_slice()),
            history: ctx.history,
            effects: ctx.effects,
            now: ctx.now,
        }
    }

    /// Issues every punishment reached by `offense`, in ascending threshold
    /// order. `report` fills the `{report}` placeholder.
    pub fn analyse(
        &self,
        subject: SubjectId,
        offense: Offense,
        report: &str,
    ) -> Vec<PunishmentOutcome> {
        let vars = TemplateVars {
            subject: subject.to_string(),
            detection: self.config.name.clone(),
            percentage: offense.percentage(),
            time: self.now.format(TIME_FORMAT).to_string(),
            channel: self.config.channel.clone(),
            report: report.to_string(),
        };

        self.levels
            .reached(offense.severity)
            .into_iter()
            .map(|punishment| self.handle(subject, punishment, &vars))
            .collect()
    }

    /// Renders and performs one punishment.
    fn handle(
        &self,
        subject: SubjectId,
        punishment: PunishmentType,
        vars: &TemplateVars,
    ) -> PunishmentOutcome {
        let template = self
            .config
            .punishment_templates
            .get(&punishment)
            .map_or_else(|| punishment.default_template(), String::as_str);
        let message = template::render(template, vars);

        let mut outcome = PunishmentOutcome {
            punishment,
            message,
            error: None,
            record: None,
        };

        if let Err(e) = self.perform(subject, punishment, &outcome.message) {
            warn!(
                detection = %self.detection,
                %subject,
                %punishment,
                error = %e,
                "punishment effect failed"
            );
            outcome.error = Some(e.to_string());
            return outcome;
        }

        metrics::record_punishment(punishment.as_str());
        if punishment != PunishmentType::Empty {
            info!(
                detection = %self.detection,
                %subject,
                %punishment,
                percentage = vars.percentage,
                "punishment issued"
            );
            let record = PunishmentRecord::new(self.detection.clone(), subject, self.now, punishment);
            match self.history.record(record) {
                Ok(id) => outcome.record = Some(id),
                Err(e) => warn!(detection = %self.detection, %subject, error = %e, "punishment not recorded"),
            }
        }
        outcome
    }

    fn perform(
        &self,
        subject: SubjectId,
        punishment: PunishmentType,
        message: &str,
    ) -> Result<(), EffectError> {
        match punishment {
            PunishmentType::Empty => Ok(()),
            PunishmentType::Warn => self.effects.notify(subject, message),
            PunishmentType::Flag | PunishmentType::Report => {
                self.effects.broadcast(&self.config.channel, message)
            }
            PunishmentType::Kick => self.effects.kick(subject, message),
            PunishmentType::TempBan => self.effects.ban(
                subject,
                message,
                Some(TimeDelta::hours(i64::from(self.config.tempban_hours))),
            ),
            PunishmentType::Ban => self.effects.ban(subject, message, None),
            PunishmentType::Custom => self.effects.dispatch(message),
        }
    }
}

impl std::fmt::Debug for PunishmentController<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PunishmentController")
            .field("detection", self.detection)
            .field("levels", &self.levels)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}
