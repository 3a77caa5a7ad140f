//! The built-in penalty stage.

use tracing::{debug, warn};

use crate::capture::CaptureKey;
use crate::event::Vec3;
use crate::stage::{Penalty, Report, StageContext, Summary};

use super::controller::PunishmentController;
use super::kind::PunishmentType;

/// Where a subject is put back to when `setback` is enabled. Checks that
/// support setback capture it on their first action.
pub const SETBACK_POSITION: CaptureKey<Vec3> = CaptureKey::new("setback-position", Vec3::new(0.0, 0.0, 0.0));

/// Scores the summary and issues every punishment the score reaches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdPenalty;

impl ThresholdPenalty {
    /// Registry key.
    pub const KEY: &'static str = "threshold";
}

impl Penalty for ThresholdPenalty {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn apply(&self, ctx: &StageContext<'_>, summary: &mut Summary) {
        let offense = summary.compute_offense(ctx.config);
        summary.attach(Report::Offense(offense));

        let subject = summary.subject();
        let outcomes =
            PunishmentController::new(ctx).analyse(subject, offense, &summary.describe());
        debug!(
            detection = %ctx.detection,
            %subject,
            severity = offense.severity,
            issued = outcomes.len(),
            "offense scored"
        );

        let punished = outcomes
            .iter()
            .any(|o| o.succeeded() && o.punishment != PunishmentType::Empty);
        if ctx.config.setback && punished {
            if let Some(position) = summary.result().captures.get(&SETBACK_POSITION) {
                if let Err(e) = ctx.effects.teleport(subject, position) {
                    warn!(detection = %ctx.detection, %subject, error = %e, "setback failed");
                }
            }
        }

        summary.attach(Report::Penalty(outcomes));
    }
}
