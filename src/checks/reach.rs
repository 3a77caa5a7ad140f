//! Attack reach.

use crate::capture::CaptureKey;
use crate::event::{EventKind, EventPayload};
use crate::sequence::{Action, SequenceBlueprint};
use crate::stage::{Check, CheckContext};

/// Distance between the attacker's eyes and the hit position.
pub const REACH_DISTANCE: CaptureKey<f64> = CaptureKey::new("reach-distance", 0.0);

/// Flags attacks landing further away than `max-reach`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReachCheck;

impl ReachCheck {
    /// Registry key.
    pub const KEY: &'static str = "reach";
}

impl Check for ReachCheck {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn blueprint(&self, ctx: &CheckContext<'_>) -> SequenceBlueprint {
        let max_reach = ctx.config.checks.max_reach;
        SequenceBlueprint::builder(Self::KEY)
            .capture(&REACH_DISTANCE)
            .then(Action::on(EventKind::Attack).condition(move |p| {
                let EventPayload::Attack { origin, hit, .. } = p.event().payload else {
                    return p.end();
                };
                let distance = origin.distance(hit);
                p.captures_mut().put(&REACH_DISTANCE, distance);
                p.next_if(distance > max_reach)
            }))
            .build()
    }
}
