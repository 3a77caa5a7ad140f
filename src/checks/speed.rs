//! Horizontal movement speed.

use std::sync::Arc;

use crate::capture::CaptureKey;
use crate::config::DetectionConfig;
use crate::event::{EventKind, EventPayload};
use crate::punishment::SETBACK_POSITION;
use crate::sequence::{Action, Process, ProcessResult, SequenceBlueprint};
use crate::stage::{Check, CheckContext};

/// Material and world multiplier in effect for the last move.
pub const SPEED_MODIFIER: CaptureKey<f64> = CaptureKey::new("speed-modifier", 1.0);

/// Largest horizontal distance covered by a single move of the sequence.
pub const HORIZONTAL_DELTA: CaptureKey<f64> = CaptureKey::new("horizontal-delta", 0.0);

/// Flags subjects that repeatedly move faster than the walk speed allows.
///
/// The sequence opens on a move exceeding the limit and completes when a
/// second one follows within `delay-ticks`. Moves under the limit in between
/// hold the sequence and count against the pass fraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpeedCheck;

impl SpeedCheck {
    /// Registry key.
    pub const KEY: &'static str = "speed";
}

/// Measures the move against the limit, recording captures on the way.
/// Returns `None` for payloads that are not moves.
fn exceeds_limit(process: &mut Process<'_>, config: &DetectionConfig) -> Option<bool> {
    let EventPayload::Move {
        from,
        to,
        world,
        material,
        ..
    } = &process.event().payload
    else {
        return None;
    };
    let (from, to) = (*from, *to);
    let modifier = config.speed_modifier(material, world);
    let delta = from.horizontal_distance(to);

    let captures = process.captures_mut();
    captures.put(&SPEED_MODIFIER, modifier);
    captures.transform(&HORIZONTAL_DELTA, |peak| peak.max(delta), 0.0);
    captures.put_once(&SETBACK_POSITION, from);

    Some(delta > config.checks.walk_speed * modifier)
}

impl Check for SpeedCheck {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn blueprint(&self, ctx: &CheckContext<'_>) -> SequenceBlueprint {
        let config = Arc::new(ctx.config.clone());
        let opening = Arc::clone(&config);
        let follow_up = Arc::clone(&config);

        SequenceBlueprint::builder(Self::KEY)
            .capture(&SPEED_MODIFIER)
            .capture(&HORIZONTAL_DELTA)
            .then(
                Action::on(EventKind::Move).condition(move |p| {
                    let exceeded = exceeds_limit(p, &opening).unwrap_or(false);
                    p.next_if(exceeded)
                }),
            )
            .then(
                Action::on(EventKind::Move)
                    .delay(ctx.tick_rate.ticks(config.checks.delay_ticks))
                    .condition(move |p| -> ProcessResult {
                        match exceeds_limit(p, &follow_up) {
                            Some(true) => p.next(),
                            Some(false) => p.skip(),
                            None => p.end(),
                        }
                    }),
            )
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::DetectionId;
    use crate::event::{DomainEvent, SubjectId, Vec3};
    use crate::sequence::{BlueprintKey, Sequence, SequenceState, Step};
    use crate::time::TickRate;
    use chrono::{DateTime, TimeDelta, Utc};

    fn movement(subject: SubjectId, at: DateTime<Utc>, dx: f64, material: &str) -> DomainEvent {
        DomainEvent::new(
            subject,
            at,
            EventPayload::Move {
                from: Vec3::new(0.0, 64.0, 0.0),
                to: Vec3::new(dx, 64.0, 0.0),
                on_ground: true,
                world: "overworld".into(),
                material: material.into(),
            },
        )
    }

    fn sequence(config: &DetectionConfig, subject: SubjectId, at: DateTime<Utc>) -> Sequence {
        let detection = DetectionId::new("movement-speed");
        let blueprint = SpeedCheck.blueprint(&CheckContext {
            detection: &detection,
            config,
            tick_rate: TickRate::default(),
        });
        Sequence::new(
            BlueprintKey::new(detection.clone(), SpeedCheck::KEY),
            Arc::new(blueprint),
            subject,
            at,
            TickRate::default(),
        )
    }

    #[test]
    fn test_two_fast_moves_complete() {
        let config = DetectionConfig::named("Movement Speed");
        let subject = SubjectId::random();
        let t0 = Utc::now();
        let mut seq = sequence(&config, subject, t0);
        assert_eq!(seq.advance(&movement(subject, t0, 0.9, "stone")), Step::Advanced { cursor: 1 });
        let t1 = t0 + TimeDelta::milliseconds(50);
        assert_eq!(seq.advance(&movement(subject, t1, 0.8, "stone")), Step::Completed);

        let result = seq.into_result();
        assert!((result.captures.get(&HORIZONTAL_DELTA).unwrap() - 0.9).abs() < 1e-9);
        assert_eq!(
            result.captures.get(&SETBACK_POSITION),
            Some(Vec3::new(0.0, 64.0, 0.0))
        );
    }

    #[test]
    fn test_normal_move_never_opens() {
        let config = DetectionConfig::named("Movement Speed");
        let subject = SubjectId::random();
        let t0 = Utc::now();
        let mut seq = sequence(&config, subject, t0);
        assert!(matches!(seq.advance(&movement(subject, t0, 0.2, "stone")), Step::Failed(_)));
        assert_eq!(seq.state(), SequenceState::Failed);
    }

    #[test]
    fn test_slow_follow_up_holds_and_counts() {
        let config = DetectionConfig::named("Movement Speed");
        let subject = SubjectId::random();
        let t0 = Utc::now();
        let mut seq = sequence(&config, subject, t0);
        seq.advance(&movement(subject, t0, 0.9, "stone"));
        let t1 = t0 + TimeDelta::milliseconds(50);
        assert_eq!(seq.advance(&movement(subject, t1, 0.1, "stone")), Step::Held);
        let t2 = t1 + TimeDelta::milliseconds(50);
        assert_eq!(seq.advance(&movement(subject, t2, 0.7, "stone")), Step::Completed);
        let result = seq.into_result();
        assert_eq!(result.passed(), 2);
        assert_eq!(result.failed(), 1);
    }

    #[test]
    fn test_material_modifier_raises_limit() {
        let mut config = DetectionConfig::named("Movement Speed");
        config.material_modifiers.insert("ice".into(), 3.0);
        let subject = SubjectId::random();
        let t0 = Utc::now();
        let mut seq = sequence(&config, subject, t0);
        assert!(matches!(seq.advance(&movement(subject, t0, 0.9, "ice")), Step::Failed(_)));
        assert!((seq.captures().get(&SPEED_MODIFIER).unwrap() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_follow_up_after_window_expires() {
        let config = DetectionConfig::named("Movement Speed");
        let subject = SubjectId::random();
        let t0 = Utc::now();
        let mut seq = sequence(&config, subject, t0);
        seq.advance(&movement(subject, t0, 0.9, "stone"));
        let late = t0 + TimeDelta::milliseconds(2100);
        assert!(matches!(seq.advance(&movement(subject, late, 0.9, "stone")), Step::Failed(_)));
    }
}
