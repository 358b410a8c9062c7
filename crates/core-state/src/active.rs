//! An in-flight command: one contribution being driven through its
//! lifecycle inside a layer group.

use std::time::Instant;

use core_lifecycle::{Lifecycle, animate};
use core_model::{
    BuilderConfig, Interpolation, Mode, MovementType, Operator, Phase, PhaseCallback, Property,
    Value, Vec2,
};

/// Dot-product threshold past which two headings count as opposite.
const OPPOSITE_DOT: f64 = -0.9;
/// Component magnitude below which an axis counts as zero for reversal
/// detection.
const AXIS_ZERO: f64 = 0.01;

pub struct ActiveBuilder {
    pub config: BuilderConfig,
    pub lifecycle: Lifecycle,
    /// Captured starting point; meaning depends on mode (absolute base for
    /// override, unused neutral for offset/scale).
    pub base_value: Value,
    /// Captured end point; contribution for offset, absolute for override,
    /// factor for scale.
    pub target_value: Value,
    /// Where a revert lands instead of neutral (pos.offset replace handoff).
    pub revert_target: Option<Vec2>,
    pub creation_time: Instant,
    pub marked_for_removal: bool,
    /// Replace handoff: animate from `base_value` (the layer's prior total)
    /// instead of the mode's neutral, so the takeover is continuous.
    pub handoff: bool,
    /// Integer movement already emitted for this builder (pos relative).
    pub total_emitted: Vec2,
    /// Phase/progress as of the last advance; reads between ticks see this.
    cur_phase: Option<Phase>,
    cur_progress: f64,
    advanced_once: bool,
}

impl ActiveBuilder {
    pub fn new(config: BuilderConfig, base_value: Value, target_value: Value, now: Instant) -> Self {
        let mut builder = Self {
            lifecycle: Lifecycle::from_config(&config),
            config,
            base_value,
            target_value,
            revert_target: None,
            creation_time: now,
            marked_for_removal: false,
            handoff: false,
            total_emitted: Vec2::ZERO,
            cur_phase: None,
            cur_progress: 0.0,
            advanced_once: false,
        };
        builder.detect_same_axis_reversal();
        builder
    }

    /// Same-axis 180° reversals of `direction.to` interpolate componentwise
    /// (no re-normalization) so the motion passes through zero instead of
    /// swinging through a perpendicular heading.
    fn detect_same_axis_reversal(&mut self) {
        if self.config.property != Property::Direction
            || self.config.operator != Operator::To
            || !self.config.over_ms.is_some_and(|ms| ms > 0.0)
        {
            return;
        }
        let (Value::Pair(base), Value::Pair(target)) = (self.base_value, self.target_value) else {
            return;
        };
        let same_axis = (base.x.abs() < AXIS_ZERO && target.x.abs() < AXIS_ZERO)
            || (base.y.abs() < AXIS_ZERO && target.y.abs() < AXIS_ZERO);
        if same_axis && base.dot(target) < OPPOSITE_DOT {
            tracing::debug!(
                target: "rig.builder",
                layer = %self.config.layer_name,
                "same_axis_reversal_linear_interpolation"
            );
            self.config.over_interpolation = Interpolation::Linear;
            self.config.revert_interpolation = Interpolation::Linear;
        }
    }

    /// Advance the lifecycle to `now`; returns the phases left during this
    /// advance (for callback dispatch).
    pub fn advance(&mut self, now: Instant) -> Vec<Phase> {
        let adv = self.lifecycle.advance(now);
        self.cur_phase = adv.phase;
        self.cur_progress = adv.progress;
        self.advanced_once = true;
        adv.crossed
    }

    /// What this builder contributes to its group right now, based on the
    /// phase/progress recorded by the last advance.
    pub fn value(&self) -> Value {
        let (phase, progress) = if self.advanced_once {
            (self.cur_phase, self.cur_progress)
        } else {
            // Not yet ticked: report the start of the first phase.
            self.lifecycle.probe(self.creation_time)
        };
        self.value_at(phase, progress)
    }

    fn interpolation_for(&self, phase: Option<Phase>) -> Interpolation {
        if phase == Some(Phase::Revert) {
            self.config.revert_interpolation
        } else {
            self.config.over_interpolation
        }
    }

    fn value_at(&self, phase: Option<Phase>, progress: f64) -> Value {
        let reverted = self.lifecycle.has_reverted();
        let mode = self.config.mode;
        let interp = self.interpolation_for(phase);

        match self.config.property {
            Property::Speed => Value::Scalar(animate::scalar(
                self.scalar_neutral(mode),
                self.target_value.as_scalar(),
                phase,
                progress,
                reverted,
            )),
            Property::Direction => match (mode, self.target_value) {
                // Angle contribution accumulating on an offset layer.
                (Some(Mode::Offset), Value::Scalar(angle)) => {
                    let from = if self.handoff {
                        self.base_value.as_scalar()
                    } else {
                        0.0
                    };
                    Value::Scalar(animate::scalar(from, angle, phase, progress, reverted))
                }
                // Vector contribution on an offset layer grows out of zero.
                (Some(Mode::Offset), Value::Pair(v)) if !self.handoff => Value::Pair(
                    animate::position_offset(v, phase, progress, reverted, None),
                ),
                (Some(Mode::Offset), Value::Pair(v)) => Value::Pair(animate::position_override(
                    self.base_value.as_pair(),
                    v,
                    phase,
                    progress,
                    reverted,
                )),
                (Some(Mode::Scale), target) => Value::Scalar(animate::scalar(
                    1.0,
                    target.as_scalar(),
                    phase,
                    progress,
                    reverted,
                )),
                _ => Value::Pair(animate::direction(
                    self.base_value.as_pair(),
                    self.target_value.as_pair(),
                    phase,
                    progress,
                    reverted,
                    interp,
                )),
            },
            Property::Pos => match mode {
                Some(Mode::Scale) => Value::Scalar(animate::scalar(
                    1.0,
                    self.target_value.as_scalar(),
                    phase,
                    progress,
                    reverted,
                )),
                // Relative movement and offset layers animate a displacement
                // out of zero; everything else animates the absolute point.
                _ if self.config.movement_type == MovementType::Relative
                    || mode == Some(Mode::Offset) =>
                {
                    Value::Pair(animate::position_offset(
                        self.target_value.as_pair(),
                        phase,
                        progress,
                        reverted,
                        self.revert_target,
                    ))
                }
                _ => Value::Pair(animate::position_override(
                    self.base_value.as_pair(),
                    self.target_value.as_pair(),
                    phase,
                    progress,
                    reverted,
                )),
            },
            Property::Vector => match mode {
                Some(Mode::Scale) => Value::Scalar(animate::scalar(
                    1.0,
                    self.target_value.as_scalar(),
                    phase,
                    progress,
                    reverted,
                )),
                Some(Mode::Override) | None => Value::Pair(animate::vector(
                    self.base_value.as_pair(),
                    self.target_value.as_pair(),
                    phase,
                    progress,
                    reverted,
                    interp,
                )),
                Some(Mode::Offset) => {
                    let from = if self.handoff {
                        self.base_value.as_pair()
                    } else {
                        Vec2::ZERO
                    };
                    Value::Pair(animate::vector(
                        from,
                        self.target_value.as_pair(),
                        phase,
                        progress,
                        reverted,
                        interp,
                    ))
                }
            },
        }
    }

    fn scalar_neutral(&self, mode: Option<Mode>) -> f64 {
        if self.handoff {
            return self.base_value.as_scalar();
        }
        match mode {
            Some(Mode::Scale) => 1.0,
            Some(Mode::Offset) => 0.0,
            // Base layers and override animate from the captured base.
            _ => self.base_value.as_scalar(),
        }
    }

    /// Remove and return the callbacks registered for `phase`.
    pub fn take_callbacks_for(&mut self, phase: Phase) -> Vec<PhaseCallback> {
        let mut taken = Vec::new();
        let all = std::mem::take(&mut self.config.then_callbacks);
        for (p, cb) in all {
            if p == phase {
                taken.push(cb);
            } else {
                self.config.then_callbacks.push((p, cb));
            }
        }
        taken
    }

    pub fn is_user_named(&self) -> bool {
        self.config.is_user_named()
    }

    pub fn time_alive(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.creation_time).as_secs_f64()
    }

    /// Negate endpoints in place (the `reverse` special op).
    pub fn negate(&mut self) {
        self.base_value = self.base_value.negated();
        self.target_value = self.target_value.negated();
    }

    /// Duplicate without callbacks. Layer copies preserve timing and
    /// endpoints; callbacks stay with the original, which is the layer that
    /// keeps the caller's identity.
    pub fn clone_detached(&self) -> Self {
        let mut config = BuilderConfig::new(self.config.property, self.config.operator, self.config.value);
        config.layer_name = self.config.layer_name.clone();
        config.layer_kind = self.config.layer_kind;
        config.order = self.config.order;
        config.mode = self.config.mode;
        config.over_ms = self.config.over_ms;
        config.over_rate = self.config.over_rate;
        config.over_easing = self.config.over_easing;
        config.over_interpolation = self.config.over_interpolation;
        config.hold_ms = self.config.hold_ms;
        config.revert_ms = self.config.revert_ms;
        config.revert_rate = self.config.revert_rate;
        config.revert_easing = self.config.revert_easing;
        config.revert_interpolation = self.config.revert_interpolation;
        config.behavior = self.config.behavior;
        config.bake_override = self.config.bake_override;
        config.movement_type = self.config.movement_type;
        config.api_override = self.config.api_override.clone();
        config.input_kind = self.config.input_kind;
        config.scroll_by_lines = self.config.scroll_by_lines;
        Self {
            config,
            lifecycle: self.lifecycle.clone(),
            base_value: self.base_value,
            target_value: self.target_value,
            revert_target: self.revert_target,
            creation_time: self.creation_time,
            marked_for_removal: self.marked_for_removal,
            handoff: self.handoff,
            total_emitted: self.total_emitted,
            cur_phase: self.cur_phase,
            cur_progress: self.cur_progress,
            advanced_once: self.advanced_once,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::Easing;
    use std::time::Duration;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    fn speed_offset_config(target: f64, over: f64) -> BuilderConfig {
        let mut c = BuilderConfig::new(Property::Speed, Operator::Add, Value::Scalar(target));
        c.mode = Some(Mode::Offset);
        c.layer_kind = core_model::LayerKind::UserModifier;
        c.layer_name = "boost".into();
        c.over_ms = Some(over);
        c
    }

    #[test]
    fn offset_contribution_ramps_from_zero() {
        let t0 = Instant::now();
        let config = speed_offset_config(10.0, 100.0);
        let mut b = ActiveBuilder::new(config, Value::Scalar(0.0), Value::Scalar(10.0), t0);
        b.advance(t0);
        assert_eq!(b.value(), Value::Scalar(0.0));
        b.advance(at(t0, 50));
        assert!(b.value().approx_eq(Value::Scalar(5.0)));
        b.advance(at(t0, 150));
        assert_eq!(b.value(), Value::Scalar(10.0));
    }

    #[test]
    fn override_animates_between_base_and_target() {
        let t0 = Instant::now();
        let mut config = BuilderConfig::new(Property::Speed, Operator::To, Value::Scalar(8.0));
        config.over_ms = Some(100.0);
        let mut b = ActiveBuilder::new(config, Value::Scalar(2.0), Value::Scalar(8.0), t0);
        b.advance(t0);
        b.advance(at(t0, 50));
        assert!(b.value().approx_eq(Value::Scalar(5.0)));
    }

    #[test]
    fn reverted_builder_lands_on_neutral() {
        let t0 = Instant::now();
        let mut config = speed_offset_config(10.0, 10.0);
        config.revert_ms = Some(10.0);
        let mut b = ActiveBuilder::new(config, Value::Scalar(0.0), Value::Scalar(10.0), t0);
        b.advance(t0);
        b.advance(at(t0, 100));
        assert!(b.lifecycle.has_reverted());
        assert_eq!(b.value(), Value::Scalar(0.0));
    }

    #[test]
    fn same_axis_reversal_switches_to_linear() {
        let t0 = Instant::now();
        let mut config = BuilderConfig::new(
            Property::Direction,
            Operator::To,
            Value::Pair(Vec2::new(-1.0, 0.0)),
        );
        config.over_ms = Some(400.0);
        let b = ActiveBuilder::new(
            config,
            Value::Pair(Vec2::new(1.0, 0.0)),
            Value::Pair(Vec2::new(-1.0, 0.0)),
            t0,
        );
        assert_eq!(b.config.over_interpolation, Interpolation::Linear);
        assert_eq!(b.config.revert_interpolation, Interpolation::Linear);
    }

    #[test]
    fn perpendicular_turn_keeps_lerp() {
        let t0 = Instant::now();
        let mut config = BuilderConfig::new(
            Property::Direction,
            Operator::To,
            Value::Pair(Vec2::new(0.0, 1.0)),
        );
        config.over_ms = Some(400.0);
        let b = ActiveBuilder::new(
            config,
            Value::Pair(Vec2::new(1.0, 0.0)),
            Value::Pair(Vec2::new(0.0, 1.0)),
            t0,
        );
        assert_eq!(b.config.over_interpolation, Interpolation::Lerp);
    }

    #[test]
    fn callbacks_taken_per_phase() {
        let t0 = Instant::now();
        let mut config = speed_offset_config(1.0, 10.0);
        config.then_callbacks.push((Phase::Over, Box::new(|| {})));
        config.then_callbacks.push((Phase::Revert, Box::new(|| {})));
        config.then_callbacks.push((Phase::Over, Box::new(|| {})));
        let mut b = ActiveBuilder::new(config, Value::Scalar(0.0), Value::Scalar(1.0), t0);
        assert_eq!(b.take_callbacks_for(Phase::Over).len(), 2);
        assert_eq!(b.take_callbacks_for(Phase::Over).len(), 0);
        assert_eq!(b.config.then_callbacks.len(), 1);
    }

    #[test]
    fn scale_mode_animates_the_factor_from_one() {
        let t0 = Instant::now();
        let mut config = BuilderConfig::new(Property::Speed, Operator::Mul, Value::Scalar(3.0));
        config.mode = Some(Mode::Scale);
        config.layer_kind = core_model::LayerKind::AutoModifier;
        config.layer_name = "speed.scale".into();
        config.over_ms = Some(100.0);
        config.over_easing = Easing::Linear;
        let mut b = ActiveBuilder::new(config, Value::Scalar(1.0), Value::Scalar(3.0), t0);
        b.advance(t0);
        b.advance(at(t0, 50));
        assert!(b.value().approx_eq(Value::Scalar(2.0)));
    }
}
