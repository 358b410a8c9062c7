//! Pure mode operations: how a layer's aggregated value applies to the
//! composed state during evaluation.
//!
//! All four functions are total and deterministic. Angles travel as degrees
//! at this boundary (the fluent surface speaks degrees); radians stay
//! internal to `Vec2`.

use crate::value::{Mode, Value};
use crate::vec2::{EPSILON, Vec2};

/// Apply to a scalar property (speed).
pub fn apply_scalar(mode: Option<Mode>, value: f64, base: f64) -> f64 {
    match mode {
        Some(Mode::Override) => value,
        Some(Mode::Scale) => base * value,
        // Offset, or a base layer's own accumulator.
        _ => base + value,
    }
}

/// Apply to a direction.
///
/// Offset with a scalar value rotates the base by that many degrees; offset
/// with a pair adds and re-normalizes. Scale is a multiplier on the heading
/// angle relative to +x (see DESIGN.md, open question (a)).
///
/// Override passes the value through unchanged: a linearly-interpolated
/// reversal legitimately carries magnitude below one mid-transition, and
/// that taper is what makes the zero-crossing smooth. Stored directions are
/// normalized at bake time, not here.
pub fn apply_direction(mode: Option<Mode>, value: Value, base: Vec2) -> Vec2 {
    match mode {
        Some(Mode::Override) => value.as_pair(),
        Some(Mode::Scale) => match value {
            Value::Scalar(factor) => Vec2::from_angle_rad(base.angle_rad() * factor),
            // A pair cannot scale a heading; leave the base untouched.
            Value::Pair(_) => base,
        },
        _ => match value {
            Value::Scalar(degrees) => base.rotated_rad(degrees.to_radians()),
            Value::Pair(v) => (base + v).normalized(),
        },
    }
}

/// Apply to a position.
pub fn apply_position(mode: Option<Mode>, value: Value, base: Vec2) -> Vec2 {
    match mode {
        Some(Mode::Override) => value.as_pair(),
        Some(Mode::Scale) => match value {
            Value::Scalar(f) => base * f,
            Value::Pair(v) => Vec2::new(base.x * v.x, base.y * v.y),
        },
        _ => base + value.as_pair(),
    }
}

/// Apply a vector-layer value to the composed `(speed, direction)` pair.
///
/// The contribution is combined in velocity space and decomposed back; when
/// the combined velocity is zero the previous direction is kept so that a
/// later speed change resumes along the old heading.
pub fn apply_vector(
    mode: Option<Mode>,
    value: Value,
    base_speed: f64,
    base_dir: Vec2,
) -> (f64, Vec2) {
    let base_vel = base_dir * base_speed;
    let combined = match mode {
        Some(Mode::Override) => value.as_pair(),
        Some(Mode::Scale) => match value {
            Value::Scalar(f) => base_vel * f,
            Value::Pair(v) => Vec2::new(base_vel.x * v.x, base_vel.y * v.y),
        },
        _ => base_vel + value.as_pair(),
    };
    decompose(combined, base_dir)
}

/// Split a velocity into `(speed, unit direction)`, keeping `fallback_dir`
/// when the velocity is zero.
pub fn decompose(velocity: Vec2, fallback_dir: Vec2) -> (f64, Vec2) {
    let speed = velocity.magnitude();
    if speed < EPSILON {
        (0.0, fallback_dir)
    } else {
        (speed, velocity.normalized())
    }
}
