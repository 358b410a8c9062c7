//! Rate-based timing: convert a rate parameter plus the size of the change
//! into a transition duration.
//!
//! Units: speed rates are value units per second, direction rates are degrees
//! per second, position and vector rates are pixels per second. Durations
//! are clamped to a 1 ms floor so a zero-size delta never produces a
//! degenerate instant-divide.

use crate::vec2::Vec2;

/// Floor for every computed duration.
pub const MIN_DURATION_MS: f64 = 1.0;

/// Deltas smaller than this are treated as already-arrived.
const NEGLIGIBLE_DELTA: f64 = 0.01;

pub fn duration_from_rate(delta: f64, rate: f64) -> f64 {
    if delta.abs() < NEGLIGIBLE_DELTA || rate.abs() < f64::EPSILON {
        return MIN_DURATION_MS;
    }
    (delta.abs() / rate.abs() * 1000.0).max(MIN_DURATION_MS)
}

/// Duration for a speed transition at `rate` units/s.
pub fn speed_duration(current: f64, target: f64, rate: f64) -> f64 {
    duration_from_rate(target - current, rate)
}

/// Duration for rotating between two headings at `rate` °/s, along the
/// shortest arc.
pub fn direction_duration(current: Vec2, target: Vec2, rate: f64) -> f64 {
    duration_from_rate(current.angle_between(target).to_degrees(), rate)
}

/// Duration for a relative rotation of `angle_deg` degrees at `rate` °/s.
pub fn direction_by_duration(angle_deg: f64, rate: f64) -> f64 {
    duration_from_rate(angle_deg, rate)
}

/// Duration for moving between two points at `rate` px/s.
pub fn position_duration(current: Vec2, target: Vec2, rate: f64) -> f64 {
    duration_from_rate((target - current).magnitude(), rate)
}

/// Duration for a relative move of `offset` at `rate` px/s.
pub fn position_by_duration(offset: Vec2, rate: f64) -> f64 {
    duration_from_rate(offset.magnitude(), rate)
}

/// Duration for a velocity change at `rate` px/s, measured in velocity space.
pub fn vector_duration(current: Vec2, target: Vec2, rate: f64) -> f64 {
    duration_from_rate((target - current).magnitude(), rate)
}
