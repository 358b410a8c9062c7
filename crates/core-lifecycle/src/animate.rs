//! Interpolation of property values across lifecycle phases.
//!
//! Each function answers: given the lifecycle's `(phase, progress)` and a
//! builder's endpoints, what does the builder contribute right now? The
//! `neutral`/`base` argument is mode-dependent and supplied by the caller
//! (0 for offset, 1 for scale, the captured base value for override).

use core_model::{EPSILON, Interpolation, Phase, Vec2};

/// Scalar animation between `base` and `target`.
pub fn scalar(
    base: f64,
    target: f64,
    phase: Option<Phase>,
    progress: f64,
    has_reverted: bool,
) -> f64 {
    match phase {
        None => {
            if has_reverted {
                base
            } else {
                target
            }
        }
        Some(Phase::Over) => lerp(base, target, progress),
        Some(Phase::Hold) => target,
        Some(Phase::Revert) => lerp(target, base, progress),
    }
}

/// Direction animation.
///
/// `Slerp` rotates along the shortest arc. `Lerp` interpolates componentwise
/// and re-normalizes. `Linear` interpolates componentwise *without*
/// re-normalizing: the only form that passes smoothly through zero on a
/// same-axis reversal, shrinking the effective velocity on the way.
pub fn direction(
    base: Vec2,
    target: Vec2,
    phase: Option<Phase>,
    progress: f64,
    has_reverted: bool,
    interpolation: Interpolation,
) -> Vec2 {
    let travel = |from: Vec2, to: Vec2, t: f64| match interpolation {
        Interpolation::Slerp => slerp(from, to, t),
        Interpolation::Lerp => from.lerp(to, t).normalized(),
        Interpolation::Linear => from.lerp(to, t),
    };
    match phase {
        None => {
            if has_reverted {
                base
            } else {
                target
            }
        }
        Some(Phase::Over) => travel(base, target, progress),
        Some(Phase::Hold) => target,
        Some(Phase::Revert) => travel(target, base, progress),
    }
}

/// Position-offset animation: from zero out to `target`, and on revert back
/// to `revert_to` (zero unless a replace handoff installed a target).
pub fn position_offset(
    target: Vec2,
    phase: Option<Phase>,
    progress: f64,
    has_reverted: bool,
    revert_to: Option<Vec2>,
) -> Vec2 {
    let revert_to = revert_to.unwrap_or(Vec2::ZERO);
    match phase {
        None => {
            if has_reverted {
                revert_to
            } else {
                target
            }
        }
        Some(Phase::Over) => target * progress,
        Some(Phase::Hold) => target,
        Some(Phase::Revert) => target.lerp(revert_to, progress),
    }
}

/// Absolute-position animation between `base` and `target`.
pub fn position_override(
    base: Vec2,
    target: Vec2,
    phase: Option<Phase>,
    progress: f64,
    has_reverted: bool,
) -> Vec2 {
    match phase {
        None => {
            if has_reverted {
                base
            } else {
                target
            }
        }
        Some(Phase::Over) => base.lerp(target, progress),
        Some(Phase::Hold) => target,
        Some(Phase::Revert) => target.lerp(base, progress),
    }
}

/// Velocity-vector animation.
///
/// `Linear` interpolates components directly (smooth reversal through zero).
/// The polar forms interpolate magnitude and heading separately, with the
/// zero-vector edge cases spelled out: a transition out of rest adopts the
/// target heading immediately; a transition into rest keeps the source
/// heading while the magnitude drains.
pub fn vector(
    base: Vec2,
    target: Vec2,
    phase: Option<Phase>,
    progress: f64,
    has_reverted: bool,
    interpolation: Interpolation,
) -> Vec2 {
    match phase {
        None => {
            if has_reverted {
                base
            } else {
                target
            }
        }
        Some(Phase::Hold) => target,
        Some(Phase::Over) => polar_travel(base, target, progress, interpolation),
        Some(Phase::Revert) => polar_travel(target, base, progress, interpolation),
    }
}

fn polar_travel(from: Vec2, to: Vec2, t: f64, interpolation: Interpolation) -> Vec2 {
    if interpolation == Interpolation::Linear {
        return from.lerp(to, t);
    }
    let from_speed = from.magnitude();
    let to_speed = to.magnitude();
    if from_speed < EPSILON && to_speed < EPSILON {
        return Vec2::ZERO;
    }
    if from_speed < EPSILON {
        return to.normalized() * lerp(from_speed, to_speed, t);
    }
    if to_speed < EPSILON {
        return from.normalized() * (from_speed * (1.0 - t));
    }
    let dir = from.normalized().lerp(to.normalized(), t).normalized();
    dir * lerp(from_speed, to_speed, t)
}

/// Spherical interpolation between two unit vectors, rotating `v1` toward
/// `v2` along the shorter arc.
pub fn slerp(v1: Vec2, v2: Vec2, t: f64) -> Vec2 {
    let angle = v1.dot(v2).clamp(-1.0, 1.0).acos();
    if angle < EPSILON {
        return v2;
    }
    let sign = if v1.cross(v2) >= 0.0 { 1.0 } else { -1.0 };
    v1.rotated_rad(angle * t * sign).normalized()
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}
