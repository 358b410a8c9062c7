//! The value sum type carried by layers and builders.
//!
//! Every property owns one of two shapes: a scalar (`speed`, an angle
//! contribution, a scale factor) or a pair (`pos`, `direction`, `vector`).
//! Layer accumulation combines values under a mode; the coercion rules for
//! mismatched shapes follow the layer-group semantics of the engine: an
//! additive scalar meeting a vector yields the vector, a scale factor applies
//! componentwise to a vector.

use crate::vec2::{EPSILON, Vec2};

/// How a contribution combines with what is already there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Contribution is added.
    Offset,
    /// Contribution replaces.
    Override,
    /// Contribution multiplies.
    Scale,
}

impl Mode {
    pub fn name(self) -> &'static str {
        match self {
            Self::Offset => "offset",
            Self::Override => "override",
            Self::Scale => "scale",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Scalar(f64),
    Pair(Vec2),
}

impl Value {
    pub const ZERO_SCALAR: Self = Self::Scalar(0.0);
    pub const ZERO_PAIR: Self = Self::Pair(Vec2::ZERO);

    pub fn as_scalar(self) -> f64 {
        match self {
            Self::Scalar(s) => s,
            Self::Pair(v) => v.magnitude(),
        }
    }

    pub fn as_pair(self) -> Vec2 {
        match self {
            Self::Scalar(s) => Vec2::new(s, 0.0),
            Self::Pair(v) => v,
        }
    }

    pub fn negated(self) -> Self {
        match self {
            Self::Scalar(s) => Self::Scalar(-s),
            Self::Pair(v) => Self::Pair(-v),
        }
    }

    /// Neutral test under a mode: zero for additive shapes, one for scale.
    pub fn is_neutral(self, mode: Option<Mode>) -> bool {
        match (mode, self) {
            (Some(Mode::Scale), Self::Scalar(s)) => (s - 1.0).abs() < EPSILON,
            (_, Self::Scalar(s)) => s.abs() < EPSILON,
            (_, Self::Pair(v)) => v.is_zero(),
        }
    }

    pub fn approx_eq(self, other: Self) -> bool {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => (a - b).abs() < EPSILON,
            (Self::Pair(a), Self::Pair(b)) => a.approx_eq(b),
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(s: f64) -> Self {
        Self::Scalar(s)
    }
}

impl From<Vec2> for Value {
    fn from(v: Vec2) -> Self {
        Self::Pair(v)
    }
}

/// Fold `incoming` into `current` under `mode`.
///
/// `current == None` means the accumulator has not been initialized yet (a
/// direction-offset group does not know whether it accumulates angles or
/// vectors until its first contribution arrives); the incoming value then
/// becomes the accumulator. A missing mode behaves additively.
pub fn combine(current: Option<Value>, incoming: Value, mode: Option<Mode>) -> Value {
    let Some(current) = current else {
        return incoming;
    };
    match mode {
        Some(Mode::Override) => incoming,
        Some(Mode::Scale) => match (current, incoming) {
            (Value::Pair(v), Value::Scalar(f)) => Value::Pair(v * f),
            (Value::Scalar(a), Value::Scalar(b)) => Value::Scalar(a * b),
            (Value::Pair(a), Value::Pair(b)) => Value::Pair(Vec2::new(a.x * b.x, a.y * b.y)),
            (Value::Scalar(_), incoming @ Value::Pair(_)) => incoming,
        },
        // Offset, or default additive.
        _ => match (current, incoming) {
            (Value::Scalar(a), Value::Scalar(b)) => Value::Scalar(a + b),
            (Value::Pair(a), Value::Pair(b)) => Value::Pair(a + b),
            // Shape mismatch: a vector supersedes an accumulated scalar; a
            // scalar cannot displace an accumulated vector.
            (Value::Scalar(_), incoming @ Value::Pair(_)) => incoming,
            (current @ Value::Pair(_), Value::Scalar(_)) => current,
        },
    }
}
