//! Easing and interpolation registries.
//!
//! Both are closed enums validated by name at chain time. `ease_in`,
//! `ease_out` and `ease_in_out` are the quadratic forms; the numbered
//! spellings (`ease_in2` .. `ease_in4`) select the power explicitly, so
//! `ease_in2` is the same curve as `ease_in`.

use crate::error::ChainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    #[default]
    Linear,
    /// `t^p`, accelerating from rest.
    In(u8),
    /// `1 - (1-t)^p`, decelerating to rest.
    Out(u8),
    /// Symmetric accelerate/decelerate at power `p`.
    InOut(u8),
}

impl Easing {
    /// Resolve a name from the public enumeration.
    pub fn from_name(name: &str) -> Result<Self, ChainError> {
        match name {
            "linear" => Ok(Self::Linear),
            "ease_in" | "ease_in2" => Ok(Self::In(2)),
            "ease_in3" => Ok(Self::In(3)),
            "ease_in4" => Ok(Self::In(4)),
            "ease_out" | "ease_out2" => Ok(Self::Out(2)),
            "ease_out3" => Ok(Self::Out(3)),
            "ease_out4" => Ok(Self::Out(4)),
            "ease_in_out" | "ease_in_out2" => Ok(Self::InOut(2)),
            "ease_in_out3" => Ok(Self::InOut(3)),
            "ease_in_out4" => Ok(Self::InOut(4)),
            other => Err(ChainError::UnknownEasing(other.to_string())),
        }
    }

    /// Map raw progress `t` in `[0, 1]` through the curve.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::In(p) => t.powi(i32::from(p)),
            Self::Out(p) => 1.0 - (1.0 - t).powi(i32::from(p)),
            Self::InOut(p) => {
                let p = i32::from(p);
                if t < 0.5 {
                    0.5 * (2.0 * t).powi(p)
                } else {
                    1.0 - 0.5 * (2.0 * (1.0 - t)).powi(p)
                }
            }
        }
    }
}

/// How a transition travels between two values of a vector-valued property.
///
/// `Lerp` interpolates componentwise and re-normalizes (directions) or
/// interpolates magnitude and heading separately (vectors). `Slerp` rotates
/// along the shortest arc. `Linear` interpolates componentwise without
/// re-normalizing, which is the only form that can pass smoothly through the
/// zero vector on a same-axis reversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    Lerp,
    Slerp,
    Linear,
}

impl Interpolation {
    pub fn from_name(name: &str) -> Result<Self, ChainError> {
        match name {
            "lerp" => Ok(Self::Lerp),
            "slerp" => Ok(Self::Slerp),
            "linear" => Ok(Self::Linear),
            other => Err(ChainError::UnknownInterpolation(other.to_string())),
        }
    }
}
