//! 2D vector math.
//!
//! Screen coordinates: +x right, +y down. Directions stored in rig state are
//! either unit length or the zero vector; `normalized` enforces that by
//! collapsing anything shorter than [`EPSILON`] to zero.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Magnitude threshold below which a vector is treated as zero.
pub const EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn magnitude(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn magnitude_sq(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Unit vector in the same direction, or zero when shorter than epsilon.
    pub fn normalized(self) -> Self {
        let mag = self.magnitude();
        if mag < EPSILON {
            Self::ZERO
        } else {
            Self::new(self.x / mag, self.y / mag)
        }
    }

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product; sign gives rotation direction.
    pub fn cross(self, other: Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Heading angle in radians, measured from +x.
    pub fn angle_rad(self) -> f64 {
        self.y.atan2(self.x)
    }

    pub fn from_angle_rad(angle: f64) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    /// Rotate by `angle` radians (positive rotates toward +y).
    pub fn rotated_rad(self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self::new(self.x + (other.x - self.x) * t, self.y + (other.y - self.y) * t)
    }

    pub fn is_zero(self) -> bool {
        self.x.abs() < EPSILON && self.y.abs() < EPSILON
    }

    pub fn approx_eq(self, other: Self) -> bool {
        (self.x - other.x).abs() < EPSILON && (self.y - other.y).abs() < EPSILON
    }

    /// Round both components to the nearest integer pixel.
    pub fn round_i32(self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }

    /// Shortest-arc angle to `other` in radians, in `[0, π]`.
    pub fn angle_between(self, other: Self) -> f64 {
        self.normalized()
            .dot(other.normalized())
            .clamp(-1.0, 1.0)
            .acos()
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Vec2 {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl fmt::Display for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_collapses_tiny_vectors_to_zero() {
        let v = Vec2::new(1e-9, -1e-9);
        assert_eq!(v.normalized(), Vec2::ZERO);
    }

    #[test]
    fn normalized_is_unit_length() {
        let v = Vec2::new(3.0, 4.0).normalized();
        assert!((v.magnitude() - 1.0).abs() < EPSILON);
        assert!(v.approx_eq(Vec2::new(0.6, 0.8)));
    }

    #[test]
    fn rotation_quarter_turn() {
        let v = Vec2::new(1.0, 0.0).rotated_rad(std::f64::consts::FRAC_PI_2);
        assert!(v.approx_eq(Vec2::new(0.0, 1.0)));
    }

    #[test]
    fn angle_between_is_shortest_arc() {
        let a = Vec2::new(1.0, 0.0);
        let b = Vec2::new(0.0, 1.0);
        assert!((a.angle_between(b) - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        assert!((a.angle_between(-a) - std::f64::consts::PI).abs() < 1e-9);
    }

    #[test]
    fn round_half_goes_away_from_zero() {
        assert_eq!(Vec2::new(2.5, -2.5).round_i32(), (3, -3));
    }
}
