//! Cardinal and intercardinal direction naming for state reads.

use std::fmt;

use crate::vec2::Vec2;

/// Headings within 22.5° of an axis are the pure cardinal; everything else
/// is a diagonal. Screen coordinates: up is negative y.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinal {
    Right,
    Left,
    Up,
    Down,
    UpRight,
    UpLeft,
    DownRight,
    DownLeft,
}

/// tan(67.5°); the boundary between a pure cardinal and a diagonal.
const AXIS_THRESHOLD: f64 = 2.414;

impl Cardinal {
    /// Classify a direction vector. Returns `None` for the zero vector.
    pub fn from_direction(dir: Vec2) -> Option<Self> {
        let (x, y) = (dir.x, dir.y);
        if x == 0.0 && y == 0.0 {
            return None;
        }
        if x.abs() > y.abs() * AXIS_THRESHOLD {
            return Some(if x > 0.0 { Self::Right } else { Self::Left });
        }
        if y.abs() > x.abs() * AXIS_THRESHOLD {
            return Some(if y < 0.0 { Self::Up } else { Self::Down });
        }
        Some(match (x > 0.0, y < 0.0) {
            (true, true) => Self::UpRight,
            (false, true) => Self::UpLeft,
            (true, false) => Self::DownRight,
            (false, false) => Self::DownLeft,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Right => "right",
            Self::Left => "left",
            Self::Up => "up",
            Self::Down => "down",
            Self::UpRight => "up_right",
            Self::UpLeft => "up_left",
            Self::DownRight => "down_right",
            Self::DownLeft => "down_left",
        }
    }
}

impl fmt::Display for Cardinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axes_map_to_pure_cardinals() {
        assert_eq!(Cardinal::from_direction(Vec2::new(1.0, 0.0)), Some(Cardinal::Right));
        assert_eq!(Cardinal::from_direction(Vec2::new(-1.0, 0.0)), Some(Cardinal::Left));
        assert_eq!(Cardinal::from_direction(Vec2::new(0.0, -1.0)), Some(Cardinal::Up));
        assert_eq!(Cardinal::from_direction(Vec2::new(0.0, 1.0)), Some(Cardinal::Down));
    }

    #[test]
    fn diagonals() {
        let d = Vec2::new(1.0, -1.0).normalized();
        assert_eq!(Cardinal::from_direction(d), Some(Cardinal::UpRight));
        let d = Vec2::new(-1.0, 1.0).normalized();
        assert_eq!(Cardinal::from_direction(d), Some(Cardinal::DownLeft));
    }

    #[test]
    fn near_axis_snaps_to_cardinal() {
        // 10 degrees off +x is still "right" (threshold is 22.5).
        let d = Vec2::from_angle_rad(10f64.to_radians());
        assert_eq!(Cardinal::from_direction(d), Some(Cardinal::Right));
        // 30 degrees off is a diagonal.
        let d = Vec2::from_angle_rad(30f64.to_radians());
        assert_eq!(Cardinal::from_direction(d), Some(Cardinal::DownRight));
    }

    #[test]
    fn zero_vector_has_no_heading() {
        assert_eq!(Cardinal::from_direction(Vec2::ZERO), None);
    }
}
