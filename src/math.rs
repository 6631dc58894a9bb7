//! Minimal 3-vector arithmetic shared by the grid, the projectile ring and the
//! simulation core.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// Squared length below which a vector is treated as zero when normalizing.
pub const NORMALIZE_EPSILON_SQ: f32 = 1.0e-12;

/// 3D vector (x = forward, y = right, z = up in the host's convention).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Float3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Float3 {
    pub const ZERO: Float3 = Float3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const UP: Float3 = Float3 { x: 0.0, y: 0.0, z: 1.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn len2(self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.len2().sqrt()
    }

    #[inline]
    pub fn dot(self, other: Float3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Float3) -> Float3 {
        Float3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    #[inline]
    pub fn distance_squared(self, other: Float3) -> f32 {
        (self - other).len2()
    }

    /// Unit vector in the same direction, or zero for degenerate input.
    ///
    /// Never produces NaN: zero-length and non-finite vectors map to `ZERO`.
    pub fn normalized_or_zero(self) -> Float3 {
        let l2 = self.len2();
        if !(l2 > NORMALIZE_EPSILON_SQ) || !l2.is_finite() {
            return Float3::ZERO;
        }
        self * (1.0 / l2.sqrt())
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Float3 {
    type Output = Float3;
    #[inline]
    fn add(self, rhs: Float3) -> Float3 {
        Float3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Float3 {
    #[inline]
    fn add_assign(&mut self, rhs: Float3) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for Float3 {
    type Output = Float3;
    #[inline]
    fn sub(self, rhs: Float3) -> Float3 {
        Float3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Float3 {
    type Output = Float3;
    #[inline]
    fn mul(self, s: f32) -> Float3 {
        Float3::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Neg for Float3 {
    type Output = Float3;
    #[inline]
    fn neg(self) -> Float3 {
        Float3::new(-self.x, -self.y, -self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_zero_is_zero() {
        assert_eq!(Float3::ZERO.normalized_or_zero(), Float3::ZERO);
        let nan = Float3::new(f32::NAN, 0.0, 0.0);
        assert_eq!(nan.normalized_or_zero(), Float3::ZERO);
    }

    #[test]
    fn test_normalize_unit_length() {
        let n = Float3::new(3.0, 4.0, 0.0).normalized_or_zero();
        assert!((n.length() - 1.0).abs() < 1e-6);
        assert!((n.x - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_cross_right_handed_axes() {
        let right = Float3::UP.cross(Float3::new(1.0, 0.0, 0.0));
        assert_eq!(right, Float3::new(0.0, 1.0, 0.0));
    }
}
