// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use core::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::EPSILON;

/// 3D vector used for positions and offsets.
///
/// * Components may represent either points or directions depending on the
///   calling context; the coordinate frame (world or parent space) is always
///   the caller's responsibility.
/// * Use [`crate::Mat4::transform_point`] for points (homogeneous `w = 1`) and
///   [`crate::Mat4::transform_direction`] for directions (homogeneous `w = 0`).
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Vec3 {
    data: [f64; 3],
}

impl Vec3 {
    /// The zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Unit vector pointing along the positive X axis.
    pub const UNIT_X: Self = Self::new(1.0, 0.0, 0.0);

    /// Unit vector pointing along the positive Y axis.
    pub const UNIT_Y: Self = Self::new(0.0, 1.0, 0.0);

    /// Unit vector pointing along the positive Z axis.
    pub const UNIT_Z: Self = Self::new(0.0, 0.0, 1.0);

    /// Creates a vector from components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { data: [x, y, z] }
    }

    /// Returns the components as an array.
    pub const fn to_array(self) -> [f64; 3] {
        self.data
    }

    /// X component.
    pub const fn x(&self) -> f64 {
        self.data[0]
    }

    /// Y component.
    pub const fn y(&self) -> f64 {
        self.data[1]
    }

    /// Z component.
    pub const fn z(&self) -> f64 {
        self.data[2]
    }

    pub(crate) const fn component(&self, idx: usize) -> f64 {
        self.data[idx]
    }

    /// Returns a copy with component `idx` (0 = X, 1 = Y, 2 = Z) replaced.
    ///
    /// Indices past 2 return `self` unchanged.
    pub fn with_component(self, idx: usize, value: f64) -> Self {
        let mut data = self.data;
        if let Some(slot) = data.get_mut(idx) {
            *slot = value;
        }
        Self { data }
    }

    /// Dot product with another vector.
    pub fn dot(&self, other: &Self) -> f64 {
        self.component(0) * other.component(0)
            + self.component(1) * other.component(1)
            + self.component(2) * other.component(2)
    }

    /// Largest absolute component; NaN components are ignored.
    fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0, |acc, c| acc.max(c.abs()))
    }

    /// Copy divided component-wise by `scale`.
    fn scaled_down(&self, scale: f64) -> Self {
        Self::new(self.x() / scale, self.y() / scale, self.z() / scale)
    }

    /// Vector length (magnitude).
    ///
    /// Components are scaled by the largest one first, so lengths near the
    /// limits of `f64` neither overflow nor flush to zero.
    pub fn length(&self) -> f64 {
        let scale = self.max_abs();
        if scale == 0.0 || !scale.is_finite() || !self.is_finite() {
            return self.dot(self).sqrt();
        }
        let unit = self.scaled_down(scale);
        scale * unit.dot(&unit).sqrt()
    }

    /// Euclidean distance between two points.
    pub fn distance(&self, other: &Self) -> f64 {
        (*self - *other).length()
    }

    /// Returns the unit vector in the same direction, or `None` when the
    /// length is ≤ [`EPSILON`] (no usable direction).
    pub fn try_normalize(&self) -> Option<Self> {
        let scale = self.max_abs();
        if scale == 0.0 || !scale.is_finite() || !self.is_finite() {
            return None;
        }
        let unit = self.scaled_down(scale);
        let len = unit.dot(&unit).sqrt();
        if scale * len <= EPSILON {
            return None;
        }
        Some(unit * (1.0 / len))
    }

    /// `true` when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|c| c.is_finite())
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(value: [f64; 3]) -> Self {
        Self { data: value }
    }
}

impl From<Vec3> for [f64; 3] {
    fn from(value: Vec3) -> Self {
        value.data
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x() + rhs.x(), self.y() + rhs.y(), self.z() + rhs.z())
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x() - rhs.x(), self.y() - rhs.y(), self.z() - rhs.z())
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.x() * rhs, self.y() * rhs, self.z() * rhs)
    }
}

impl Mul<Vec3> for f64 {
    type Output = Vec3;
    fn mul(self, rhs: Vec3) -> Self::Output {
        rhs * self
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self::Output {
        self * -1.0
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Vec3 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign<f64> for Vec3 {
    fn mul_assign(&mut self, rhs: f64) {
        *self = *self * rhs;
    }
}
