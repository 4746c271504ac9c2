// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Double-precision math helpers for the push/pull constraint: a 3D vector and
//! a column-major 4×4 matrix with the inverse needed to move points between
//! world space and an object's parent space.
//!
//! All operations use `f64` so corrected positions match a host that stores
//! transforms in double precision.
#![forbid(unsafe_code)]

mod mat4;
mod vec3;

pub use mat4::Mat4;
pub use vec3::Vec3;

/// Degeneracy threshold shared by vector normalization and matrix inversion.
///
/// Vectors at or below this length have no usable direction; pivots at or
/// below this magnitude make a matrix singular.
pub const EPSILON: f64 = 1e-12;

