// src/utils/linalg.rs

use nalgebra::{Matrix3, Vector3};

pub type Vec3 = Vector3<f64>;
pub type Mat3 = Matrix3<f64>;

/// Below this norm a vector has no usable direction.
pub const NORM_EPS: f64 = 1e-12;

pub fn dot(a: &Vec3, b: &Vec3) -> f64 {
  a.dot(b)
}

pub fn cross(a: &Vec3, b: &Vec3) -> Vec3 {
  a.cross(b)
}

/// Unit vector along `v`, or `None` for a (numerically) zero vector.
pub fn normalize(v: &Vec3) -> Option<Vec3> {
  let n = v.norm();
  if !n.is_finite() || n < NORM_EPS {
    return None;
  }
  Some(v / n)
}

pub fn mat_mul(a: &Mat3, b: &Mat3) -> Mat3 {
  a * b
}

/// Inverse of a 3x3 matrix.
///
/// The determinant is compared against the product of the column norms, so the
/// singularity test does not depend on the length units of the basis.
pub fn inverse(m: &Mat3) -> Option<Mat3> {
  let scale = m.column(0).norm() * m.column(1).norm() * m.column(2).norm();
  let det = m.determinant();
  if !det.is_finite() || scale < NORM_EPS || det.abs() < 1e-10 * scale {
    return None;
  }
  m.try_inverse()
}

/// Matrix whose columns are `a`, `b`, `c`.
pub fn from_columns(a: &Vec3, b: &Vec3, c: &Vec3) -> Mat3 {
  Mat3::from_columns(&[*a, *b, *c])
}

/// Convert fractional coordinates to Cartesian using the direct basis
///
/// # Formula
/// ```text
/// Cartesian = x·a + y·b + z·c
/// ```
pub fn frac_to_cart(frac: [f64; 3], basis: [Vec3; 3]) -> Vec3 {
  basis[0] * frac[0] + basis[1] * frac[1] + basis[2] * frac[2]
}

/// Convert Cartesian coordinates to fractional, or `None` if the basis is singular
///
/// # Formula
/// ```text
/// Fractional = [a b c]^-1 × Cartesian
/// ```
pub fn cart_to_frac(cart: &Vec3, basis: [Vec3; 3]) -> Option<[f64; 3]> {
  let inv = inverse(&from_columns(&basis[0], &basis[1], &basis[2]))?;
  let f = inv * cart;
  Some([f.x, f.y, f.z])
}
