// src/physics/resolver.rs
//
// Viewing direction -> smallest integer Miller index.

use crate::errors::ResolveError;
use crate::model::miller::{reduce, MillerIndex};
use crate::physics::lattice::LatticeVectors;
use crate::utils::linalg::{inverse, normalize, Vec3};

/// Components below this are treated as exact zeros.
pub const SNAP_EPS: f64 = 1e-6;

/// Components smaller than this fraction of the largest one are treated as zeros.
pub const REL_SNAP: f64 = 1e-3;

/// Integer precision applied before the GCD reduction.
pub const SCALE: f64 = 1000.0;

/// Map a Cartesian direction onto reciprocal-space components and reduce to a
/// canonical coprime (h, k, l).
///
/// A zero direction resolves to `MillerIndex::ZERO` (undefined plane).
pub fn resolve(view: &Vec3, lattice: &LatticeVectors) -> Result<MillerIndex, ResolveError> {
    let m_inv = inverse(&lattice.reciprocal.matrix()).ok_or(ResolveError::SingularBasis)?;

    let Some(direction) = normalize(view) else {
        return Ok(MillerIndex::ZERO);
    };

    let continuous = m_inv * direction;
    let mut hkl = [continuous.x, continuous.y, continuous.z];
    if hkl.iter().any(|c| !c.is_finite()) {
        return Err(ResolveError::IndexOverflow(hkl));
    }

    let largest = hkl.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
    let threshold = SNAP_EPS.max(REL_SNAP * largest);
    for c in hkl.iter_mut() {
        if c.abs() < threshold {
            *c = 0.0;
        }
    }

    // Scale so the smallest nonzero component is 1; rounding then keeps exact ratios.
    let smallest = hkl.iter().map(|c| c.abs()).filter(|c| *c > 0.0).fold(f64::INFINITY, f64::min);
    if !smallest.is_finite() {
        return Ok(MillerIndex::ZERO);
    }

    let mut scaled = [0i64; 3];
    for (dst, c) in scaled.iter_mut().zip(hkl) {
        let v = (c / smallest * SCALE).round();
        if v.abs() > i64::MAX as f64 / 2.0 {
            return Err(ResolveError::IndexOverflow(hkl));
        }
        *dst = v as i64;
    }

    let Some([h, k, l]) = reduce(scaled) else {
        return Ok(MillerIndex::ZERO);
    };

    match (i32::try_from(h), i32::try_from(k), i32::try_from(l)) {
        (Ok(h), Ok(k), Ok(l)) => Ok(MillerIndex::new(h, k, l)),
        _ => Err(ResolveError::IndexOverflow(hkl)),
    }
}
