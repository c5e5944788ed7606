// src/physics/lattice.rs
use crate::errors::LatticeError;
use crate::model::miller::MillerIndex;
use crate::model::structure::CellParameters;
use crate::utils::linalg::{cross, dot, from_columns, Mat3, Vec3};

/// Cell edge vectors in Cartesian Å.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectLattice {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

/// Dual basis in Å⁻¹, a_i · a*_j = δ_ij (no 2π factor).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReciprocalLattice {
    pub a_star: Vec3,
    pub b_star: Vec3,
    pub c_star: Vec3,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatticeVectors {
    pub direct: DirectLattice,
    pub reciprocal: ReciprocalLattice,
}

impl DirectLattice {
    pub fn basis(&self) -> [Vec3; 3] {
        [self.a, self.b, self.c]
    }

    /// a · (b × c)
    pub fn volume(&self) -> f64 {
        dot(&self.a, &cross(&self.b, &self.c))
    }
}

impl ReciprocalLattice {
    pub fn basis(&self) -> [Vec3; 3] {
        [self.a_star, self.b_star, self.c_star]
    }

    /// Columns a*, b*, c*.
    pub fn matrix(&self) -> Mat3 {
        from_columns(&self.a_star, &self.b_star, &self.c_star)
    }

    /// G = h·a* + k·b* + l·c*
    pub fn g_vector(&self, hkl: MillerIndex) -> Vec3 {
        self.a_star * hkl.h as f64 + self.b_star * hkl.k as f64 + self.c_star * hkl.l as f64
    }
}

impl LatticeVectors {
    pub fn from_cell(cell: &CellParameters) -> Result<Self, LatticeError> {
        let direct = direct_vectors(cell)?;
        let reciprocal = reciprocal_vectors(&direct)?;
        Ok(Self { direct, reciprocal })
    }
}

/// cos of an angle in degrees, exact zero at 90°.
fn cos_deg(angle: f64) -> f64 {
    if (angle - 90.0).abs() < 1e-12 {
        0.0
    } else {
        angle.to_radians().cos()
    }
}

fn sin_deg(angle: f64) -> f64 {
    if (angle - 90.0).abs() < 1e-12 {
        1.0
    } else {
        angle.to_radians().sin()
    }
}

fn check_length(name: &'static str, value: f64) -> Result<(), LatticeError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(LatticeError::InvalidCellLength { name, value })
    }
}

fn check_angle(name: &'static str, value: f64) -> Result<(), LatticeError> {
    if value.is_finite() && value > 0.0 && value < 180.0 {
        Ok(())
    } else {
        Err(LatticeError::InvalidCellAngle { name, value })
    }
}

/// Cells whose squared normalised volume falls below this are flat.
const VOLUME_FACTOR_EPS: f64 = 1e-10;

/// Direct bases with V / (|a||b||c|) below this are flat.
const VOLUME_RATIO_EPS: f64 = 1e-6;

/// General triclinic frame: a along x, b in the xy-plane at γ from a.
pub fn direct_vectors(cell: &CellParameters) -> Result<DirectLattice, LatticeError> {
    check_length("a", cell.a)?;
    check_length("b", cell.b)?;
    check_length("c", cell.c)?;
    check_angle("alpha", cell.alpha)?;
    check_angle("beta", cell.beta)?;
    check_angle("gamma", cell.gamma)?;

    let (cos_a, cos_b, cos_g) = (cos_deg(cell.alpha), cos_deg(cell.beta), cos_deg(cell.gamma));
    let sin_g = sin_deg(cell.gamma);

    // (V / abc)², free of the cell size.
    let volume_factor = 1.0 - cos_a * cos_a - cos_b * cos_b - cos_g * cos_g + 2.0 * cos_a * cos_b * cos_g;

    let c_u = cell.c * cos_b;
    let c_v = cell.c * (cos_a - cos_b * cos_g) / sin_g;
    let radicand = cell.c * cell.c - c_u * c_u - c_v * c_v;

    if volume_factor < -VOLUME_FACTOR_EPS {
        return Err(LatticeError::NegativeRadicand(radicand));
    }
    if volume_factor <= VOLUME_FACTOR_EPS {
        let volume = cell.a * cell.b * cell.c * volume_factor.max(0.0).sqrt();
        return Err(LatticeError::DegenerateVolume(volume));
    }
    let c_w = radicand.max(0.0).sqrt();

    Ok(DirectLattice {
        a: Vec3::new(cell.a, 0.0, 0.0),
        b: Vec3::new(cell.b * cos_g, cell.b * sin_g, 0.0),
        c: Vec3::new(c_u, c_v, c_w),
    })
}

/// a* = (b×c)/V, b* = (c×a)/V, c* = (a×b)/V.
pub fn reciprocal_vectors(direct: &DirectLattice) -> Result<ReciprocalLattice, LatticeError> {
    let volume = direct.volume();
    let scale = direct.a.norm() * direct.b.norm() * direct.c.norm();
    if !volume.is_finite() || volume.abs() <= VOLUME_RATIO_EPS * scale {
        return Err(LatticeError::DegenerateVolume(volume));
    }

    let inv_vol = 1.0 / volume;
    Ok(ReciprocalLattice {
        a_star: cross(&direct.b, &direct.c) * inv_vol,
        b_star: cross(&direct.c, &direct.a) * inv_vol,
        c_star: cross(&direct.a, &direct.b) * inv_vol,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_dual(cell: CellParameters) {
        let lv = LatticeVectors::from_cell(&cell).unwrap();
        let direct = lv.direct.basis();
        let recip = lv.reciprocal.basis();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                let got = dot(&direct[i], &recip[j]);
                assert!((got - expected).abs() < 1e-9, "a{}·a*{} = {} for {:?}", i, j, got, cell);
            }
        }
    }

    #[test]
    fn test_cubic_vectors() {
        let lv = LatticeVectors::from_cell(&CellParameters::cubic(5.0)).unwrap();
        assert_eq!(lv.direct.a, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(lv.direct.b, Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(lv.direct.c, Vec3::new(0.0, 0.0, 5.0));
        assert!((lv.reciprocal.a_star - Vec3::new(0.2, 0.0, 0.0)).norm() < 1e-15);
        assert!((lv.reciprocal.b_star - Vec3::new(0.0, 0.2, 0.0)).norm() < 1e-15);
        assert!((lv.reciprocal.c_star - Vec3::new(0.0, 0.0, 0.2)).norm() < 1e-15);
    }

    #[test]
    fn test_reciprocal_orthonormality() {
        assert_dual(CellParameters::cubic(5.0));
        assert_dual(CellParameters::new(5.0, 6.0, 7.0, 90.0, 100.0, 90.0));
        assert_dual(CellParameters::new(4.2, 4.2, 30.5, 90.0, 90.0, 120.0));
        assert_dual(CellParameters::new(5.1, 6.3, 7.7, 78.0, 102.5, 113.0));
    }

    #[test]
    fn test_volume_positive() {
        let cells = [
            CellParameters::cubic(3.0),
            CellParameters::new(5.0, 6.0, 7.0, 90.0, 100.0, 90.0),
            CellParameters::new(5.1, 6.3, 7.7, 78.0, 102.5, 113.0),
        ];
        for cell in cells {
            let direct = direct_vectors(&cell).unwrap();
            assert!(direct.volume() > 0.0);
        }
        let v = direct_vectors(&CellParameters::cubic(2.0)).unwrap().volume();
        assert!((v - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_flat_cell_is_degenerate() {
        let cell = CellParameters::new(5.0, 5.0, 5.0, 120.0, 120.0, 120.0);
        match LatticeVectors::from_cell(&cell) {
            Err(LatticeError::DegenerateVolume(v)) => assert!(v.abs() < 1e-2),
            other => panic!("expected degenerate cell error, got {:?}", other),
        }
        // The same cell scaled up must not slip past the check.
        let big = CellParameters::new(500.0, 500.0, 500.0, 120.0, 120.0, 120.0);
        assert!(matches!(LatticeVectors::from_cell(&big), Err(LatticeError::DegenerateVolume(_))));
    }

    #[test]
    fn test_nearly_flat_cell_still_valid() {
        let cell = CellParameters::new(5.0, 5.0, 5.0, 119.0, 119.0, 119.0);
        let lv = LatticeVectors::from_cell(&cell).unwrap();
        assert!(lv.direct.volume() > 0.0);
        assert_dual(cell);
    }

    #[test]
    fn test_sliver_direct_basis_is_degenerate() {
        let direct = DirectLattice {
            a: Vec3::new(5.0, 0.0, 0.0),
            b: Vec3::new(0.0, 5.0, 0.0),
            c: Vec3::new(3.0, 4.0, 1e-9),
        };
        assert!(matches!(reciprocal_vectors(&direct), Err(LatticeError::DegenerateVolume(_))));
    }

    #[test]
    fn test_zero_volume_direct_basis() {
        let direct = DirectLattice {
            a: Vec3::new(1.0, 0.0, 0.0),
            b: Vec3::new(0.0, 1.0, 0.0),
            c: Vec3::new(1.0, 1.0, 0.0),
        };
        assert!(matches!(reciprocal_vectors(&direct), Err(LatticeError::DegenerateVolume(_))));
    }

    #[test]
    fn test_negative_radicand() {
        let cell = CellParameters::new(5.0, 5.0, 5.0, 130.0, 130.0, 130.0);
        assert!(matches!(direct_vectors(&cell), Err(LatticeError::NegativeRadicand(_))));
    }

    #[test]
    fn test_invalid_parameters() {
        let bad_len = CellParameters::new(0.0, 5.0, 5.0, 90.0, 90.0, 90.0);
        assert!(matches!(direct_vectors(&bad_len), Err(LatticeError::InvalidCellLength { name: "a", .. })));
        let bad_angle = CellParameters::new(5.0, 5.0, 5.0, 90.0, 180.0, 90.0);
        assert!(matches!(direct_vectors(&bad_angle), Err(LatticeError::InvalidCellAngle { name: "beta", .. })));
    }

    #[test]
    fn test_g_vector() {
        let lv = LatticeVectors::from_cell(&CellParameters::cubic(5.0)).unwrap();
        let g = lv.reciprocal.g_vector(MillerIndex::new(1, -2, 0));
        assert!((g - Vec3::new(0.2, -0.4, 0.0)).norm() < 1e-15);
    }
}
