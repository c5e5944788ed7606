// src/physics/structure_factor.rs
use crate::model::miller::MillerIndex;
use crate::model::structure::AtomSite;
use crate::physics::lattice::ReciprocalLattice;
use num_complex::Complex64;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::TAU;

/// How the (h, k, l) box is chosen.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum IndexRange {
    /// Symmetric box -h..=h, -k..=k, -l..=l.
    Fixed { h: i32, k: i32, l: i32 },
    /// Sphere of radius `q_max` (Å⁻¹): per-axis range ⌈q_max / |a*_i|⌉, capped at
    /// `max_index`, then clipped to |G| ≤ q_max.
    Sphere { q_max: f64, max_index: i32 },
}

impl Default for IndexRange {
    fn default() -> Self {
        IndexRange::Sphere { q_max: 1.0, max_index: 12 }
    }
}

/// Resolved per-axis extents plus the optional sphere clip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IndexBox {
    pub h: i32,
    pub k: i32,
    pub l: i32,
    pub q_max: Option<f64>,
}

impl IndexRange {
    pub fn resolve(&self, reciprocal: &ReciprocalLattice) -> IndexBox {
        match *self {
            IndexRange::Fixed { h, k, l } => IndexBox { h: h.abs(), k: k.abs(), l: l.abs(), q_max: None },
            IndexRange::Sphere { q_max, max_index } => {
                let q_max = q_max.abs();
                let cap = max_index.abs();
                let extent = |v: f64| -> i32 {
                    if v < 1e-12 {
                        return cap;
                    }
                    let n = (q_max / v - 1e-9).ceil().max(0.0);
                    if n.is_finite() { (n as i32).min(cap) } else { cap }
                };
                IndexBox {
                    h: extent(reciprocal.a_star.norm()),
                    k: extent(reciprocal.b_star.norm()),
                    l: extent(reciprocal.c_star.norm()),
                    q_max: Some(q_max),
                }
            }
        }
    }
}

impl IndexBox {
    /// All triples inside the box (and sphere, if any), origin always included.
    pub fn indices(&self, reciprocal: &ReciprocalLattice) -> Vec<MillerIndex> {
        let mut out = Vec::new();
        for h in -self.h..=self.h {
            for k in -self.k..=self.k {
                for l in -self.l..=self.l {
                    let hkl = MillerIndex::new(h, k, l);
                    if let Some(q_max) = self.q_max {
                        if !hkl.is_zero() && reciprocal.g_vector(hkl).norm() > q_max * (1.0 + 1e-9) {
                            continue;
                        }
                    }
                    out.push(hkl);
                }
            }
        }
        out
    }
}

/// |F(hkl)| keyed by index, ordered for deterministic iteration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StructureFactors {
    values: BTreeMap<MillerIndex, f64>,
}

impl StructureFactors {
    pub fn get(&self, hkl: MillerIndex) -> Option<f64> {
        self.values.get(&hkl).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MillerIndex, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn max_magnitude(&self) -> f64 {
        self.values.values().copied().fold(0.0, f64::max)
    }
}

/// F(hkl) = Σ exp(2πi(hx + ky + lz)), unit weight per atom.
///
/// Each phase is evaluated on |t| with the sine sign restored from t, so F(-h,-k,-l)
/// is the exact conjugate of F(h,k,l).
pub fn structure_factor(atoms: &[AtomSite], hkl: MillerIndex) -> Complex64 {
    let (h, k, l) = (hkl.h as f64, hkl.k as f64, hkl.l as f64);
    let mut sum = Complex64::new(0.0, 0.0);
    for atom in atoms {
        let p = atom.position;
        let t = TAU * (h * p[0] + k * p[1] + l * p[2]);
        let (s, c) = t.abs().sin_cos();
        sum += Complex64::new(c, if t < 0.0 { -s } else { s });
    }
    sum
}

/// |F| for every triple in the box. Each triple is independent, so the loop runs on rayon.
pub fn compute_structure_factors(
    atoms: &[AtomSite],
    reciprocal: &ReciprocalLattice,
    range: &IndexRange,
) -> StructureFactors {
    let bounds = range.resolve(reciprocal);
    let indices = bounds.indices(reciprocal);
    log::debug!(
        "Structure factors over ±{}×±{}×±{} ({} triples, {} atoms)",
        bounds.h,
        bounds.k,
        bounds.l,
        indices.len(),
        atoms.len()
    );

    let values: BTreeMap<MillerIndex, f64> = indices
        .par_iter()
        .map(|&hkl| (hkl, structure_factor(atoms, hkl).norm()))
        .collect();

    StructureFactors { values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::structure::CellParameters;
    use crate::physics::lattice::LatticeVectors;

    fn site(el: &str, position: [f64; 3]) -> AtomSite {
        AtomSite { label: el.to_string(), element: el.to_string(), position }
    }

    fn cubic_reciprocal() -> ReciprocalLattice {
        LatticeVectors::from_cell(&CellParameters::cubic(5.0)).unwrap().reciprocal
    }

    #[test]
    fn test_single_atom_unit_magnitude() {
        let atoms = vec![site("Na", [0.0, 0.0, 0.0])];
        let sf = compute_structure_factors(&atoms, &cubic_reciprocal(), &IndexRange::Fixed { h: 2, k: 2, l: 2 });
        assert_eq!(sf.len(), 125);
        assert!((sf.get(MillerIndex::new(0, 0, 0)).unwrap() - 1.0).abs() < 1e-12);
        assert!((sf.get(MillerIndex::new(1, 0, 0)).unwrap() - 1.0).abs() < 1e-12);
        assert!(sf.iter().all(|(_, f)| (f - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_friedel_pairs_exact() {
        let atoms = vec![
            site("Bi", [0.0, 0.0, 0.4009]),
            site("Te", [0.1234, 0.5, 0.2101]),
            site("Te", [0.3333, 0.6667, 0.7911]),
        ];
        let sf = compute_structure_factors(&atoms, &cubic_reciprocal(), &IndexRange::Fixed { h: 3, k: 3, l: 3 });
        for (hkl, f) in sf.iter() {
            assert_eq!(sf.get(hkl.negate()), Some(f), "Friedel pair broken at {}", hkl);
        }
    }

    #[test]
    fn test_fcc_extinctions() {
        let atoms = vec![
            site("Cu", [0.0, 0.0, 0.0]),
            site("Cu", [0.5, 0.5, 0.0]),
            site("Cu", [0.5, 0.0, 0.5]),
            site("Cu", [0.0, 0.5, 0.5]),
        ];
        assert!(structure_factor(&atoms, MillerIndex::new(1, 0, 0)).norm() < 1e-12);
        assert!(structure_factor(&atoms, MillerIndex::new(1, 1, 0)).norm() < 1e-12);
        assert!((structure_factor(&atoms, MillerIndex::new(1, 1, 1)).norm() - 4.0).abs() < 1e-12);
        assert!((structure_factor(&atoms, MillerIndex::new(2, 0, 0)).norm() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_sphere_bounds() {
        let recip = cubic_reciprocal();
        let range = IndexRange::Sphere { q_max: 1.0, max_index: 12 };
        let bounds = range.resolve(&recip);
        assert_eq!((bounds.h, bounds.k, bounds.l), (5, 5, 5));

        let indices = bounds.indices(&recip);
        assert!(indices.contains(&MillerIndex::new(5, 0, 0)));
        assert!(indices.contains(&MillerIndex::new(3, 4, 0)));
        assert!(!indices.contains(&MillerIndex::new(5, 5, 0)));
        assert!(indices.contains(&MillerIndex::ZERO));

        let capped = IndexRange::Sphere { q_max: 10.0, max_index: 3 }.resolve(&recip);
        assert_eq!((capped.h, capped.k, capped.l), (3, 3, 3));
    }

    #[test]
    fn test_anisotropic_cell_bounds() {
        let recip = LatticeVectors::from_cell(&CellParameters::new(2.0, 4.0, 10.0, 90.0, 90.0, 90.0))
            .unwrap()
            .reciprocal;
        let bounds = IndexRange::Sphere { q_max: 1.0, max_index: 20 }.resolve(&recip);
        assert_eq!((bounds.h, bounds.k, bounds.l), (2, 4, 10));
    }

    #[test]
    fn test_parallel_matches_direct_sum() {
        let atoms = vec![site("Ga", [0.0, 0.0, 0.0]), site("As", [0.25, 0.25, 0.25])];
        let sf = compute_structure_factors(&atoms, &cubic_reciprocal(), &IndexRange::Fixed { h: 2, k: 1, l: 1 });
        for (hkl, f) in sf.iter() {
            assert_eq!(f, structure_factor(&atoms, hkl).norm());
        }
    }
}
