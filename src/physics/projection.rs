// src/physics/projection.rs
use crate::model::miller::MillerIndex;
use crate::physics::lattice::ReciprocalLattice;
use crate::physics::structure_factor::StructureFactors;
use crate::utils::linalg::{cross, dot, normalize, Vec3};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PLANE: MillerIndex = MillerIndex { h: 1, k: 0, l: 0 };

/// Plot range used by the 2D renderer on both axes.
pub const AXIS_RANGE: (f64, f64) = (-1.0, 1.0);

/// In-plane axes and unit normal of the projection plane.
///
/// y = normalize(seed × n), x = normalize(n × y), seed = x̂ unless |n_x| ≥ 0.9, then ŷ.
/// The axes jump when n crosses the seed-switch cone; that discontinuity is accepted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectionBasis {
    pub x_axis: Vec3,
    pub y_axis: Vec3,
    pub normal: Vec3,
}

impl ProjectionBasis {
    pub fn from_normal(direction: &Vec3) -> Option<Self> {
        let normal = normalize(direction)?;
        let seed = if normal.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
        let y_axis = normalize(&cross(&seed, &normal))?;
        let x_axis = normalize(&cross(&normal, &y_axis))?;
        Some(Self { x_axis, y_axis, normal })
    }

    /// (x, y, depth) coordinates of `v` in this basis.
    pub fn project(&self, v: &Vec3) -> (f64, f64, f64) {
        (dot(v, &self.x_axis), dot(v, &self.y_axis), dot(v, &self.normal))
    }
}

/// Marker size = min + (max - min) · (|F| / |F|max)^exponent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerScale {
    pub min_size: f64,
    pub max_size: f64,
    pub exponent: f64,
}

impl Default for MarkerScale {
    fn default() -> Self {
        Self { min_size: 2.0, max_size: 12.0, exponent: 0.5 }
    }
}

impl MarkerScale {
    pub fn size(&self, magnitude: f64, max_magnitude: f64) -> f64 {
        if max_magnitude <= 0.0 {
            return self.min_size;
        }
        let ratio = (magnitude / max_magnitude).clamp(0.0, 1.0);
        self.min_size + (self.max_size - self.min_size) * ratio.powf(self.exponent.max(1e-6))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSettings {
    /// Spots at or below this |F| are dropped (the direct beam only needs |F| > 0).
    pub epsilon: f64,
    pub marker: MarkerScale,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self { epsilon: 1e-3, marker: MarkerScale::default() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiffractionSpot {
    pub hkl: MillerIndex,
    pub x: f64,
    pub y: f64,
    /// Component along the plane normal.
    pub depth: f64,
    pub magnitude: f64,
    pub size: f64,
}

impl DiffractionSpot {
    pub fn label(&self) -> String {
        format!("({} {} {})", self.hkl.h, self.hkl.k, self.hkl.l)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DiffractionPattern {
    pub zone_axis: MillerIndex,
    pub basis: ProjectionBasis,
    pub spots: Vec<DiffractionSpot>,
    pub title: String,
    pub axis_range: (f64, f64),
    pub warnings: Vec<String>,
}

/// Three integers, comma/space separated ("1,1,0", "1 -1 0") or concatenated single
/// digits ("110", "-110"). Brackets are ignored. All-zero is rejected.
pub fn parse_plane(input: &str) -> Option<MillerIndex> {
    let cleaned: String = input
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | '<' | '>'))
        .collect();
    let cleaned = cleaned.trim();

    let values: Vec<i32> = if cleaned.contains(',') || cleaned.contains(char::is_whitespace) {
        let parts: Vec<&str> = cleaned
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();
        parts.iter().map(|s| s.parse::<i32>().ok()).collect::<Option<Vec<_>>>()?
    } else {
        let mut out = Vec::new();
        let mut sign = 1;
        let mut pending_sign = false;
        for c in cleaned.chars() {
            match c {
                '-' | '+' if !pending_sign => {
                    sign = if c == '-' { -1 } else { 1 };
                    pending_sign = true;
                }
                d if d.is_ascii_digit() => {
                    out.push(sign * d.to_digit(10)? as i32);
                    sign = 1;
                    pending_sign = false;
                }
                _ => return None,
            }
        }
        if pending_sign {
            return None;
        }
        out
    };

    match values.as_slice() {
        [h, k, l] => {
            let plane = MillerIndex::new(*h, *k, *l);
            if plane.is_zero() { None } else { Some(plane) }
        }
        _ => None,
    }
}

/// Parse user input, falling back to (1,0,0) with a warning.
pub fn plane_or_default(input: &str) -> (MillerIndex, Option<String>) {
    match parse_plane(input) {
        Some(plane) => (plane, None),
        None => {
            let msg = format!("Invalid plane '{}', using {}", input.trim(), DEFAULT_PLANE);
            log::warn!("{}", msg);
            (DEFAULT_PLANE, Some(msg))
        }
    }
}

/// Project every reciprocal lattice point with a known |F| onto the plane normal to G(plane).
pub fn project(
    plane: MillerIndex,
    reciprocal: &ReciprocalLattice,
    structure_factors: &StructureFactors,
    settings: &ProjectionSettings,
) -> DiffractionPattern {
    let mut warnings = Vec::new();

    let (zone_axis, basis) = match ProjectionBasis::from_normal(&reciprocal.g_vector(plane)) {
        Some(basis) if !plane.is_zero() => (plane, basis),
        _ => {
            let msg = format!("Plane {} has no reciprocal direction, using {}", plane, DEFAULT_PLANE);
            log::warn!("{}", msg);
            warnings.push(msg);
            let basis = ProjectionBasis::from_normal(&reciprocal.g_vector(DEFAULT_PLANE))
                .unwrap_or(ProjectionBasis { x_axis: Vec3::y(), y_axis: -Vec3::z(), normal: Vec3::x() });
            (DEFAULT_PLANE, basis)
        }
    };

    let kept: Vec<(MillerIndex, f64)> = structure_factors
        .iter()
        .filter(|(hkl, f)| if hkl.is_zero() { *f > 0.0 } else { *f > settings.epsilon })
        .collect();
    let max_magnitude = kept.iter().map(|(_, f)| *f).fold(0.0, f64::max);

    let spots = kept
        .into_iter()
        .map(|(hkl, magnitude)| {
            let (x, y, depth) = basis.project(&reciprocal.g_vector(hkl));
            DiffractionSpot {
                hkl,
                x,
                y,
                depth,
                magnitude,
                size: settings.marker.size(magnitude, max_magnitude),
            }
        })
        .collect::<Vec<_>>();

    log::debug!("Projected {} spots along [{}]", spots.len(), zone_axis);

    DiffractionPattern {
        zone_axis,
        basis,
        spots,
        title: format!("Zone axis [{}]", zone_axis),
        axis_range: AXIS_RANGE,
        warnings,
    }
}

/// `parse_plane` + `project`, with the invalid-input warning carried on the pattern.
pub fn project_str(
    input: &str,
    reciprocal: &ReciprocalLattice,
    structure_factors: &StructureFactors,
    settings: &ProjectionSettings,
) -> DiffractionPattern {
    let (plane, warning) = plane_or_default(input);
    let mut pattern = project(plane, reciprocal, structure_factors, settings);
    if let Some(w) = warning {
        pattern.warnings.insert(0, w);
    }
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::structure::{AtomSite, CellParameters};
    use crate::physics::lattice::LatticeVectors;
    use crate::physics::structure_factor::{compute_structure_factors, IndexRange};

    fn cubic() -> ReciprocalLattice {
        LatticeVectors::from_cell(&CellParameters::cubic(5.0)).unwrap().reciprocal
    }

    fn atoms(positions: &[[f64; 3]]) -> Vec<AtomSite> {
        positions
            .iter()
            .map(|p| AtomSite { label: "Cu".into(), element: "Cu".into(), position: *p })
            .collect()
    }

    #[test]
    fn test_parse_plane_forms() {
        assert_eq!(parse_plane("1,1,0"), Some(MillerIndex::new(1, 1, 0)));
        assert_eq!(parse_plane(" 1 -1 2 "), Some(MillerIndex::new(1, -1, 2)));
        assert_eq!(parse_plane("(1, 0, 12)"), Some(MillerIndex::new(1, 0, 12)));
        assert_eq!(parse_plane("110"), Some(MillerIndex::new(1, 1, 0)));
        assert_eq!(parse_plane("[-110]"), Some(MillerIndex::new(-1, 1, 0)));
        assert_eq!(parse_plane("abc"), None);
        assert_eq!(parse_plane("1,1"), None);
        assert_eq!(parse_plane("0,0,0"), None);
        assert_eq!(parse_plane("1--10"), None);
        assert_eq!(parse_plane(""), None);
    }

    #[test]
    fn test_basis_orthonormal() {
        for n in [Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 2.0, -0.5)] {
            let b = ProjectionBasis::from_normal(&n).unwrap();
            assert!((b.x_axis.norm() - 1.0).abs() < 1e-12);
            assert!((b.y_axis.norm() - 1.0).abs() < 1e-12);
            assert!(dot(&b.x_axis, &b.y_axis).abs() < 1e-12);
            assert!(dot(&b.x_axis, &b.normal).abs() < 1e-12);
            assert!(dot(&b.y_axis, &b.normal).abs() < 1e-12);
            // Fixed orientation convention: x × y = -n.
            assert!((cross(&b.x_axis, &b.y_axis) + b.normal).norm() < 1e-12);
        }
        assert!(ProjectionBasis::from_normal(&Vec3::zeros()).is_none());
    }

    #[test]
    fn test_project_cubic_100() {
        let recip = cubic();
        let sf = compute_structure_factors(&atoms(&[[0.0; 3]]), &recip, &IndexRange::Fixed { h: 1, k: 1, l: 1 });
        let pattern = project(MillerIndex::new(1, 0, 0), &recip, &sf, &ProjectionSettings::default());
        assert_eq!(pattern.zone_axis, MillerIndex::new(1, 0, 0));
        assert_eq!(pattern.spots.len(), 27);
        assert_eq!(pattern.axis_range, (-1.0, 1.0));

        let spot = pattern.spots.iter().find(|s| s.hkl == MillerIndex::new(0, 1, 0)).unwrap();
        assert!((spot.x - 0.2).abs() < 1e-12);
        assert!(spot.y.abs() < 1e-12);
        assert!(spot.depth.abs() < 1e-12);

        let along = pattern.spots.iter().find(|s| s.hkl == MillerIndex::new(1, 0, 0)).unwrap();
        assert!((along.depth - 0.2).abs() < 1e-12);
        assert!(along.x.abs() < 1e-12 && along.y.abs() < 1e-12);
    }

    #[test]
    fn test_extinct_spots_filtered_origin_kept() {
        let recip = cubic();
        let fcc = atoms(&[[0.0, 0.0, 0.0], [0.5, 0.5, 0.0], [0.5, 0.0, 0.5], [0.0, 0.5, 0.5]]);
        let sf = compute_structure_factors(&fcc, &recip, &IndexRange::Fixed { h: 2, k: 2, l: 2 });
        let pattern = project(MillerIndex::new(0, 0, 1), &recip, &sf, &ProjectionSettings::default());
        assert!(pattern.spots.iter().any(|s| s.hkl.is_zero()));
        assert!(pattern.spots.iter().all(|s| s.hkl != MillerIndex::new(1, 0, 0)));
        assert!(pattern.spots.iter().any(|s| s.hkl == MillerIndex::new(1, 1, 1)));
    }

    #[test]
    fn test_invalid_plane_string_defaults() {
        let recip = cubic();
        let sf = compute_structure_factors(&atoms(&[[0.0; 3]]), &recip, &IndexRange::Fixed { h: 1, k: 1, l: 1 });
        let pattern = project_str("abc", &recip, &sf, &ProjectionSettings::default());
        assert_eq!(pattern.zone_axis, DEFAULT_PLANE);
        assert!(pattern.title.contains("1,0,0"));
        assert_eq!(pattern.warnings.len(), 1);
        assert!(!pattern.spots.is_empty());
    }

    #[test]
    fn test_zero_plane_defaults() {
        let recip = cubic();
        let sf = StructureFactors::default();
        let pattern = project(MillerIndex::ZERO, &recip, &sf, &ProjectionSettings::default());
        assert_eq!(pattern.zone_axis, DEFAULT_PLANE);
        assert_eq!(pattern.warnings.len(), 1);
        assert!(pattern.spots.is_empty());
    }

    #[test]
    fn test_marker_size_monotonic_and_deterministic() {
        let scale = MarkerScale::default();
        let mut last = f64::MIN;
        for i in 0..=10 {
            let s = scale.size(i as f64, 10.0);
            assert!(s >= last);
            last = s;
        }
        assert_eq!(scale.size(10.0, 10.0), scale.max_size);
        assert_eq!(scale.size(0.0, 0.0), scale.min_size);

        let recip = cubic();
        let basis = atoms(&[[0.0, 0.0, 0.0], [0.25, 0.25, 0.25]]);
        let sf = compute_structure_factors(&basis, &recip, &IndexRange::Fixed { h: 2, k: 2, l: 2 });
        let first = project(MillerIndex::new(1, 1, 0), &recip, &sf, &ProjectionSettings::default());
        let second = project(MillerIndex::new(1, 1, 0), &recip, &sf, &ProjectionSettings::default());
        assert_eq!(first, second);
        for a in &first.spots {
            for b in &first.spots {
                if a.magnitude > b.magnitude {
                    assert!(a.size >= b.size);
                }
            }
        }
    }
}
