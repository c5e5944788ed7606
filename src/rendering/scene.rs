// src/rendering/scene.rs

use crate::model::elements::element_style;
use crate::model::structure::AtomSite;
use crate::physics::lattice::DirectLattice;
use crate::utils::linalg::{frac_to_cart, normalize, Vec3};
use serde::Serialize;

// One trace per element for the 3D viewer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PointGroup {
  pub label: String,
  pub color: (f64, f64, f64),
  pub radius: f64,
  pub points: Vec<[f64; 3]>, // Cartesian Å
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CameraDirective {
  pub eye: [f64; 3],
  pub center: [f64; 3],
}

impl CameraDirective {
  /// Eye placed along the unit plane normal at `distance`, looking at the origin.
  pub fn along(normal: &Vec3, distance: f64) -> Self {
    let n = normalize(normal).unwrap_or_else(Vec3::z);
    let eye = n * distance;
    Self { eye: [eye.x, eye.y, eye.z], center: [0.0; 3] }
  }
}

/// Group expanded atoms by element (first-seen order) and convert to Cartesian.
pub fn build_point_groups(atoms: &[AtomSite], direct: &DirectLattice) -> Vec<PointGroup> {
  let basis = direct.basis();
  let mut groups: Vec<PointGroup> = Vec::new();

  for atom in atoms {
    let p = frac_to_cart(atom.position, basis);
    let point = [p.x, p.y, p.z];

    match groups.iter_mut().find(|g| g.label == atom.element) {
      Some(group) => group.points.push(point),
      None => {
        let style = element_style(&atom.element);
        groups.push(PointGroup {
          label: atom.element.clone(),
          color: style.color,
          radius: style.radius,
          points: vec![point],
        });
      }
    }
  }

  groups
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::structure::CellParameters;
  use crate::physics::lattice::LatticeVectors;

  fn site(el: &str, position: [f64; 3]) -> AtomSite {
    AtomSite { label: format!("{}1", el), element: el.to_string(), position }
  }

  #[test]
  fn test_groups_by_element() {
    let lv = LatticeVectors::from_cell(&CellParameters::cubic(5.0)).unwrap();
    let atoms = vec![
      site("Na", [0.0, 0.0, 0.0]),
      site("Cl", [0.5, 0.5, 0.5]),
      site("Na", [0.5, 0.5, 0.0]),
    ];
    let groups = build_point_groups(&atoms, &lv.direct);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].label, "Na");
    assert_eq!(groups[0].points, vec![[0.0, 0.0, 0.0], [2.5, 2.5, 0.0]]);
    assert_eq!(groups[1].label, "Cl");
    assert_eq!(groups[1].points, vec![[2.5, 2.5, 2.5]]);
  }

  #[test]
  fn test_camera_along_normal() {
    let cam = CameraDirective::along(&Vec3::new(0.0, 3.0, 0.0), 2.0);
    assert_eq!(cam.eye, [0.0, 2.0, 0.0]);
    let fallback = CameraDirective::along(&Vec3::zeros(), 2.0);
    assert_eq!(fallback.eye, [0.0, 0.0, 2.0]);
  }
}
