// src/model/structure.rs

use crate::errors::LatticeError;
use crate::model::symmetry::SymmetryOperation;
use serde::{Deserialize, Serialize};

/// Unit cell: lengths in Å, angles in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellParameters {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl CellParameters {
    pub fn new(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        Self { a, b, c, alpha, beta, gamma }
    }

    pub fn cubic(a: f64) -> Self {
        Self::new(a, a, a, 90.0, 90.0, 90.0)
    }
}

/// Cell values as found in the file. Any of them may be absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialCell {
    pub a: Option<f64>,
    pub b: Option<f64>,
    pub c: Option<f64>,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub gamma: Option<f64>,
}

impl PartialCell {
    /// Complete cell parameters. Missing lengths are fatal, missing angles are 90°.
    pub fn resolve(&self) -> Result<CellParameters, LatticeError> {
        let a = self.a.ok_or(LatticeError::MissingCellLength("a"))?;
        let b = self.b.ok_or(LatticeError::MissingCellLength("b"))?;
        let c = self.c.ok_or(LatticeError::MissingCellLength("c"))?;
        Ok(CellParameters {
            a,
            b,
            c,
            alpha: self.alpha.unwrap_or(90.0),
            beta: self.beta.unwrap_or(90.0),
            gamma: self.gamma.unwrap_or(90.0),
        })
    }
}

impl From<CellParameters> for PartialCell {
    fn from(cell: CellParameters) -> Self {
        Self {
            a: Some(cell.a),
            b: Some(cell.b),
            c: Some(cell.c),
            alpha: Some(cell.alpha),
            beta: Some(cell.beta),
            gamma: Some(cell.gamma),
        }
    }
}

/// (element, count) pairs in the order they appear in the formula.
/// Repeated symbols are kept as separate entries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChemicalComposition(pub Vec<(String, f64)>);

impl ChemicalComposition {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn elements(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(el, _)| el.as_str())
    }

    /// The first two symbols, used to recover elements from odd site labels.
    pub fn primary_elements(&self) -> Vec<&str> {
        self.elements().take(2).collect()
    }

    pub fn formula(&self) -> String {
        self.0
            .iter()
            .map(|(el, n)| {
                if (n - 1.0).abs() < 1e-9 {
                    el.clone()
                } else if n.fract().abs() < 1e-9 {
                    format!("{}{}", el, *n as i64)
                } else {
                    format!("{}{}", el, n)
                }
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// A site in fractional coordinates, each component in [0, 1).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AtomSite {
    pub label: String,
    pub element: String,
    pub position: [f64; 3],
}

/// Result of a successful CIF parse. Replaced wholesale on the next file.
#[derive(Clone, Debug)]
pub struct ParsedCrystal {
    pub cell: PartialCell,
    pub composition: ChemicalComposition,
    pub space_group_name: String,
    pub space_group_number: Option<u32>,
    pub symmetry_ops: Vec<SymmetryOperation>,
    /// Generator sites as read from the atom-site loop.
    pub generators: Vec<AtomSite>,
    /// Generators × symmetry operations, wrapped into the unit cell. Not deduplicated.
    pub atoms: Vec<AtomSite>,
    /// Recoverable problems found while parsing.
    pub warnings: Vec<String>,
}

impl Default for ParsedCrystal {
    fn default() -> Self {
        Self {
            cell: PartialCell::default(),
            composition: ChemicalComposition::default(),
            space_group_name: "N/A".to_string(),
            space_group_number: None,
            symmetry_ops: vec![SymmetryOperation::identity()],
            generators: Vec::new(),
            atoms: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl ParsedCrystal {
    pub fn cell_parameters(&self) -> Result<CellParameters, LatticeError> {
        self.cell.resolve()
    }
}

/// Wrap a fractional coordinate into [0, 1).
///
/// `rem_euclid` can return exactly 1.0 for tiny negative inputs, this form cannot.
pub fn wrap_unit(v: f64) -> f64 {
    ((v % 1.0) + 1.0) % 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_unit() {
        assert!((wrap_unit(1.3) - 0.3).abs() < 1e-12);
        assert!((wrap_unit(-0.25) - 0.75).abs() < 1e-12);
        assert_eq!(wrap_unit(1.0), 0.0);
        assert_eq!(wrap_unit(0.0), 0.0);
        let tiny = wrap_unit(-1e-17);
        assert!((0.0..1.0).contains(&tiny));
    }

    #[test]
    fn test_partial_cell_defaults_angles() {
        let partial = PartialCell { a: Some(3.0), b: Some(4.0), c: Some(5.0), ..Default::default() };
        let cell = partial.resolve().unwrap();
        assert_eq!(cell, CellParameters::new(3.0, 4.0, 5.0, 90.0, 90.0, 90.0));
    }

    #[test]
    fn test_partial_cell_missing_length() {
        let partial = PartialCell { a: Some(3.0), c: Some(5.0), ..Default::default() };
        assert_eq!(partial.resolve(), Err(LatticeError::MissingCellLength("b")));
    }

    #[test]
    fn test_formula_string() {
        let comp = ChemicalComposition(vec![
            ("Bi".to_string(), 2.0),
            ("Te".to_string(), 3.0),
            ("O".to_string(), 1.0),
            ("H".to_string(), 0.5),
        ]);
        assert_eq!(comp.formula(), "Bi2Te3OH0.5");
        assert_eq!(comp.primary_elements(), vec!["Bi", "Te"]);
    }
}
