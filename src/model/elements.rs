// src/model/elements.rs
use serde::{Deserialize, Serialize};

/// Display style for one element: covalent radius (Å) and CPK colour.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementStyle {
    pub radius: f64,
    pub color: (f64, f64, f64),
}

/// Neutral grey used for symbols missing from the table (and the "X" placeholder).
pub const GENERIC_STYLE: ElementStyle = ElementStyle { radius: 1.0, color: (0.6, 0.6, 0.6) };

/// Radii are covalent radii. Colors are standard CPK.
pub fn element_style(element: &str) -> ElementStyle {
    let (radius, color) = match element {
        // --- Period 1 ---
        "H"  => (0.37, (1.00, 1.00, 1.00)),
        "He" => (0.32, (0.85, 1.00, 1.00)),

        // --- Period 2 ---
        "Li" => (1.34, (0.80, 0.50, 1.00)),
        "Be" => (0.90, (0.76, 1.00, 0.00)),
        "B"  => (0.82, (1.00, 0.70, 0.70)),
        "C"  => (0.77, (0.20, 0.20, 0.20)),
        "N"  => (0.75, (0.19, 0.31, 0.97)),
        "O"  => (0.73, (1.00, 0.05, 0.05)),
        "F"  => (0.71, (0.56, 0.88, 0.31)),

        // --- Period 3 ---
        "Na" => (1.54, (0.67, 0.36, 0.95)),
        "Mg" => (1.30, (0.54, 1.00, 0.00)),
        "Al" => (1.18, (0.75, 0.65, 0.65)),
        "Si" => (1.11, (0.94, 0.78, 0.63)),
        "P"  => (1.06, (1.00, 0.50, 0.00)),
        "S"  => (1.02, (1.00, 1.00, 0.19)),
        "Cl" => (0.99, (0.12, 0.94, 0.12)),

        // --- Period 4 ---
        "K"  => (1.96, (0.56, 0.25, 0.83)),
        "Ca" => (1.74, (0.24, 1.00, 0.00)),
        "Ti" => (1.36, (0.75, 0.76, 0.78)),
        "Fe" => (1.25, (0.88, 0.40, 0.20)),
        "Ni" => (1.21, (0.31, 0.82, 0.31)),
        "Cu" => (1.38, (0.78, 0.50, 0.20)),
        "Zn" => (1.31, (0.49, 0.50, 0.69)),
        "Ga" => (1.26, (0.76, 0.56, 0.56)),
        "Ge" => (1.22, (0.40, 0.56, 0.56)),
        "As" => (1.19, (0.74, 0.50, 0.89)),
        "Se" => (1.16, (1.00, 0.63, 0.00)),

        // --- Period 5/6 (common thermoelectric and noble metals) ---
        "Ag" => (1.53, (0.75, 0.75, 0.75)),
        "Sn" => (1.41, (0.40, 0.50, 0.50)),
        "Sb" => (1.38, (0.62, 0.39, 0.71)),
        "Te" => (1.35, (0.83, 0.48, 0.00)),
        "Au" => (1.44, (1.00, 0.82, 0.14)),
        "Pb" => (1.47, (0.34, 0.35, 0.38)),
        "Bi" => (1.46, (0.62, 0.31, 0.71)),

        _ => return GENERIC_STYLE,
    };
    ElementStyle { radius, color }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_elements() {
        assert_eq!(element_style("O").color, (1.00, 0.05, 0.05));
        assert_eq!(element_style("X"), GENERIC_STYLE);
        assert_eq!(element_style("Unobtainium"), GENERIC_STYLE);
    }
}
