// src/utils/report.rs

use crate::model::structure::ParsedCrystal;
use crate::physics::lattice::LatticeVectors;
use crate::physics::projection::DiffractionPattern;
use std::collections::HashMap;

/// Text block printed after a file is loaded
pub fn structure_summary(crystal: &ParsedCrystal, lattice: Option<&LatticeVectors>, filename: &str) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for atom in &crystal.atoms {
        *counts.entry(atom.element.as_str()).or_insert(0) += 1;
    }

    let mut parts: Vec<_> = counts.into_iter().collect();
    parts.sort_by(|a, b| a.0.cmp(b.0));

    let content_str: String = parts
        .iter()
        .map(|(el, count)| format!("{}{}", el, count))
        .collect::<Vec<_>>()
        .join(" ");

    let mut out = String::new();
    out.push_str(&format!("File: {}\n", filename));
    if !crystal.composition.is_empty() {
        out.push_str(&format!("Formula: {}\n", crystal.composition.formula()));
    }
    out.push_str(&format!("Cell content: {}\n", content_str));
    match crystal.space_group_number {
        Some(n) => out.push_str(&format!("Space group: {} (#{})\n", crystal.space_group_name, n)),
        None => out.push_str(&format!("Space group: {}\n", crystal.space_group_name)),
    }
    out.push_str(&format!(
        "Symmetry: {} operations, {} generator sites\n",
        crystal.symmetry_ops.len(),
        crystal.generators.len()
    ));

    if let Ok(cell) = crystal.cell_parameters() {
        out.push_str(&format!(
            "Cell: a={:.4} b={:.4} c={:.4}  α={:.2} β={:.2} γ={:.2}\n",
            cell.a, cell.b, cell.c, cell.alpha, cell.beta, cell.gamma
        ));
    }
    if let Some(lv) = lattice {
        out.push_str(&format!("Volume: {:.4} Å³\n", lv.direct.volume()));
    }

    out.push_str("--------------------------------------------------\n");
    out.push_str(&format!(
        "{:<8} {:<8} {:<8} {:<10} {:<10} {:<10}\n",
        "Index", "Label", "Element", "X", "Y", "Z"
    ));
    out.push_str("--------------------------------------------------\n");

    for (i, atom) in crystal.atoms.iter().take(20).enumerate() {
        out.push_str(&format!(
            "{:<8} {:<8} {:<8} {:<10.4} {:<10.4} {:<10.4}\n",
            i, atom.label, atom.element, atom.position[0], atom.position[1], atom.position[2]
        ));
    }

    if crystal.atoms.len() > 20 {
        out.push_str(&format!("... and {} more atoms.\n", crystal.atoms.len() - 20));
    }

    out
}

/// Strongest spots of a projected pattern, in-plane first (|depth| small).
pub fn pattern_summary(pattern: &DiffractionPattern, limit: usize) -> String {
    let mut spots: Vec<_> = pattern.spots.iter().collect();
    spots.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude).then(a.hkl.cmp(&b.hkl)));

    let mut out = String::new();
    out.push_str(&format!("{} ({} spots)\n", pattern.title, pattern.spots.len()));
    out.push_str(&format!(
        "{:<12} {:>9} {:>9} {:>9} {:>9}\n",
        "hkl", "x", "y", "depth", "|F|"
    ));
    for s in spots.iter().take(limit) {
        out.push_str(&format!(
            "{:<12} {:>9.4} {:>9.4} {:>9.4} {:>9.4}\n",
            s.label(), s.x, s.y, s.depth, s.magnitude
        ));
    }
    if spots.len() > limit {
        out.push_str(&format!("... and {} more spots.\n", spots.len() - limit));
    }
    out
}
