// src/io/cif.rs

use crate::errors::CifError;
use crate::io::cif_blocks::{split_row, Document, Table, TableSchema, SYMMETRY_OP_TAGS};
use crate::model::structure::{wrap_unit, AtomSite, ChemicalComposition, PartialCell, ParsedCrystal};
use crate::model::symmetry::SymmetryOperation;
use regex::Regex;
use std::sync::OnceLock;

const HM_TAGS: [&str; 3] = [
    "_space_group_name_h-m_alt",
    "_symmetry_space_group_name_h-m",
    "_space_group_name_h-m",
];
const HALL_TAGS: [&str; 2] = ["_space_group_name_hall", "_symmetry_space_group_name_hall"];
const SG_NUMBER_TAGS: [&str; 2] = ["_space_group_it_number", "_symmetry_int_tables_number"];
const FORMULA_TAGS: [&str; 2] = ["_chemical_formula_structural", "_chemical_formula_sum"];

const LABEL_TAG: &str = "_atom_site_label";
const TYPE_SYMBOL_TAG: &str = "_atom_site_type_symbol";
const FRACT_TAGS: [&str; 3] = ["_atom_site_fract_x", "_atom_site_fract_y", "_atom_site_fract_z"];

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)(?:\(\d+\))?$").expect("valid number regex")
    })
}

fn element_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z][a-z]?)").expect("valid element regex"))
}

fn formula_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([A-Z][a-z]?)\s*(\d+(?:\.\d+)?|\.\d+)?").expect("valid formula regex"))
}

/// Collects recoverable problems, logging each one as it is found.
#[derive(Default)]
struct Warnings(Vec<String>);

impl Warnings {
    fn push(&mut self, msg: String) {
        log::warn!("{}", msg);
        self.0.push(msg);
    }
}

/// Parse CIF text into a crystal with symmetry-expanded atom positions.
///
/// Only a missing atom-site loop, missing fractional columns, or zero usable atom rows
/// are fatal. Everything else degrades with a warning.
pub fn parse(text: &str) -> Result<ParsedCrystal, CifError> {
    let doc = Document::parse(text);
    let mut warnings = Warnings::default();

    // 1. Space group
    let space_group_name = match doc.item_any(&HM_TAGS).or_else(|| doc.item_any(&HALL_TAGS)) {
        Some(name) if !is_null(name) => name.trim().to_string(),
        _ => {
            warnings.push("Space group name not found, using N/A".to_string());
            "N/A".to_string()
        }
    };
    let space_group_number = doc
        .item_any(&SG_NUMBER_TAGS)
        .and_then(|n| n.trim().parse::<u32>().ok());

    // 2. Composition
    let composition = match doc.item_any(&FORMULA_TAGS) {
        Some(formula) => parse_formula(formula),
        None => ChemicalComposition::default(),
    };
    if composition.is_empty() {
        warnings.push("Chemical formula not found, element labels fall back to site labels".to_string());
    }

    // 3. Cell
    let cell = parse_cell(&doc, &mut warnings);

    // 4. Atom-site table
    let atom_table = locate_atom_table(&doc)?;
    let fract_cols = [
        atom_table.column(FRACT_TAGS[0]),
        atom_table.column(FRACT_TAGS[1]),
        atom_table.column(FRACT_TAGS[2]),
    ];
    let [Some(ix), Some(iy), Some(iz)] = fract_cols else {
        return Err(CifError::FractionalColumnsMissing);
    };

    // 5. Symmetry operations, only from tables before the atom-site table
    let symmetry_ops = parse_symmetry_ops(&doc, atom_table.ordinal, &mut warnings);

    // 6. Generator rows
    let label_col = atom_table.column(LABEL_TAG);
    if label_col.is_none() {
        warnings.push("No _atom_site_label column, using first token of each row as label".to_string());
    }
    let type_col = atom_table.column(TYPE_SYMBOL_TAG);
    let primary = composition.primary_elements();

    let mut generators = Vec::new();
    for row in &atom_table.rows {
        let tokens = split_row(row);
        let coords = (
            tokens.get(ix).and_then(|t| parse_cif_number(t)),
            tokens.get(iy).and_then(|t| parse_cif_number(t)),
            tokens.get(iz).and_then(|t| parse_cif_number(t)),
        );
        let (Some(x), Some(y), Some(z)) = coords else {
            warnings.push(format!("Skipping atom row '{}': missing or non-numeric coordinates", row));
            continue;
        };

        let label = label_col
            .and_then(|i| tokens.get(i))
            .or_else(|| tokens.first())
            .cloned()
            .unwrap_or_default();

        let element = type_col
            .and_then(|i| tokens.get(i))
            .and_then(|t| element_from_label(t))
            .or_else(|| element_from_label(&label))
            .or_else(|| recover_element(&label, &primary));
        let element = match element {
            Some(el) => el,
            None => {
                warnings.push(format!("Could not derive element for site '{}', using X", label));
                "X".to_string()
            }
        };

        generators.push(AtomSite { label, element, position: [x, y, z] });
    }

    if generators.is_empty() {
        return Err(CifError::NoAtomRows);
    }

    // 7. Expansion
    let atoms = expand(&generators, &symmetry_ops, &mut warnings);

    log::info!(
        "Parsed {} generator sites x {} symmetry operations -> {} atoms",
        generators.len(),
        symmetry_ops.len(),
        atoms.len()
    );

    Ok(ParsedCrystal {
        cell,
        composition,
        space_group_name,
        space_group_number,
        symmetry_ops,
        generators,
        atoms,
        warnings: warnings.0,
    })
}

/// Every generator under every operation, wrapped into [0, 1). Duplicates are kept.
fn expand(generators: &[AtomSite], ops: &[SymmetryOperation], warnings: &mut Warnings) -> Vec<AtomSite> {
    let mut atoms = Vec::with_capacity(generators.len() * ops.len());
    for site in generators {
        for op in ops {
            let p = op.apply(site.position);
            if p.iter().any(|v| !v.is_finite()) {
                warnings.push(format!("Symmetry operation '{}' failed on site '{}', skipped", op, site.label));
                continue;
            }
            atoms.push(AtomSite {
                label: site.label.clone(),
                element: site.element.clone(),
                position: [wrap_unit(p[0]), wrap_unit(p[1]), wrap_unit(p[2])],
            });
        }
    }
    atoms
}

fn parse_cell(doc: &Document, warnings: &mut Warnings) -> PartialCell {
    let mut read = |tag: &str, is_angle: bool| -> Option<f64> {
        let value = doc.item(tag).and_then(parse_cif_number);
        if value.is_none() {
            if is_angle {
                warnings.push(format!("{} not found, assuming 90 degrees", tag));
            } else {
                warnings.push(format!("{} not found", tag));
            }
        }
        value
    };

    PartialCell {
        a: read("_cell_length_a", false),
        b: read("_cell_length_b", false),
        c: read("_cell_length_c", false),
        alpha: read("_cell_angle_alpha", true),
        beta: read("_cell_angle_beta", true),
        gamma: read("_cell_angle_gamma", true),
    }
}

fn locate_atom_table(doc: &Document) -> Result<&Table, CifError> {
    let mut candidates = doc.tables_matching(TableSchema::AtomSites).peekable();
    if candidates.peek().is_none() {
        return Err(CifError::AtomSiteLoopMissing);
    }
    candidates
        .find(|t| t.column(FRACT_TAGS[0]).is_some())
        .ok_or(CifError::FractionalColumnsMissing)
}

fn parse_symmetry_ops(doc: &Document, atom_table_ordinal: usize, warnings: &mut Warnings) -> Vec<SymmetryOperation> {
    let mut ops = Vec::new();

    match doc.find_table(TableSchema::SymmetryOperations, Some(atom_table_ordinal)) {
        Some(table) => {
            // Schema match guarantees one of the tags is present.
            let col = table.column_any(&SYMMETRY_OP_TAGS).unwrap_or(0);
            for row in &table.rows {
                let tokens = split_row(row);
                // Unquoted operations containing spaces spill into extra tokens.
                let surplus = tokens.len().saturating_sub(table.tags.len());
                let end = (col + 1 + surplus).min(tokens.len());
                if col >= end {
                    warnings.push(format!("Symmetry row '{}' has no operation column, skipped", row));
                    continue;
                }
                let op_text = tokens[col..end].join(" ");
                match SymmetryOperation::parse(&op_text) {
                    Ok(op) => ops.push(op),
                    Err(e) => warnings.push(format!("Skipping symmetry operation '{}': {}", op_text, e)),
                }
            }
        }
        None => warnings.push("No symmetry operation loop found, using identity x,y,z".to_string()),
    }

    if ops.is_empty() {
        if doc.find_table(TableSchema::SymmetryOperations, Some(atom_table_ordinal)).is_some() {
            warnings.push("Symmetry loop yielded no usable operations, using identity x,y,z".to_string());
        }
        ops.push(SymmetryOperation::identity());
    }
    ops
}

/// Number with an optional trailing uncertainty: "5.431(2)" -> 5.431.
pub fn parse_cif_number(s: &str) -> Option<f64> {
    let caps = number_re().captures(s.trim())?;
    caps.get(1)?.as_str().parse().ok()
}

/// Leading capital plus optional lowercase letter: "Te1" -> "Te".
pub fn element_from_label(label: &str) -> Option<String> {
    element_re()
        .captures(label.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn recover_element(label: &str, primary: &[&str]) -> Option<String> {
    let lower = label.to_lowercase();
    primary
        .iter()
        .find(|el| lower.contains(&el.to_lowercase()))
        .map(|el| el.to_string())
}

/// Structural formula to (element, count) pairs in encounter order.
pub fn parse_formula(formula: &str) -> ChemicalComposition {
    let pairs = formula_re()
        .captures_iter(formula)
        .filter_map(|caps| {
            let el = caps.get(1)?.as_str().to_string();
            let count = match caps.get(2) {
                Some(m) => m.as_str().parse().ok()?,
                None => 1.0,
            };
            Some((el, count))
        })
        .collect();
    ChemicalComposition(pairs)
}

fn is_null(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v == "?" || v == "."
}
