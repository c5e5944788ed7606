// src/io/mod.rs
pub mod cif;
pub mod cif_blocks;

use crate::errors::CifError;
use crate::model::ParsedCrystal;
use std::fs;
use std::path::Path;

/// Read a CIF file from disk and parse it.
pub fn load_structure(path: impl AsRef<Path>) -> Result<ParsedCrystal, CifError> {
    let text = fs::read_to_string(path.as_ref())?;
    cif::parse(&text)
}
