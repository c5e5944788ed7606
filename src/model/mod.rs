//src/model/mod.rs
pub mod elements;
pub mod miller;
pub mod structure;
pub mod symmetry;

// Re-exports for cleaner imports
pub use elements::{element_style, ElementStyle};
pub use miller::MillerIndex;
pub use structure::{AtomSite, CellParameters, ChemicalComposition, ParsedCrystal, PartialCell};
pub use symmetry::SymmetryOperation;
