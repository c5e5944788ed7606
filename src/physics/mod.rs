// src/physics/mod.rs
pub mod lattice;
pub mod projection;
pub mod resolver;
pub mod structure_factor;

pub use lattice::{DirectLattice, LatticeVectors, ReciprocalLattice};
pub use projection::{DiffractionPattern, DiffractionSpot, ProjectionBasis, ProjectionSettings};
pub use resolver::resolve;
pub use structure_factor::{compute_structure_factors, IndexRange, StructureFactors};
