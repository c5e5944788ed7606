// src/errors.rs

//! Error types shared across the pipeline stages.

/// Fatal CIF failures: no usable crystal can be built.
#[derive(Debug, thiserror::Error)]
pub enum CifError {
    #[error("No _atom_site_ loop found in file")]
    AtomSiteLoopMissing,

    #[error("Atom site loop has no fractional coordinate columns (_atom_site_fract_x/y/z)")]
    FractionalColumnsMissing,

    #[error("Atom site loop contains no usable rows")]
    NoAtomRows,

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

/// A symmetry operation string that is not three affine expressions in x, y, z.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SymmetryError {
    #[error("Expected 3 comma-separated components, found {0}")]
    ComponentCount(usize),

    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),

    #[error("Non-affine term: product of two coordinate variables")]
    NonAffineProduct,

    #[error("Non-affine term: division by a coordinate variable")]
    DivisionByVariable,

    #[error("Division by zero")]
    DivisionByZero,
}

/// Geometry failures detected while building direct or reciprocal vectors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LatticeError {
    #[error("Cell length {0} is missing")]
    MissingCellLength(&'static str),

    #[error("Cell length {name} = {value} must be positive")]
    InvalidCellLength { name: &'static str, value: f64 },

    #[error("Cell angle {name} = {value} must lie strictly between 0 and 180 degrees")]
    InvalidCellAngle { name: &'static str, value: f64 },

    #[error("Inconsistent cell angles: negative radicand {0:.3e} for c_w")]
    NegativeRadicand(f64),

    #[error("Degenerate cell: volume {0:.3e} is numerically zero")]
    DegenerateVolume(f64),
}

/// Why a viewing direction could not be turned into a Miller index.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error("Reciprocal basis matrix is singular")]
    SingularBasis,

    #[error("Resolved components {0:?} are out of integer range")]
    IndexOverflow([f64; 3]),
}

/// Anything the orchestrator may have to report.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Parse failed: {0}")]
    Parse(#[from] CifError),

    #[error("Lattice error: {0}")]
    Lattice(#[from] LatticeError),

    #[error("Cannot resolve view direction: {0}")]
    Resolve(#[from] ResolveError),

    #[error("No crystal loaded")]
    NoCrystal,

    #[error("Render error: {0}")]
    Render(String),
}
