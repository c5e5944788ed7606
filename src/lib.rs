//! Kinematic electron-diffraction patterns from CIF files.
//!
//! Parse a CIF, expand its symmetry, build direct and reciprocal lattices,
//! evaluate unit-weight structure factors and project them onto a zone axis.
//! A viewing direction can be mapped back to the Miller index of the plane it
//! looks down.

pub mod config;
pub mod errors;
pub mod io;
pub mod model;
pub mod physics;
pub mod pipeline;
pub mod rendering;
pub mod state;
pub mod utils;

pub use config::Config;
pub use errors::{CifError, LatticeError, PipelineError, SymmetryError};
pub use pipeline::{MessageSink, PatternSink, Pipeline, SceneSink, Severity};
