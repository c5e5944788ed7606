pub mod export;
pub mod scene;

// Re-export the sinks so the binary only needs one import path
pub use export::{JsonSceneSink, SvgPatternSink};
pub use scene::{build_point_groups, CameraDirective, PointGroup};
