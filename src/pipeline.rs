// src/pipeline.rs
//
// Orchestration: text -> crystal -> lattice -> |F| -> projection -> sinks.
// Every failure ends up as a message; nothing is returned to the caller as an error.

use crate::config::Config;
use crate::errors::PipelineError;
use crate::io::{self, cif};
use crate::model::miller::MillerIndex;
use crate::model::ParsedCrystal;
use crate::physics::lattice::LatticeVectors;
use crate::physics::projection::{self, DiffractionPattern, ProjectionSettings};
use crate::physics::resolver;
use crate::physics::structure_factor::{compute_structure_factors, IndexRange};
use crate::rendering::scene::{build_point_groups, CameraDirective, PointGroup};
use crate::state::{Crystal, Debouncer, Generation, Session, Snapshot};
use crate::utils::linalg::Vec3;
use std::fmt;
use std::path::Path;
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Success => "success",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

/// Human-readable status output.
pub trait MessageSink {
    fn report(&mut self, severity: Severity, message: &str);
}

/// 3D viewer: point groups plus where to put the camera.
pub trait SceneSink {
    fn show_scene(&mut self, groups: &[PointGroup], camera: CameraDirective) -> Result<(), PipelineError>;
}

/// 2D scatter plot of the projected spots.
pub trait PatternSink {
    fn show_pattern(&mut self, pattern: &DiffractionPattern) -> Result<(), PipelineError>;
}

impl<T: SceneSink> SceneSink for Option<T> {
    fn show_scene(&mut self, groups: &[PointGroup], camera: CameraDirective) -> Result<(), PipelineError> {
        match self {
            Some(sink) => sink.show_scene(groups, camera),
            None => Ok(()),
        }
    }
}

impl<T: PatternSink> PatternSink for Option<T> {
    fn show_pattern(&mut self, pattern: &DiffractionPattern) -> Result<(), PipelineError> {
        match self {
            Some(sink) => sink.show_pattern(pattern),
            None => Ok(()),
        }
    }
}

/// Fan a pattern out to two sinks. Both are always called; the first error wins.
impl<A: PatternSink, B: PatternSink> PatternSink for (A, B) {
    fn show_pattern(&mut self, pattern: &DiffractionPattern) -> Result<(), PipelineError> {
        let first = self.0.show_pattern(pattern);
        let second = self.1.show_pattern(pattern);
        first.and(second)
    }
}

/// Forwards messages to the `log` facade.
#[derive(Debug, Default)]
pub struct LogSink;

impl MessageSink for LogSink {
    fn report(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Success => log::info!("✔ {}", message),
            Severity::Info => log::info!("{}", message),
            Severity::Warning => log::warn!("{}", message),
            Severity::Error => log::error!("{}", message),
        }
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct MessageLog {
    pub entries: Vec<(Severity, String)>,
}

impl MessageLog {
    pub fn count(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|(s, _)| *s == severity).count()
    }

    pub fn last(&self) -> Option<&(Severity, String)> {
        self.entries.last()
    }
}

impl MessageSink for MessageLog {
    fn report(&mut self, severity: Severity, message: &str) {
        self.entries.push((severity, message.to_string()));
    }
}

#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub index_range: IndexRange,
    pub projection: ProjectionSettings,
    pub camera_distance: f64,
    pub default_plane: String,
}

impl From<&Config> for PipelineSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            index_range: cfg.index_range(),
            projection: cfg.projection_settings(),
            camera_distance: cfg.camera_distance,
            default_plane: cfg.default_plane.clone(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// A projection bound to the crystal generation it was started from.
/// `run` only touches the snapshot and is `Send`.
#[derive(Clone, Debug)]
pub struct ProjectionJob {
    snapshot: Snapshot,
    plane: MillerIndex,
    settings: ProjectionSettings,
    camera_distance: f64,
}

#[derive(Clone, Debug)]
pub struct ProjectionResult {
    pub generation: Generation,
    pub pattern: DiffractionPattern,
    pub groups: Vec<PointGroup>,
    pub camera: CameraDirective,
}

impl ProjectionJob {
    pub fn generation(&self) -> Generation {
        self.snapshot.generation
    }

    pub fn run(self) -> ProjectionResult {
        let crystal = &self.snapshot.crystal;
        let pattern = projection::project(
            self.plane,
            &crystal.lattice.reciprocal,
            &crystal.structure_factors,
            &self.settings,
        );
        let groups = build_point_groups(&crystal.parsed.atoms, &crystal.lattice.direct);
        let camera = CameraDirective::along(&pattern.basis.normal, self.camera_distance);
        ProjectionResult { generation: self.snapshot.generation, pattern, groups, camera }
    }
}

pub struct Pipeline<M: MessageSink, S: SceneSink, P: PatternSink> {
    settings: PipelineSettings,
    session: Session,
    view_events: Debouncer<Vec3>,
    plane: MillerIndex,
    messages: M,
    scene: S,
    patterns: P,
}

impl<M: MessageSink, S: SceneSink, P: PatternSink> Pipeline<M, S, P> {
    pub fn new(config: &Config, messages: M, scene: S, patterns: P) -> Self {
        Self {
            settings: PipelineSettings::from(config),
            session: Session::new(),
            view_events: Debouncer::new(config.debounce()),
            plane: projection::DEFAULT_PLANE,
            messages,
            scene,
            patterns,
        }
    }

    pub fn messages(&self) -> &M {
        &self.messages
    }

    pub fn scene_sink(&self) -> &S {
        &self.scene
    }

    pub fn pattern_sink(&self) -> &P {
        &self.patterns
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Zone axis of the last applied projection.
    pub fn plane(&self) -> MillerIndex {
        self.plane
    }

    /// Read and process a file. I/O failures are reported like parse failures.
    pub fn load_file(&mut self, path: &Path) -> bool {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        match io::load_structure(path) {
            Ok(parsed) => self.install_parsed(parsed, &name),
            Err(e) => {
                let err = PipelineError::from(e);
                self.messages.report(Severity::Error, &format!("{}: {}", path.display(), err));
                false
            }
        }
    }

    /// Parse, build the lattice, compute structure factors, install, and render
    /// the configured default plane. Returns whether a new crystal was installed.
    pub fn load_text(&mut self, text: &str, source: &str) -> bool {
        match cif::parse(text) {
            Ok(parsed) => self.install_parsed(parsed, source),
            Err(e) => {
                self.messages.report(Severity::Error, &format!("{}: {}", source, PipelineError::from(e)));
                false
            }
        }
    }

    fn install_parsed(&mut self, parsed: ParsedCrystal, source: &str) -> bool {
        let crystal = match build_crystal(parsed, source, &self.settings.index_range) {
            Ok(c) => c,
            Err(e) => {
                self.messages.report(Severity::Error, &format!("{}: {}", source, e));
                return false;
            }
        };

        for w in &crystal.parsed.warnings {
            self.messages.report(Severity::Warning, w);
        }

        let summary = format!(
            "Loaded {}: {} atoms ({} sites × {} ops), space group {}, {} reflections",
            source,
            crystal.parsed.atoms.len(),
            crystal.parsed.generators.len(),
            crystal.parsed.symmetry_ops.len(),
            crystal.parsed.space_group_name,
            crystal.structure_factors.len()
        );
        let generation = self.session.install(crystal);
        log::debug!("Installed crystal generation {:?}", generation);
        self.messages.report(Severity::Success, &summary);

        let default_plane = self.settings.default_plane.clone();
        self.request_plane(&default_plane);
        true
    }

    /// Project onto a user-entered plane. Invalid input falls back to (1,0,0).
    pub fn request_plane(&mut self, input: &str) {
        let (plane, warning) = projection::plane_or_default(input);
        if let Some(w) = warning {
            self.messages.report(Severity::Warning, &w);
        }
        if let Some(job) = self.prepare_projection(plane) {
            let result = job.run();
            self.apply_projection(result);
        }
    }

    /// Freeze the current crystal and settings into a job.
    pub fn prepare_projection(&mut self, plane: MillerIndex) -> Option<ProjectionJob> {
        match self.session.snapshot() {
            Some(snapshot) => Some(ProjectionJob {
                snapshot,
                plane,
                settings: self.settings.projection,
                camera_distance: self.settings.camera_distance,
            }),
            None => {
                self.messages.report(Severity::Error, &PipelineError::NoCrystal.to_string());
                None
            }
        }
    }

    /// Hand a finished projection to the sinks, unless a newer crystal has been
    /// installed since it started. Returns whether it was applied.
    pub fn apply_projection(&mut self, result: ProjectionResult) -> bool {
        if !self.session.is_current(result.generation) {
            log::debug!(
                "Discarding stale projection (generation {:?}, current {:?})",
                result.generation,
                self.session.generation()
            );
            return false;
        }

        for w in &result.pattern.warnings {
            self.messages.report(Severity::Warning, w);
        }
        self.plane = result.pattern.zone_axis;

        let mut ok = true;
        if let Err(e) = self.scene.show_scene(&result.groups, result.camera) {
            self.messages.report(Severity::Error, &e.to_string());
            ok = false;
        }
        if let Err(e) = self.patterns.show_pattern(&result.pattern) {
            self.messages.report(Severity::Error, &e.to_string());
            ok = false;
        }
        if ok {
            self.messages.report(
                Severity::Success,
                &format!("{}: {} spots", result.pattern.title, result.pattern.spots.len()),
            );
        }
        true
    }

    /// Record a viewing-direction event; it is acted on by `tick` once the
    /// direction has been stable for the debounce interval.
    pub fn view_direction_changed(&mut self, view: Vec3, now: Instant) {
        self.view_events.push(view, now);
    }

    /// Process a settled viewing direction, if any. Returns the resolved plane.
    pub fn tick(&mut self, now: Instant) -> Option<MillerIndex> {
        let view = self.view_events.poll(now)?;
        self.apply_view(view)
    }

    /// Process the pending viewing direction without waiting.
    pub fn flush_view(&mut self) -> Option<MillerIndex> {
        let view = self.view_events.flush()?;
        self.apply_view(view)
    }

    fn apply_view(&mut self, view: Vec3) -> Option<MillerIndex> {
        let lattice = match self.session.crystal() {
            Some(c) => c.lattice,
            None => {
                self.messages.report(Severity::Error, &PipelineError::NoCrystal.to_string());
                return None;
            }
        };

        match resolver::resolve(&view, &lattice) {
            Ok(hkl) if hkl.is_zero() => {
                self.messages.report(
                    Severity::Warning,
                    &format!("View direction does not define a plane, keeping [{}]", self.plane),
                );
                None
            }
            Ok(hkl) => {
                self.messages.report(Severity::Info, &format!("View direction resolved to [{}]", hkl));
                self.request_plane(&hkl.to_string());
                Some(hkl)
            }
            Err(e) => {
                log::warn!("View direction {:?} not resolved: {}", view, e);
                self.messages.report(Severity::Error, &PipelineError::from(e).to_string());
                None
            }
        }
    }
}

/// Derive everything a projection needs from a parsed file. Stops at the first fatal stage.
pub fn build_crystal(parsed: ParsedCrystal, source: &str, range: &IndexRange) -> Result<Crystal, PipelineError> {
    let cell = parsed.cell_parameters()?;
    let lattice = LatticeVectors::from_cell(&cell)?;
    let structure_factors = compute_structure_factors(&parsed.atoms, &lattice.reciprocal, range);
    Ok(Crystal { source: source.to_string(), parsed, lattice, structure_factors })
}
