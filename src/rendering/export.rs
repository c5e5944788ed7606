use crate::errors::PipelineError;
use crate::physics::projection::DiffractionPattern;
use crate::pipeline::{PatternSink, SceneSink};
use super::scene::{CameraDirective, PointGroup};
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

// --- 2D pattern: SVG files ---

/// Writes every received pattern to `<dir>/zone_<h>_<k>_<l>.svg`.
pub struct SvgPatternSink {
    dir: PathBuf,
    size: (u32, u32),
    label_limit: usize,
    written: Vec<PathBuf>,
}

impl SvgPatternSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), size: (640, 640), label_limit: 40, written: Vec::new() }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn file_for(&self, pattern: &DiffractionPattern) -> PathBuf {
        let z = pattern.zone_axis;
        self.dir.join(format!("zone_{}_{}_{}.svg", z.h, z.k, z.l))
    }
}

impl PatternSink for SvgPatternSink {
    fn show_pattern(&mut self, pattern: &DiffractionPattern) -> Result<(), PipelineError> {
        let svg = render_svg(pattern, self.size, self.label_limit)?;
        fs::create_dir_all(&self.dir).map_err(|e| PipelineError::Render(e.to_string()))?;
        let path = self.file_for(pattern);
        fs::write(&path, svg).map_err(|e| PipelineError::Render(e.to_string()))?;
        log::info!("Pattern written to {:?}", path);
        self.written.push(path);
        Ok(())
    }
}

/// Render a pattern to an SVG document in memory.
pub fn render_svg(pattern: &DiffractionPattern, size: (u32, u32), label_limit: usize) -> Result<String, PipelineError> {
    let mut buffer = String::new();
    {
        let root = SVGBackend::with_string(&mut buffer, size).into_drawing_area();
        draw_pattern(&root, pattern, label_limit).map_err(|e| PipelineError::Render(e.to_string()))?;
    }
    Ok(buffer)
}

// Works on any plotters backend
fn draw_pattern<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    pattern: &DiffractionPattern,
    label_limit: usize,
) -> Result<(), Box<dyn std::error::Error>>
where DB::ErrorType: 'static {
    root.fill(&WHITE)?;

    let (lo, hi) = pattern.axis_range;
    let mut chart = ChartBuilder::on(root)
        .caption(&pattern.title, ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(lo..hi, lo..hi)?;

    chart.configure_mesh()
        .x_desc("x (1/Å)")
        .y_desc("y (1/Å)")
        .draw()?;

    let visible: Vec<_> = pattern.spots
        .iter()
        .filter(|s| s.x >= lo && s.x <= hi && s.y >= lo && s.y <= hi)
        .collect();

    chart.draw_series(visible.iter().map(|s| {
        Circle::new((s.x, s.y), s.size.round().max(1.0) as u32, BLUE.filled())
    }))?;

    // Label only the strongest spots, the rest would overlap
    let mut ranked = visible.clone();
    ranked.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude));
    chart.draw_series(ranked.iter().take(label_limit).map(|s| {
        Text::new(s.label(), (s.x, s.y), ("sans-serif", 10).into_font())
    }))?;

    root.present()?;
    Ok(())
}

// --- 3D scene: JSON ---

#[derive(Serialize)]
struct SceneDocument<'a> {
    groups: &'a [PointGroup],
    camera: CameraDirective,
}

/// Serializes each scene update as one JSON document per line.
pub struct JsonSceneSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonSceneSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonSceneSink<fs::File> {
    pub fn create(path: &Path) -> Result<Self, PipelineError> {
        let file = fs::File::create(path).map_err(|e| PipelineError::Render(e.to_string()))?;
        Ok(Self::new(file))
    }
}

impl<W: Write> SceneSink for JsonSceneSink<W> {
    fn show_scene(&mut self, groups: &[PointGroup], camera: CameraDirective) -> Result<(), PipelineError> {
        let doc = SceneDocument { groups, camera };
        serde_json::to_writer(&mut self.writer, &doc).map_err(|e| PipelineError::Render(e.to_string()))?;
        self.writer.write_all(b"\n").map_err(|e| PipelineError::Render(e.to_string()))?;
        Ok(())
    }
}
