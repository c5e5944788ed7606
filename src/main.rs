use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use strfac::config::Config;
use strfac::errors::PipelineError;
use strfac::physics::projection::DiffractionPattern;
use strfac::pipeline::{LogSink, PatternSink, Pipeline};
use strfac::rendering::{JsonSceneSink, SvgPatternSink};
use strfac::utils::linalg::Vec3;
use strfac::utils::{logger, report};

#[derive(Parser)]
#[command(name = "strfac")]
#[command(about = "Kinematic diffraction patterns and zone-axis projections from CIF files")]
#[command(version)]
struct Cli {
    /// CIF file to load
    file: PathBuf,

    /// Zone axis to project onto, e.g. "1,1,0" or "110"
    #[arg(short, long)]
    plane: Option<String>,

    /// Viewing direction "x,y,z" (Cartesian) to resolve into a plane; repeatable
    #[arg(long = "view", value_parser = parse_vector, allow_hyphen_values = true)]
    views: Vec<[f64; 3]>,

    /// Directory for SVG renderings of each pattern
    #[arg(long)]
    svg: Option<PathBuf>,

    /// File receiving the 3D point groups as JSON lines
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Settings file (default: the per-user config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the reciprocal-space radius (1/Å)
    #[arg(long)]
    q_max: Option<f64>,

    /// Number of spots listed per pattern
    #[arg(long, default_value = "15")]
    top: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_vector(s: &str) -> Result<[f64; 3], String> {
    let parts: Vec<f64> = s
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<f64>().map_err(|e| format!("'{}': {}", p, e)))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        [x, y, z] => Ok([*x, *y, *z]),
        _ => Err(format!("expected three components, got {}", parts.len())),
    }
}

/// Prints the strongest spots of every pattern to stdout.
struct ConsolePatternSink {
    limit: usize,
}

impl PatternSink for ConsolePatternSink {
    fn show_pattern(&mut self, pattern: &DiffractionPattern) -> Result<(), PipelineError> {
        println!("{}", report::pattern_summary(pattern, self.limit));
        Ok(())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    if let Err(e) = logger::init(level) {
        eprintln!("Logger already initialised: {}", e);
    }

    let (mut cfg, msg) = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    log::debug!("{}", msg);
    if let Some(q) = cli.q_max {
        cfg.q_max = q;
    }
    if let Some(plane) = &cli.plane {
        cfg.default_plane = plane.clone();
    }

    let scene = match &cli.scene {
        Some(path) => match JsonSceneSink::create(path) {
            Ok(sink) => Some(sink),
            Err(e) => {
                log::error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };
    let patterns = (ConsolePatternSink { limit: cli.top }, cli.svg.as_ref().map(|dir| SvgPatternSink::new(dir.clone())));

    let mut pipeline = Pipeline::new(&cfg, LogSink, scene, patterns);
    if !pipeline.load_file(&cli.file) {
        return ExitCode::FAILURE;
    }

    if let Some(crystal) = pipeline.session().crystal() {
        let name = cli.file.display().to_string();
        println!("{}", report::structure_summary(&crystal.parsed, Some(&crystal.lattice), &name));
    }

    for [x, y, z] in &cli.views {
        pipeline.view_direction_changed(Vec3::new(*x, *y, *z), Instant::now());
        pipeline.flush_view();
    }

    ExitCode::SUCCESS
}
