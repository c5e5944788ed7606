// src/config.rs

use crate::physics::projection::{MarkerScale, ProjectionSettings};
use crate::physics::structure_factor::IndexRange;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

// --- Main Config Struct ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
  /// Radius of the reciprocal-space sphere sampled for structure factors (1/Å).
  pub q_max: f64,
  /// Upper bound on |h|, |k|, |l| for the sphere search.
  pub max_index: i32,
  /// Use a fixed ±h, ±k, ±l box instead of the sphere.
  pub fixed_range: Option<[i32; 3]>,

  pub spot_epsilon: f64,
  pub marker_min: f64,
  pub marker_max: f64,
  pub marker_exponent: f64,

  pub camera_distance: f64,
  pub debounce_ms: u64,
  pub default_plane: String,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      q_max: 1.0,
      max_index: 12,
      fixed_range: None,
      spot_epsilon: 1e-3,
      marker_min: 2.0,
      marker_max: 12.0,
      marker_exponent: 0.5,
      camera_distance: 2.0,
      debounce_ms: 200,
      default_plane: "1,0,0".to_string(),
    }
  }
}

impl Config {
  /// Loads config from standard OS location (e.g., ~/.config/strfac/settings.json)
  pub fn load() -> (Self, String) {
    let path = Self::get_path();
    if path.exists() {
      Self::load_from(&path)
    } else {
      (Self::default(), "No config found. Using defaults.".to_string())
    }
  }

  pub fn load_from(path: &Path) -> (Self, String) {
    match File::open(path) {
      Ok(file) => {
        let reader = BufReader::new(file);
        match serde_json::from_reader(reader) {
          Ok(cfg) => (cfg, format!("Config loaded from {:?}", path)),
          Err(e) => (Self::default(), format!("Error parsing config: {}", e)),
        }
      }
      Err(e) => (Self::default(), format!("Error opening config: {}", e)),
    }
  }

  /// Saves config to standard OS location
  pub fn save(&self) -> String {
    self.save_to(&Self::get_path())
  }

  pub fn save_to(&self, path: &Path) -> String {
    if let Some(parent) = path.parent() {
      let _ = fs::create_dir_all(parent);
    }

    match File::create(path) {
      Ok(file) => {
        let writer = BufWriter::new(file);
        match serde_json::to_writer_pretty(writer, self) {
          Ok(_) => format!("Config saved to {:?}", path),
          Err(e) => format!("Failed to save config: {}", e),
        }
      }
      Err(e) => format!("Could not create config file: {}", e),
    }
  }

  pub fn index_range(&self) -> IndexRange {
    match self.fixed_range {
      Some([h, k, l]) => IndexRange::Fixed { h, k, l },
      None => IndexRange::Sphere { q_max: self.q_max, max_index: self.max_index },
    }
  }

  pub fn projection_settings(&self) -> ProjectionSettings {
    ProjectionSettings {
      epsilon: self.spot_epsilon,
      marker: MarkerScale {
        min_size: self.marker_min,
        max_size: self.marker_max,
        exponent: self.marker_exponent,
      },
    }
  }

  pub fn debounce(&self) -> Duration {
    Duration::from_millis(self.debounce_ms)
  }

  fn get_path() -> PathBuf {
    if let Some(proj) = ProjectDirs::from("org", "strfac", "strfac") {
      proj.config_dir().join("settings.json")
    } else {
      PathBuf::from("settings.json")
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("settings.json");
    let cfg = Config { q_max: 1.5, fixed_range: Some([2, 2, 3]), ..Config::default() };
    let msg = cfg.save_to(&path);
    assert!(msg.starts_with("Config saved"), "{}", msg);

    let (loaded, msg) = Config::load_from(&path);
    assert!(msg.starts_with("Config loaded"), "{}", msg);
    assert_eq!(loaded, cfg);
    assert_eq!(loaded.index_range(), IndexRange::Fixed { h: 2, k: 2, l: 3 });
  }

  #[test]
  fn test_partial_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, r#"{ "q_max": 0.5 }"#).unwrap();
    let (cfg, _) = Config::load_from(&path);
    assert_eq!(cfg.q_max, 0.5);
    assert_eq!(cfg.max_index, 12);
    assert_eq!(cfg.index_range(), IndexRange::Sphere { q_max: 0.5, max_index: 12 });
  }

  #[test]
  fn test_bad_file_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, "not json").unwrap();
    let (cfg, msg) = Config::load_from(&path);
    assert_eq!(cfg, Config::default());
    assert!(msg.starts_with("Error parsing config"));

    let (cfg, msg) = Config::load_from(&dir.path().join("missing.json"));
    assert_eq!(cfg, Config::default());
    assert!(msg.starts_with("Error opening config"));
  }

  #[test]
  fn test_projection_settings() {
    let s = Config::default().projection_settings();
    assert_eq!(s.epsilon, 1e-3);
    assert_eq!(s.marker, MarkerScale::default());
    assert_eq!(Config::default().debounce(), Duration::from_millis(200));
  }
}
