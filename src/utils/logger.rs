// src/utils/logger.rs

use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::sync::OnceLock;

static MAX_LEVEL: OnceLock<LevelFilter> = OnceLock::new();
static LOGGER: ConsoleLogger = ConsoleLogger;

struct ConsoleLogger;

/// Install the stderr logger. Fails if another logger is already set.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
  let _ = MAX_LEVEL.set(level);
  log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}

fn glyph(level: Level) -> &'static str {
  match level {
    Level::Error => "🔴",
    Level::Warn => "🟠",
    Level::Info => "🔵",
    Level::Debug => "⚪",
    Level::Trace => "▫️",
  }
}

/// "🟠  message", the line format written to stderr.
pub fn format_line(level: Level, message: &str) -> String {
  format!("{}  {}", glyph(level), message)
}

impl log::Log for ConsoleLogger {
  fn enabled(&self, metadata: &Metadata) -> bool {
    metadata.level() <= *MAX_LEVEL.get().unwrap_or(&LevelFilter::Info)
  }

  fn log(&self, record: &Record) {
    if self.enabled(record.metadata()) {
      let line = format_line(record.level(), &record.args().to_string());
      let _ = writeln!(std::io::stderr().lock(), "{}", line);
    }
  }

  fn flush(&self) {
    let _ = std::io::stderr().flush();
  }
}
