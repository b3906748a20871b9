//! Console logging for the pulse workspace
//!
//! ## Features
//!
//! - Leveled logging (debug, verbose, info, success, warn, error) with colored prefixes
//! - A level threshold read once from `BENTLEY_LEVEL`
//! - Multi-line message support with consistent formatting
//! - Timestamped event lines for run summaries
//! - Banner displays for command headers
//! - All output to stderr, so stdout stays clean for command results
//!
//! ## Usage
//!
//! Prefer the macros, which take `format!` arguments:
//!
//! ```
//! let rows = 42;
//! bentley::info!("ingesting {rows} rows");
//! bentley::event!(bentley::Level::Success, "ingestion finished");
//! ```

use chrono::Local;
use colored::*;
use std::sync::OnceLock;

/// Environment variable holding the minimum level that is printed
pub const LEVEL_ENV: &str = "BENTLEY_LEVEL";

/// Severity of a log line, ordered from chattiest to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
  Debug,
  Verbose,
  Info,
  Success,
  Warn,
  Error,
}

impl Level {
  /// Parse a level name, accepting a few common aliases
  pub fn parse(name: &str) -> Option<Level> {
    match name.trim().to_ascii_lowercase().as_str() {
      "debug" | "trace" => Some(Level::Debug),
      "verbose" | "verb" => Some(Level::Verbose),
      "info" => Some(Level::Info),
      "success" | "sccs" => Some(Level::Success),
      "warn" | "warning" => Some(Level::Warn),
      "error" | "err" => Some(Level::Error),
      _ => None,
    }
  }

  fn tag(self) -> &'static str {
    match self {
      Level::Debug => "debug",
      Level::Verbose => "verb",
      Level::Info => "info",
      Level::Success => "sccs",
      Level::Warn => "warn",
      Level::Error => "error",
    }
  }

  fn color(self) -> Color {
    match self {
      Level::Debug => Color::Magenta,
      Level::Verbose => Color::Cyan,
      Level::Info => Color::Blue,
      Level::Success => Color::Green,
      Level::Warn => Color::Yellow,
      Level::Error => Color::Red,
    }
  }
}

static THRESHOLD: OnceLock<Level> = OnceLock::new();

/// The minimum level that reaches stderr
pub fn threshold() -> Level {
  *THRESHOLD.get_or_init(|| {
    std::env::var(LEVEL_ENV).ok().and_then(|v| Level::parse(&v)).unwrap_or(Level::Info)
  })
}

/// Whether a message at `level` would currently be printed
pub fn enabled(level: Level) -> bool {
  passes(level, threshold())
}

fn passes(level: Level, threshold: Level) -> bool {
  level >= threshold
}

/// Core logging function that handles the actual output
pub fn log(message: &str) {
  for line in message.lines() {
    eprintln!("{line}");
  }
}

/// Format a colored, fixed-width prefix for a level
fn format_prefix(level: Level) -> String {
  let tag = level.tag();
  format!("[{}]{:<width$}", tag.color(level.color()).bold(), "", width = 7 - tag.len() - 2)
}

/// Render every line of `message` with the prefix for `level`
pub fn render(level: Level, message: &str) -> Vec<String> {
  let prefix = format_prefix(level);
  message.lines().map(|line| format!("{prefix} {line}")).collect()
}

/// Log a message at an explicit level
pub fn log_at(level: Level, message: &str) {
  if !enabled(level) {
    return;
  }
  for line in render(level, message) {
    log(&line);
  }
}

pub fn debug(message: &str) {
  log_at(Level::Debug, message);
}

pub fn verbose(message: &str) {
  log_at(Level::Verbose, message);
}

/// Info level logging - general information
pub fn info(message: &str) {
  log_at(Level::Info, message);
}

/// Success level logging - something completed successfully
pub fn success(message: &str) {
  log_at(Level::Success, message);
}

/// Warning level logging - something needs attention
pub fn warn(message: &str) {
  log_at(Level::Warn, message);
}

/// Error level logging - something went wrong
pub fn error(message: &str) {
  log_at(Level::Error, message);
}

/// Render a timestamped event line
pub fn render_event(level: Level, message: &str) -> Vec<String> {
  let timestamp = Local::now().format("%H:%M:%S").to_string();
  let prefix = format!("[{}] [{}]", "event".color(level.color()).bold(), timestamp.cyan());
  message.lines().map(|line| format!("{prefix} {line}")).collect()
}

/// Timestamped event, for summaries of long-running work
pub fn event(level: Level, message: &str) {
  if !enabled(level) {
    return;
  }
  for line in render_event(level, message) {
    log(&line);
  }
}

/// Create a banner line of the specified length and character
pub fn banner_line(length: usize, char: char) -> String {
  char.to_string().repeat(length)
}

/// Display a message with a banner around it
pub fn as_banner<F>(log_fn: F, message: &str, width: Option<usize>, border_char: Option<char>)
where
  F: Fn(&str),
{
  let width = width.unwrap_or(50);
  let border_char = border_char.unwrap_or('=');

  let banner = banner_line(width, border_char);

  log_fn(&banner);
  log_fn(message);
  log_fn(&banner);
}

/// Announcement banner for command headers
pub fn announce(message: &str) {
  as_banner(|msg| log(&msg.blue().bold().to_string()), message, Some(50), Some('-'));
}

/// Closing banner for a completed run
pub fn flourish(message: &str) {
  as_banner(|msg| log(&msg.green().bold().to_string()), message, Some(45), Some('~'));
}

#[macro_export]
macro_rules! debug {
  ($($arg:tt)*) => {
    $crate::debug(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! verbose {
  ($($arg:tt)*) => {
    $crate::verbose(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => {
    $crate::info(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => {
    $crate::success(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! warn {
  ($($arg:tt)*) => {
    $crate::warn(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => {
    $crate::error(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! event {
  ($level:expr, $($arg:tt)*) => {
    $crate::event($level, &format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_level_parse_accepts_aliases() {
    assert_eq!(Level::parse("WARNING"), Some(Level::Warn));
    assert_eq!(Level::parse(" trace "), Some(Level::Debug));
    assert_eq!(Level::parse("sccs"), Some(Level::Success));
    assert_eq!(Level::parse("loud"), None);
  }

  #[test]
  fn test_levels_are_ordered_by_severity() {
    assert!(Level::Debug < Level::Verbose);
    assert!(Level::Info < Level::Warn);
    assert!(Level::Warn < Level::Error);
  }

  #[test]
  fn test_errors_enabled_at_default_threshold() {
    assert!(enabled(Level::Error));
  }

  #[test]
  fn test_threshold_suppresses_lower_levels() {
    assert!(!passes(Level::Success, Level::Warn));
    assert!(!passes(Level::Warn, Level::Error));
    assert!(passes(Level::Error, Level::Error));
    assert!(passes(Level::Success, Level::Info));
    assert!(!passes(Level::Info, Level::Success));
  }

  #[test]
  fn test_render_prefixes_every_line() {
    colored::control::set_override(false);
    let lines = render(Level::Warn, "first\nsecond");
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "[warn]  first");
    assert_eq!(lines[1], "[warn]  second");
  }
}
