//! Tracing setup and on-disk diagnostics.
//!
//! Console output always goes to stdout. Crawl runs add a second,
//! ANSI-free layer appending to `<base>/debug/debug_<timestamp>.txt`,
//! one line per event with a wall-clock timestamp.

use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Local;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Overwritten with the resource-timing entries of every class visit
pub const PERFORMANCE_ENTRIES_FILE: &str = "performance_entries.json";

/// Local wall-clock timestamps, `2024-05-01 13:45:10`
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl FormatTime for WallClock {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Where per-run diagnostics are written
#[derive(Debug, Clone)]
pub struct Diagnostics {
    debug_dir: PathBuf,
}

impl Diagnostics {
    pub fn new(debug_dir: impl Into<PathBuf>) -> Self {
        Self {
            debug_dir: debug_dir.into(),
        }
    }

    pub fn debug_dir(&self) -> &Path {
        &self.debug_dir
    }

    pub fn performance_entries_path(&self) -> PathBuf {
        self.debug_dir.join(PERFORMANCE_ENTRIES_FILE)
    }

    /// Fresh debug log path for a run starting now
    pub fn new_log_path(&self) -> PathBuf {
        self.debug_dir
            .join(format!("debug_{}.txt", Local::now().format("%Y%m%d_%H%M%S")))
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Console-only tracing, for commands that do not crawl
pub fn init_console() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Console tracing plus an append-only debug log file; returns the log path
pub fn init_with_log_file(diagnostics: &Diagnostics) -> Result<PathBuf> {
    std::fs::create_dir_all(diagnostics.debug_dir()).with_context(|| {
        format!(
            "Failed to create debug directory: {}",
            diagnostics.debug_dir().display()
        )
    })?;

    let log_path = diagnostics.new_log_path();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open debug log: {}", log_path.display()))?;

    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_timer(WallClock),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_timer(WallClock)
                .with_writer(Mutex::new(file)),
        )
        .init();

    Ok(log_path)
}
