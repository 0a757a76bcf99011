//! Command-line interface for platzi-dl.
//!
//! Provides commands for downloading learning paths, showing the
//! resolved configuration, and inspecting a course's attachment ledger.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config;
use crate::core::{Ledger, OperatorPrompt, RunController, RunRequest};
use crate::diagnostics::{self, Diagnostics};
use crate::domain::{CourseState, LearningPath, ResumeCursor, RunReport};

/// platzi-dl - Bulk downloader for Platzi learning paths
#[derive(Parser, Debug)]
#[command(name = "platzi-dl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download one or more learning paths
    Download {
        /// Learning-path URLs (separate arguments or comma-separated)
        #[arg(required = true)]
        urls: Vec<String>,

        /// Course number to start from (1-based)
        #[arg(short, long)]
        resume_from: Option<usize>,

        /// Download root (overrides config and PLATZI_DL_BASE_DIR)
        #[arg(long)]
        base_dir: Option<PathBuf>,

        /// WebDriver endpoint (overrides config and PLATZI_DL_WEBDRIVER)
        #[arg(long)]
        webdriver: Option<String>,
    },

    /// Show resolved configuration (debug)
    Config,

    /// List the attachment ledger of a course folder
    Ledger {
        /// Course folder containing downloaded_files.json
        course_dir: PathBuf,
    },
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Download {
                urls,
                resume_from,
                base_dir,
                webdriver,
            } => download(&urls, resume_from, base_dir, webdriver).await,
            Commands::Config => {
                diagnostics::init_console();
                show_config()
            }
            Commands::Ledger { course_dir } => {
                diagnostics::init_console();
                show_ledger(&course_dir).await
            }
        }
    }
}

async fn download(
    urls: &[String],
    resume_from: Option<usize>,
    base_dir: Option<PathBuf>,
    webdriver: Option<String>,
) -> Result<()> {
    let cfg = config::config()?.clone().with_overrides(base_dir, webdriver);

    let log_path = diagnostics::init_with_log_file(&Diagnostics::new(cfg.debug_dir()))?;
    info!(log = %log_path.display(), base_dir = %cfg.base_dir.display(), "Debug log started");

    let request = RunRequest::from_args(urls, resume_from);
    if request.urls.is_empty() {
        anyhow::bail!("No learning-path URLs given");
    }

    let report = RunController::new(cfg).run(request, &ConsolePrompt).await?;
    info!(
        run_id = %report.run_id,
        paths = report.paths.len(),
        failed_paths = report.failures.len(),
        written = report.written(),
        "Run finished"
    );
    print_summary(&report);

    Ok(())
}

fn print_summary(report: &RunReport) {
    println!();
    println!("Run {} finished", report.run_id);

    for path in &report.paths {
        println!();
        println!("{}", path.title);
        println!("  Folder: {}", path.folder.display());

        for course in &path.courses {
            let state = match &course.state {
                CourseState::Skipped => "skipped".to_string(),
                CourseState::Completed { classes } => {
                    let written: usize = classes.iter().map(|c| c.written()).sum();
                    let failed = classes.iter().filter(|c| c.error.is_some()).count();
                    format!(
                        "{} classes, {} files written, {} class errors",
                        classes.len(),
                        written,
                        failed
                    )
                }
                CourseState::Abandoned { error } => format!("abandoned: {}", error),
            };
            println!("  {:02}. {:<50} {}", course.ordinal, course.title, state);
        }
    }

    if !report.failures.is_empty() {
        println!();
        println!("Failed learning paths:");
        for failure in &report.failures {
            println!("  {} ({})", failure.url, failure.error);
        }
    }

    println!();
    println!("Files written: {}", report.written());
}

fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("platzi-dl configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Downloads:  {}", cfg.base_dir.display());
    println!("  Debug:      {}", cfg.debug_dir().display());
    println!("  yt-dlp:     {}", cfg.ytdlp);
    println!();
    println!("Browser:");
    println!("  WebDriver:  {}", cfg.webdriver_url);
    println!(
        "  Profile:    {}",
        cfg.user_data_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(browser default)".to_string())
    );
    println!("  Headless:   {}", cfg.headless);
    println!();
    println!("Platform:");
    println!("  Origin:     {}", cfg.platform.origin);
    println!("  Media host: {}", cfg.platform.media_host);
    println!("  Files API:  {}", cfg.platform.attachments_api_path);
    println!();
    println!("Timeouts:");
    println!("  HTTP:       {}s", cfg.http_timeout.as_secs());
    println!("  Media:      {}s", cfg.media_timeout.as_secs());

    Ok(())
}

async fn show_ledger(course_dir: &Path) -> Result<()> {
    let ledger = Ledger::load(course_dir).await?;

    if ledger.is_empty() {
        println!("No attachments recorded in {}", course_dir.display());
        return Ok(());
    }

    println!("{} attachments recorded in {}:", ledger.len(), course_dir.display());
    for (name, hash) in ledger.entries() {
        println!("  {}  {}", short_hash(hash), name);
    }

    Ok(())
}

/// First twelve characters of a ledger hash
fn short_hash(hash: &str) -> String {
    hash.chars().take(12).collect()
}

/// Operator prompt on stdin/stdout
pub struct ConsolePrompt;

/// Read one line from stdin without blocking the runtime; `None` on EOF
async fn read_line() -> Result<Option<String>> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        Ok::<_, io::Error>((read > 0).then(|| line.trim().to_string()))
    })
    .await
    .context("Input task failed")?
    .context("Failed to read from stdin")
}

fn prompt_line(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    write!(stdout, "{}", text)?;
    stdout.flush()?;
    Ok(())
}

#[async_trait]
impl OperatorPrompt for ConsolePrompt {
    async fn await_manual_login(&self, attempt: u32, max_attempts: u32) -> Result<()> {
        println!();
        println!(
            "No active session found (attempt {} of {}). Log in to Platzi in the opened browser window.",
            attempt, max_attempts
        );
        prompt_line("Press Enter once you have logged in... ")?;
        read_line().await?;
        Ok(())
    }

    async fn choose_start_course(&self, path: &LearningPath) -> Result<ResumeCursor> {
        println!();
        println!("Courses in '{}':", path.title);
        for course in &path.courses {
            println!("  {}. {}", course.ordinal, course.title);
        }

        loop {
            prompt_line(&format!(
                "Course number to start from (1-{}, Enter for 1): ",
                path.courses.len()
            ))?;

            let Some(line) = read_line().await? else {
                anyhow::bail!("Input closed before a start course was chosen");
            };
            if line.is_empty() {
                return Ok(ResumeCursor::default());
            }

            match line
                .parse::<usize>()
                .map_err(anyhow::Error::from)
                .and_then(|n| Ok(ResumeCursor::new(n, path.courses.len())?))
            {
                Ok(cursor) => return Ok(cursor),
                Err(e) => println!("Invalid course number: {}", e),
            }
        }
    }
}
