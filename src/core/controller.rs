//! Run controller: login, then each requested learning path in turn.
//!
//! Only a failed login ends a run early. Any other error stays with the
//! learning path it happened in, and the browser is closed whatever
//! the outcome.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::adapters::{
    BrowserSession, FormatPolicy, HttpFetcher, MediaDownloader, ReqwestFetcher, WebDriverSession,
    YtDlpDownloader,
};
use crate::config::ResolvedConfig;
use crate::diagnostics::Diagnostics;
use crate::domain::{LearningPath, PathFailure, PathReport, ResumeCursor, RunReport};
use crate::error::CrawlError;

use super::context::CrawlContext;
use super::pacing::{Pacing, PageTimeouts};
use super::session::{ensure_login, SessionSnapshot};
use super::traversal::TraversalEngine;

/// Questions the run may need to put to the operator
#[async_trait]
pub trait OperatorPrompt: Send + Sync {
    /// Block until the operator says they have logged in by hand
    async fn await_manual_login(&self, attempt: u32, max_attempts: u32) -> Result<()>;

    /// Pick the course to start from, given the discovered course list
    async fn choose_start_course(&self, path: &LearningPath) -> Result<ResumeCursor>;
}

/// What to download
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Learning-path URLs, processed in order
    pub urls: Vec<String>,

    /// Course number to start every path from; asks when unset and only one path is given
    pub resume_from: Option<usize>,
}

impl RunRequest {
    /// Split comma-separated arguments into trimmed, non-empty URLs
    pub fn from_args(args: &[String], resume_from: Option<usize>) -> Self {
        let urls = args
            .iter()
            .flat_map(|arg| arg.split(','))
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect();

        Self { urls, resume_from }
    }
}

/// Drives a full download run
pub struct RunController {
    config: ResolvedConfig,
    pacing: Pacing,
    timeouts: PageTimeouts,
}

impl RunController {
    pub fn new(config: ResolvedConfig) -> Self {
        Self {
            config,
            pacing: Pacing::default(),
            timeouts: PageTimeouts::default(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_timeouts(mut self, timeouts: PageTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Connect the real browser, HTTP client and yt-dlp, then run
    pub async fn run(&self, request: RunRequest, prompt: &dyn OperatorPrompt) -> Result<RunReport> {
        let browser = WebDriverSession::connect(
            &self.config.webdriver_url,
            self.config.user_data_dir.as_deref(),
            self.config.headless,
        )
        .await?;
        let http = ReqwestFetcher::new(self.config.http_timeout)?;
        let media = YtDlpDownloader::new(
            &self.config.ytdlp,
            &self.config.platform.cookie_domain,
            self.config.media_timeout,
        );

        self.run_with(Arc::new(browser), Arc::new(http), Arc::new(media), request, prompt)
            .await
    }

    /// Run against the given collaborators; the browser is always closed
    pub async fn run_with(
        &self,
        browser: Arc<dyn BrowserSession>,
        http: Arc<dyn HttpFetcher>,
        media: Arc<dyn MediaDownloader>,
        request: RunRequest,
        prompt: &dyn OperatorPrompt,
    ) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id);

        async move {
            info!(paths = request.urls.len(), "Starting download run");

            let result = self
                .crawl(run_id, Arc::clone(&browser), http, media, &request, prompt)
                .await;

            if let Err(e) = browser.quit().await {
                warn!(error = %e, "Failed to close browser");
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn crawl(
        &self,
        run_id: Uuid,
        browser: Arc<dyn BrowserSession>,
        http: Arc<dyn HttpFetcher>,
        media: Arc<dyn MediaDownloader>,
        request: &RunRequest,
        prompt: &dyn OperatorPrompt,
    ) -> Result<RunReport> {
        let platform = &self.config.platform;

        ensure_login(browser.as_ref(), platform, &self.timeouts, prompt).await?;
        let session = SessionSnapshot::capture(browser.as_ref(), platform).await?;

        let ctx = Arc::new(CrawlContext {
            browser,
            http,
            media,
            session,
            platform: platform.clone(),
            pacing: self.pacing,
            timeouts: self.timeouts,
            format: FormatPolicy::default(),
            diagnostics: Diagnostics::new(self.config.debug_dir()),
        });
        let engine = TraversalEngine::new(ctx, &self.config.base_dir);

        let mut report = RunReport::new(run_id);
        let ask_for_start = request.urls.len() == 1 && request.resume_from.is_none();

        for url in &request.urls {
            match self.process_path(&engine, url, request.resume_from, ask_for_start, prompt).await {
                Ok(path_report) => {
                    info!(
                        path = %path_report.title,
                        written = path_report.written(),
                        abandoned = path_report.abandoned(),
                        "Learning path finished"
                    );
                    report.paths.push(path_report);
                }
                Err(e) => {
                    if e.downcast_ref::<CrawlError>().is_some_and(CrawlError::is_fatal) {
                        return Err(e);
                    }
                    error!(%url, error = %format!("{:#}", e), "Failed to process learning path");
                    report.failures.push(PathFailure {
                        url: url.clone(),
                        error: format!("{:#}", e),
                    });
                }
            }
        }

        Ok(report)
    }

    async fn process_path(
        &self,
        engine: &TraversalEngine,
        url: &str,
        resume_from: Option<usize>,
        ask_for_start: bool,
        prompt: &dyn OperatorPrompt,
    ) -> Result<PathReport> {
        let path = engine.discover(url).await?;

        let cursor = match resume_from {
            Some(ordinal) => ResumeCursor::at(ordinal),
            None if ask_for_start => prompt.choose_start_course(&path).await?,
            None => ResumeCursor::default(),
        };

        engine.traverse(&path, cursor).await
    }
}
