//! Everything a crawl needs, passed explicitly instead of held globally.

use std::sync::Arc;

use crate::adapters::{BrowserSession, FormatPolicy, HttpFetcher, MediaDownloader};
use crate::config::PlatformSettings;
use crate::diagnostics::Diagnostics;

use super::pacing::{Pacing, PageTimeouts};
use super::session::SessionSnapshot;

/// Collaborators, session snapshot and policies for one run
#[derive(Clone)]
pub struct CrawlContext {
    pub browser: Arc<dyn BrowserSession>,
    pub http: Arc<dyn HttpFetcher>,
    pub media: Arc<dyn MediaDownloader>,
    pub session: SessionSnapshot,
    pub platform: PlatformSettings,
    pub pacing: Pacing,
    pub timeouts: PageTimeouts,
    pub format: FormatPolicy,
    pub diagnostics: Diagnostics,
}
