//! Adapter interfaces for external collaborators.
//!
//! The crawl only ever talks to three things it does not own: the
//! authenticated browser, an HTTP client that reuses the browser's
//! session, and a media downloader for segmented streams. Each sits
//! behind a trait so the traversal can run against scripted fakes.

pub mod http;
pub mod webdriver;
pub mod ytdlp;

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::core::SessionSnapshot;
use crate::domain::Anchor;
use crate::error::CrawlError;

pub use http::ReqwestFetcher;
pub use webdriver::WebDriverSession;
pub use ytdlp::YtDlpDownloader;

/// Script returning `document.readyState`
pub const READY_STATE_SCRIPT: &str = "return document.readyState;";

/// Script returning the browser's user agent
pub const USER_AGENT_SCRIPT: &str = "return navigator.userAgent;";

/// How often `wait_for_load` polls the ready state
const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// An authenticated browsing context
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate the current tab to `url`
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Reload the current page
    async fn refresh(&self) -> Result<()>;

    /// Run a script in the page and return its JSON result
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Wait until an element matching `selector` exists; `false` on timeout
    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Text of the first element matching `selector`
    async fn element_text(&self, selector: &str) -> Result<Option<String>>;

    /// All links matching `selector`, in document order.
    ///
    /// With `title_selector` the link text is taken from that descendant
    /// instead of the link itself.
    async fn anchors(&self, selector: &str, title_selector: Option<&str>) -> Result<Vec<Anchor>>;

    /// Cookies of the current browsing context (name → value)
    async fn cookies(&self) -> Result<BTreeMap<String, String>>;

    /// Render the current page as a PDF document
    async fn print_to_pdf(&self) -> Result<Vec<u8>>;

    /// Close the browser
    async fn quit(&self) -> Result<()>;

    /// Wait until `document.readyState` is `complete`
    async fn wait_for_load(&self, timeout: Duration) -> Result<()> {
        let poll = async {
            loop {
                let state = self.evaluate(READY_STATE_SCRIPT).await?;
                if state.as_str() == Some("complete") {
                    return Ok::<(), anyhow::Error>(());
                }
                tokio::time::sleep(READY_POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| CrawlError::LoadTimeout(timeout))?
    }
}

/// Response of an authenticated GET
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx status into an error naming the URL
    pub fn error_for_status(self, url: &str) -> Result<Self, CrawlError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(CrawlError::HttpStatus {
                status: self.status,
                url: url.to_string(),
            })
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).context("Failed to parse response JSON")
    }
}

/// HTTP client that carries the browser session's cookies and headers
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn get(&self, url: &str, session: &SessionSnapshot) -> Result<HttpResponse>;
}

/// Quality selection for streamed video
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatPolicy {
    /// Highest vertical resolution preferred
    pub max_height: u32,
}

impl Default for FormatPolicy {
    fn default() -> Self {
        Self { max_height: 1080 }
    }
}

impl FormatPolicy {
    /// Best video at or below the cap plus best audio, else best combined at
    /// or below the cap, else whatever is available
    pub fn selector(&self) -> String {
        format!(
            "bestvideo[height<={h}]+bestaudio/best[height<={h}]/best",
            h = self.max_height
        )
    }
}

/// Fetches a (possibly segmented) media stream into a single file
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Human-readable downloader name
    fn name(&self) -> &str;

    async fn fetch(
        &self,
        url: &str,
        output: &Path,
        policy: &FormatPolicy,
        session: &SessionSnapshot,
    ) -> Result<()>;
}
