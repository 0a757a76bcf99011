//! Media discovery from the page's resource-timing log.
//!
//! The platform exposes no API for a class's video or attachments, but
//! the player and the attachments widget both fetch them while the page
//! loads. Those requests show up in `performance.getEntriesByType
//! ('resource')`, so discovery is a pattern match over that timeline.
//! The patterns sit behind [`DiscoveryStrategy`] so a change in the
//! platform's URL shapes touches one type.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::adapters::BrowserSession;
use crate::config::PlatformSettings;

/// Script returning the resource-timing entries of the current page
pub const RESOURCE_ENTRIES_SCRIPT: &str =
    "return window.performance.getEntriesByType('resource');";

/// Decides whether a resource URL is the thing being looked for
pub trait DiscoveryStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn matches(&self, url: &str) -> bool;
}

/// HLS playlist served from the platform's media host
#[derive(Debug, Clone)]
pub struct StreamingPlaylist {
    host: String,
}

impl StreamingPlaylist {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

impl DiscoveryStrategy for StreamingPlaylist {
    fn name(&self) -> &str {
        "streaming-playlist"
    }

    fn matches(&self, url: &str) -> bool {
        url.contains(&self.host) && url.contains(".m3u8")
    }
}

/// Call to the attachment listing endpoint
#[derive(Debug, Clone)]
pub struct AttachmentListingApi {
    api_path: String,
}

impl AttachmentListingApi {
    pub fn new(api_path: impl Into<String>) -> Self {
        Self {
            api_path: api_path.into(),
        }
    }
}

impl DiscoveryStrategy for AttachmentListingApi {
    fn name(&self) -> &str {
        "attachment-listing"
    }

    fn matches(&self, url: &str) -> bool {
        url.contains(&self.api_path)
    }
}

/// Resource-timing entries captured from the current page
#[derive(Debug, Clone, Default)]
pub struct ResourceTimeline {
    entries: Vec<Value>,
}

impl ResourceTimeline {
    pub fn from_entries(entries: Vec<Value>) -> Self {
        Self { entries }
    }

    /// Read the entries accumulated since the last navigation
    pub async fn capture(browser: &dyn BrowserSession) -> Result<Self> {
        let value = browser
            .evaluate(RESOURCE_ENTRIES_SCRIPT)
            .await
            .context("Failed to read performance entries")?;

        let entries = match value {
            Value::Array(entries) => entries,
            Value::Null => Vec::new(),
            other => anyhow::bail!("Unexpected performance entries: {}", other),
        };

        let timeline = Self { entries };
        if timeline.is_empty() {
            debug!("No performance entries recorded yet");
        }
        Ok(timeline)
    }

    /// Resource URLs in timeline order
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter_map(|e| e.get("name").and_then(Value::as_str))
    }

    /// First URL the strategy accepts; `None` is an ordinary outcome
    pub fn find_first(&self, strategy: &dyn DiscoveryStrategy) -> Option<String> {
        let found = self.urls().find(|url| strategy.matches(url)).map(str::to_string);
        debug!(
            strategy = strategy.name(),
            entries = self.len(),
            found = found.is_some(),
            "Searched performance entries"
        );
        found
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the raw entries as pretty JSON, replacing any previous snapshot
    pub async fn write_snapshot(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(&self.entries)?;
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write performance entries: {}", path.display()))
    }
}

/// The two discovery strategies a class visit uses
pub struct Discovery {
    video: Box<dyn DiscoveryStrategy>,
    attachments: Box<dyn DiscoveryStrategy>,
}

impl Discovery {
    pub fn new(video: Box<dyn DiscoveryStrategy>, attachments: Box<dyn DiscoveryStrategy>) -> Self {
        Self { video, attachments }
    }

    pub fn for_platform(platform: &PlatformSettings) -> Self {
        Self::new(
            Box::new(StreamingPlaylist::new(&platform.media_host)),
            Box::new(AttachmentListingApi::new(&platform.attachments_api_path)),
        )
    }

    pub fn find_video(&self, timeline: &ResourceTimeline) -> Option<String> {
        timeline.find_first(&*self.video)
    }

    pub fn find_attachment_listing(&self, timeline: &ResourceTimeline) -> Option<String> {
        timeline.find_first(&*self.attachments)
    }
}
