//! Media acquisition policy for a single class.
//!
//! A class visit produces either a video (when the player's playlist
//! shows up in telemetry) or a PDF snapshot of the page, plus any files
//! from the attachment listing. Nothing escapes [`AcquisitionPolicy::acquire_class`]:
//! failures end up in the returned [`ClassReport`] and the log.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{
    AcquisitionStatus, Artifact, ArtifactKind, ArtifactOutcome, AttachmentListing, Class,
    ClassReport,
};
use crate::error::CrawlError;

use super::context::CrawlContext;
use super::ledger::{content_hash, Ledger};
use super::telemetry::{Discovery, ResourceTimeline};

/// Decides and fetches what a class contributes
pub struct AcquisitionPolicy {
    ctx: Arc<CrawlContext>,
    discovery: Discovery,
}

impl AcquisitionPolicy {
    pub fn new(ctx: Arc<CrawlContext>) -> Self {
        let discovery = Discovery::for_platform(&ctx.platform);
        Self { ctx, discovery }
    }

    pub fn with_discovery(ctx: Arc<CrawlContext>, discovery: Discovery) -> Self {
        Self { ctx, discovery }
    }

    /// Visit a class page and acquire its video or PDF, then its attachments
    #[instrument(skip_all, fields(class = %class.display_title()))]
    pub async fn acquire_class(&self, class: &Class, course_dir: &Path) -> ClassReport {
        let mut report = ClassReport::new(class.ordinal, &class.title);

        if let Err(e) = self.visit(class, course_dir, &mut report).await {
            error!(error = %format!("{:#}", e), "Error processing class");
            report.error = Some(format!("{:#}", e));
        }

        report
    }

    async fn visit(&self, class: &Class, course_dir: &Path, report: &mut ClassReport) -> Result<()> {
        let browser = self.ctx.browser.as_ref();

        info!(url = %class.source_url, "Processing class");
        browser.navigate(&class.source_url).await?;
        browser.wait_for_load(self.ctx.timeouts.page_load).await?;
        self.ctx.pacing.page_settle.wait().await;

        let timeline = ResourceTimeline::capture(browser).await?;
        let snapshot_path = self.ctx.diagnostics.performance_entries_path();
        if let Err(e) = timeline.write_snapshot(&snapshot_path).await {
            warn!(error = %e, "Failed to save performance entries");
        }

        let primary = match self.discovery.find_video(&timeline) {
            Some(video_url) => {
                info!(%video_url, "Found video URL");
                self.acquire_video(class, &video_url, course_dir).await
            }
            None => {
                info!("No video found for class, saving page as PDF");
                self.acquire_pdf(class, course_dir).await
            }
        };
        report.primary = Some(primary);

        // Printing may have let late requests land; look again
        let timeline = ResourceTimeline::capture(browser).await?;
        match self.discovery.find_attachment_listing(&timeline) {
            Some(listing_url) => {
                info!(%listing_url, "Found files URL");
                report.attachments = self
                    .acquire_attachments(class, &listing_url, course_dir)
                    .await
                    .context("Error downloading attached files")?;
            }
            None => debug!("No files URL found in performance entries"),
        }

        Ok(())
    }

    /// Download the class video unless it is already on disk
    async fn acquire_video(&self, class: &Class, video_url: &str, course_dir: &Path) -> ArtifactOutcome {
        let name = class.video_file_name();
        let path = course_dir.join(&name);
        let artifact = Artifact::new(ArtifactKind::Video, &name, path.clone());

        if path.exists() {
            info!(file = %name, "Video already downloaded");
            return ArtifactOutcome::new(artifact, AcquisitionStatus::AlreadyPresent);
        }

        if let Err(e) = tokio::fs::create_dir_all(course_dir).await {
            return ArtifactOutcome::new(
                artifact,
                AcquisitionStatus::Failed {
                    error: e.to_string(),
                },
            );
        }

        let policy = self.ctx.pacing.video_retry;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            info!(file = %name, attempt, downloader = self.ctx.media.name(), "Downloading video");

            match self
                .ctx
                .media
                .fetch(video_url, &path, &self.ctx.format, &self.ctx.session)
                .await
            {
                Ok(()) => {
                    info!(file = %name, "Video downloaded successfully");
                    return ArtifactOutcome::new(artifact, AcquisitionStatus::Written);
                }
                Err(e) if policy.should_retry(attempt) => {
                    warn!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        error = %e,
                        "Error downloading video, retrying"
                    );
                    policy.backoff.wait().await;
                }
                Err(e) => {
                    let failure = CrawlError::MediaExhausted {
                        attempts: attempt,
                        last_error: format!("{:#}", e),
                    };
                    error!(file = %name, error = %failure, "Giving up on video");
                    return ArtifactOutcome::new(
                        artifact,
                        AcquisitionStatus::Failed {
                            error: failure.to_string(),
                        },
                    );
                }
            }
        }
    }

    /// Print the current page to PDF unless it is already on disk
    async fn acquire_pdf(&self, class: &Class, course_dir: &Path) -> ArtifactOutcome {
        let name = class.pdf_file_name();
        let path = course_dir.join(&name);
        let artifact = Artifact::new(ArtifactKind::SlidePdf, &name, path.clone());

        if path.exists() {
            info!(file = %name, "PDF already exists");
            return ArtifactOutcome::new(artifact, AcquisitionStatus::AlreadyPresent);
        }

        info!(file = %name, "Saving page as PDF");
        let written: Result<()> = async {
            let bytes = self.ctx.browser.print_to_pdf().await?;
            tokio::fs::create_dir_all(course_dir).await?;
            tokio::fs::write(&path, bytes)
                .await
                .with_context(|| format!("Failed to write PDF: {}", path.display()))
        }
        .await;

        match written {
            Ok(()) => {
                info!(file = %name, "PDF saved successfully");
                ArtifactOutcome::new(artifact, AcquisitionStatus::Written)
            }
            Err(e) => {
                error!(file = %name, error = %format!("{:#}", e), "Error saving page as PDF");
                ArtifactOutcome::new(
                    artifact,
                    AcquisitionStatus::Failed {
                        error: format!("{:#}", e),
                    },
                )
            }
        }
    }

    /// Fetch the attachment listing and every file in it, then persist the ledger
    async fn acquire_attachments(
        &self,
        class: &Class,
        listing_url: &str,
        course_dir: &Path,
    ) -> Result<Vec<ArtifactOutcome>> {
        let response = self
            .ctx
            .http
            .get(listing_url, &self.ctx.session)
            .await?
            .error_for_status(listing_url)?;

        debug!(body = %String::from_utf8_lossy(&response.body), "Received attachment listing");
        let listing: AttachmentListing = response.json()?;

        let mut ledger = Ledger::load(course_dir).await?;
        let mut outcomes = Vec::new();

        match listing.entries() {
            Some(entries) => {
                for entry in entries {
                    let Some((url, relative_name)) = entry.resolved() else {
                        warn!(?entry, "Missing 'url' or 'name' in file data");
                        continue;
                    };
                    outcomes.push(
                        self.acquire_attachment(class, url, &relative_name, course_dir, &mut ledger)
                            .await,
                    );
                }
            }
            None => warn!("Unexpected data structure for files"),
        }

        ledger.save(course_dir).await?;
        Ok(outcomes)
    }

    async fn acquire_attachment(
        &self,
        class: &Class,
        url: &str,
        relative_name: &str,
        course_dir: &Path,
        ledger: &mut Ledger,
    ) -> ArtifactOutcome {
        let name = class.attachment_file_name(relative_name);
        let path = course_dir.join(&name);
        let artifact = Artifact::new(ArtifactKind::AttachmentFile, &name, path.clone());

        if path.exists() {
            info!(file = %name, "File already exists");
            return ArtifactOutcome::new(artifact, AcquisitionStatus::AlreadyPresent);
        }

        let body = match self.fetch_body(url).await {
            Ok(body) => body,
            Err(e) => {
                error!(file = %name, error = %format!("{:#}", e), "Error downloading file");
                return ArtifactOutcome::new(
                    artifact,
                    AcquisitionStatus::Failed {
                        error: format!("{:#}", e),
                    },
                );
            }
        };

        let hash = content_hash(&body);
        let artifact = artifact.with_hash(&hash);

        if let Some(existing) = ledger.name_for_hash(&hash) {
            info!(file = %name, %existing, "File already downloaded (different name)");
            let existing = existing.to_string();
            return ArtifactOutcome::new(artifact, AcquisitionStatus::DuplicateContent { existing });
        }

        info!(file = %name, "Downloading file");
        if let Err(e) = write_file(&path, &body).await {
            error!(file = %name, error = %format!("{:#}", e), "Error writing file");
            return ArtifactOutcome::new(
                artifact,
                AcquisitionStatus::Failed {
                    error: format!("{:#}", e),
                },
            );
        }

        ledger.record(&name, &hash);
        info!(file = %name, "File downloaded successfully");
        ArtifactOutcome::new(artifact, AcquisitionStatus::Written)
    }

    async fn fetch_body(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .ctx
            .http
            .get(url, &self.ctx.session)
            .await?
            .error_for_status(url)?;
        Ok(response.body)
    }
}

async fn write_file(path: &Path, body: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("Failed to write file: {}", path.display()))
}
