//! Learning path → course → class traversal.
//!
//! Strictly sequential: one browser, one page at a time. Folder creation
//! is idempotent, so re-running a path only fills in what is missing.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, instrument, warn};

use crate::domain::{
    Class, Course, CourseReport, CourseState, LearningPath, PathReport, ResumeCursor,
};
use crate::error::CrawlError;

use super::acquisition::AcquisitionPolicy;
use super::context::CrawlContext;

/// Walks learning paths and hands each class to the acquisition policy
pub struct TraversalEngine {
    ctx: Arc<CrawlContext>,
    acquisition: AcquisitionPolicy,
    base_dir: PathBuf,
}

impl TraversalEngine {
    pub fn new(ctx: Arc<CrawlContext>, base_dir: impl Into<PathBuf>) -> Self {
        let acquisition = AcquisitionPolicy::new(Arc::clone(&ctx));
        Self {
            ctx,
            acquisition,
            base_dir: base_dir.into(),
        }
    }

    /// Open a learning-path page and read its title and course list
    #[instrument(skip(self))]
    pub async fn discover(&self, url: &str) -> Result<LearningPath> {
        let browser = self.ctx.browser.as_ref();
        let platform = &self.ctx.platform;

        info!("Opening learning path");
        browser.navigate(url).await?;
        browser.wait_for_load(self.ctx.timeouts.page_load).await?;

        if !browser
            .wait_for_element(&platform.course_link_selector, self.ctx.timeouts.course_listing)
            .await?
        {
            return Err(CrawlError::NoCourses {
                url: url.to_string(),
            }
            .into());
        }

        let title = browser
            .element_text(&platform.path_title_selector)
            .await?
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CrawlError::TitleMissing {
                selector: platform.path_title_selector.clone(),
            })?;

        let anchors = browser
            .anchors(
                &platform.course_link_selector,
                Some(&platform.course_title_selector),
            )
            .await?;

        if anchors.is_empty() {
            return Err(CrawlError::NoCourses {
                url: url.to_string(),
            }
            .into());
        }

        let path = LearningPath::discovered(title, url, anchors, &self.base_dir);
        info!(title = %path.title, courses = path.courses.len(), "Learning path discovered");
        Ok(path)
    }

    /// Process every course at or after the cursor
    #[instrument(skip_all, fields(path = %path.title, start = cursor.ordinal()))]
    pub async fn traverse(&self, path: &LearningPath, cursor: ResumeCursor) -> Result<PathReport> {
        let folder = path.folder(&self.base_dir);
        tokio::fs::create_dir_all(&folder)
            .await
            .with_context(|| format!("Failed to create path folder: {}", folder.display()))?;

        if cursor.ordinal() > path.courses.len() {
            warn!(
                start = cursor.ordinal(),
                courses = path.courses.len(),
                "Start course is past the end of the learning path"
            );
        }

        let mut courses = Vec::with_capacity(path.courses.len());
        for course in &path.courses {
            let state = if cursor.includes(course.ordinal) {
                self.process_course(course).await?
            } else {
                CourseState::Skipped
            };

            courses.push(CourseReport {
                ordinal: course.ordinal,
                title: course.title.clone(),
                folder: course.folder.clone(),
                state,
            });
        }

        Ok(PathReport {
            title: path.title.clone(),
            root_url: path.root_url.clone(),
            folder,
            courses,
        })
    }

    /// Open a course (with retries) and acquire each class in order
    #[instrument(skip_all, fields(course = %course.display_title()))]
    async fn process_course(&self, course: &Course) -> Result<CourseState> {
        info!(url = %course.source_url, "Processing course");
        tokio::fs::create_dir_all(&course.folder)
            .await
            .with_context(|| format!("Failed to create course folder: {}", course.folder.display()))?;

        let classes = match self.open_course(course).await {
            Ok(classes) => classes,
            Err(e) => {
                error!(error = %format!("{:#}", e), "Failed to process course, moving on");
                return Ok(CourseState::Abandoned {
                    error: format!("{:#}", e),
                });
            }
        };

        info!(classes = classes.len(), "Found classes");

        let mut reports = Vec::with_capacity(classes.len());
        for class in &classes {
            reports.push(self.acquisition.acquire_class(class, &course.folder).await);
            self.ctx.pacing.between_classes.wait().await;
        }

        Ok(CourseState::Completed { classes: reports })
    }

    async fn open_course(&self, course: &Course) -> Result<Vec<Class>> {
        let policy = self.ctx.pacing.course_retry;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.list_classes(course).await {
                Ok(classes) => return Ok(classes),
                Err(e) if policy.should_retry(attempt) => {
                    warn!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        error = %format!("{:#}", e),
                        "Error opening course, retrying"
                    );
                    policy.backoff.wait().await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn list_classes(&self, course: &Course) -> Result<Vec<Class>> {
        let browser = self.ctx.browser.as_ref();
        let selector = &self.ctx.platform.class_link_selector;

        browser.navigate(&course.source_url).await?;
        browser.wait_for_load(self.ctx.timeouts.course_load).await?;

        let timeout = self.ctx.timeouts.class_listing;
        if !browser.wait_for_element(selector, timeout).await? {
            return Err(CrawlError::ListingMissing {
                selector: selector.clone(),
                timeout,
            }
            .into());
        }

        let anchors = browser.anchors(selector, None).await?;
        if anchors.is_empty() {
            return Err(CrawlError::NoClasses.into());
        }

        Ok(Class::from_anchors(anchors))
    }
}
