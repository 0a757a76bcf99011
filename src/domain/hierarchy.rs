//! Learning path → course → class hierarchy.
//!
//! Ordinals are assigned once, at discovery time, in document order.
//! They drive both display order and the zero-padded folder/file
//! prefixes, so the same document order always yields the same names.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CrawlError;

/// A link scraped from a page: visible text plus target URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub text: String,
    pub href: String,
}

impl Anchor {
    pub fn new(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            href: href.into(),
        }
    }
}

/// Top-level grouping of courses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningPath {
    /// Title as shown on the path page
    pub title: String,

    /// URL of the path page
    pub root_url: String,

    /// Courses in document order
    pub courses: Vec<Course>,
}

impl LearningPath {
    /// Build a learning path from its title and course anchors, assigning ordinals
    pub fn discovered(
        title: impl Into<String>,
        root_url: impl Into<String>,
        anchors: Vec<Anchor>,
        base_dir: &Path,
    ) -> Self {
        let title = title.into();
        let folder = base_dir.join(sanitize_filename(&title));

        let courses = anchors
            .into_iter()
            .enumerate()
            .map(|(idx, anchor)| Course::new(idx + 1, anchor.text, anchor.href, &folder))
            .collect();

        Self {
            title,
            root_url: root_url.into(),
            courses,
        }
    }

    /// Folder holding every course of this path
    pub fn folder(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(sanitize_filename(&self.title))
    }
}

/// A course inside a learning path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// 1-based position in the learning path
    pub ordinal: usize,
    pub title: String,
    pub source_url: String,
    pub folder: PathBuf,
}

impl Course {
    pub fn new(ordinal: usize, title: String, source_url: String, path_folder: &Path) -> Self {
        let folder = path_folder.join(sanitize_filename(&prefixed(ordinal, &title)));
        Self {
            ordinal,
            title,
            source_url,
            folder,
        }
    }

    /// Title with its zero-padded ordinal, e.g. `03_Rust basics`
    pub fn display_title(&self) -> String {
        prefixed(self.ordinal, &self.title)
    }
}

/// A single lesson page, rediscovered each time its course is opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    /// 1-based position in the course
    pub ordinal: usize,
    pub title: String,
    pub source_url: String,
}

impl Class {
    /// Assign ordinals to class anchors in document order
    pub fn from_anchors(anchors: Vec<Anchor>) -> Vec<Self> {
        anchors
            .into_iter()
            .enumerate()
            .map(|(idx, anchor)| Self {
                ordinal: idx + 1,
                title: anchor.text,
                source_url: anchor.href,
            })
            .collect()
    }

    pub fn display_title(&self) -> String {
        prefixed(self.ordinal, &self.title)
    }

    /// `<ordinal>_<title>.mp4`, sanitized
    pub fn video_file_name(&self) -> String {
        format!("{}.mp4", sanitize_filename(&self.display_title()))
    }

    /// `<ordinal>_<title>.pdf`, sanitized after dropping a trailing duration
    pub fn pdf_file_name(&self) -> String {
        format!("{}.pdf", sanitize_pdf_filename(&self.display_title()))
    }

    /// `<ordinal>_<relative path + name>`, sanitized
    pub fn attachment_file_name(&self, relative_name: &str) -> String {
        format!("{:02}_{}", self.ordinal, sanitize_filename(relative_name))
    }
}

/// 1-based course ordinal at which a learning-path traversal (re)starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeCursor(usize);

impl Default for ResumeCursor {
    fn default() -> Self {
        Self(1)
    }
}

impl ResumeCursor {
    /// Validate an operator-supplied course number against the number of courses
    pub fn new(requested: usize, available: usize) -> Result<Self, CrawlError> {
        if requested == 0 || requested > available {
            return Err(CrawlError::InvalidResumeCursor {
                requested,
                available,
            });
        }
        Ok(Self(requested))
    }

    /// Cursor without an upper bound check (course count not yet known)
    pub fn at(ordinal: usize) -> Self {
        Self(ordinal.max(1))
    }

    pub fn ordinal(&self) -> usize {
        self.0
    }

    /// Whether a course with this ordinal is at or after the cursor
    pub fn includes(&self, ordinal: usize) -> bool {
        ordinal >= self.0
    }
}

fn prefixed(ordinal: usize, title: &str) -> String {
    format!("{:02}_{}", ordinal, title)
}

/// Keep alphanumerics, space, dot, underscore and dash; drop trailing whitespace
pub fn sanitize_filename(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-'))
        .collect();
    kept.trim_end().to_string()
}

/// Like [`sanitize_filename`], but first drops the last five characters
/// when they end in "min" (a duration such as `12min`)
pub fn sanitize_pdf_filename(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let cut = chars.len().saturating_sub(5);
    let tail: String = chars[cut..].iter().collect();

    if tail.to_lowercase().ends_with("min") {
        let head: String = chars[..cut].iter().collect();
        sanitize_filename(head.trim())
    } else {
        sanitize_filename(name)
    }
}
