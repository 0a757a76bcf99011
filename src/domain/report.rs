//! Per-run reports returned by the traversal.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::artifact::{AcquisitionStatus, ArtifactKind, ArtifactOutcome};

/// What a single class contributed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassReport {
    pub ordinal: usize,
    pub title: String,

    /// Video or PDF snapshot (whichever branch discovery selected)
    pub primary: Option<ArtifactOutcome>,

    /// Attachment files from the listing, if one was discovered
    pub attachments: Vec<ArtifactOutcome>,

    /// Failure that ended the class early
    pub error: Option<String>,
}

impl ClassReport {
    pub fn new(ordinal: usize, title: impl Into<String>) -> Self {
        Self {
            ordinal,
            title: title.into(),
            ..Default::default()
        }
    }

    /// All outcomes, primary first
    pub fn outcomes(&self) -> impl Iterator<Item = &ArtifactOutcome> {
        self.primary.iter().chain(self.attachments.iter())
    }

    pub fn primary_kind(&self) -> Option<ArtifactKind> {
        self.primary.as_ref().map(|o| o.artifact.kind)
    }

    /// Number of files written this run
    pub fn written(&self) -> usize {
        self.outcomes()
            .filter(|o| o.status == AcquisitionStatus::Written)
            .count()
    }
}

/// Terminal state of a course
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum CourseState {
    /// Before the resume cursor; untouched
    Skipped,

    /// Class list processed
    Completed { classes: Vec<ClassReport> },

    /// Listing never appeared or was empty after every attempt
    Abandoned { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseReport {
    pub ordinal: usize,
    pub title: String,
    pub folder: PathBuf,
    pub state: CourseState,
}

impl CourseReport {
    pub fn classes(&self) -> &[ClassReport] {
        match &self.state {
            CourseState::Completed { classes } => classes,
            _ => &[],
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, CourseState::Completed { .. })
    }
}

/// Result of traversing one learning path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathReport {
    pub title: String,
    pub root_url: String,
    pub folder: PathBuf,
    pub courses: Vec<CourseReport>,
}

impl PathReport {
    pub fn written(&self) -> usize {
        self.courses
            .iter()
            .flat_map(|c| c.classes())
            .map(ClassReport::written)
            .sum()
    }

    pub fn abandoned(&self) -> usize {
        self.courses
            .iter()
            .filter(|c| matches!(c.state, CourseState::Abandoned { .. }))
            .count()
    }
}

/// A learning path that could not be traversed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathFailure {
    pub url: String,
    pub error: String,
}

/// Everything a run did, path by path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: uuid::Uuid,
    pub paths: Vec<PathReport>,
    pub failures: Vec<PathFailure>,
}

impl RunReport {
    pub fn new(run_id: uuid::Uuid) -> Self {
        Self {
            run_id,
            paths: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn written(&self) -> usize {
        self.paths.iter().map(PathReport::written).sum()
    }
}
