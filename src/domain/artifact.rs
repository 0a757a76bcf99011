//! Artifacts produced for a class and the outcome of acquiring them.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// An on-disk file proposed by the acquisition policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// What kind of file this is
    pub kind: ArtifactKind,

    /// Name it is known by (file name inside the course folder)
    pub logical_name: String,

    /// Where it lives on disk
    pub local_path: PathBuf,

    /// Content hash, only tracked for attachments
    pub content_hash: Option<String>,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, logical_name: impl Into<String>, local_path: PathBuf) -> Self {
        Self {
            kind,
            logical_name: logical_name.into(),
            local_path,
            content_hash: None,
        }
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }
}

/// Kinds of artifacts a class can contribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Streamed lesson video
    Video,

    /// Printed snapshot of a page without video
    SlidePdf,

    /// File from the class attachment listing
    AttachmentFile,
}

/// What happened when an artifact was acquired
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum AcquisitionStatus {
    /// File was fetched and written this run
    Written,

    /// Target path already existed; left untouched
    AlreadyPresent,

    /// Same content was already recorded in the course ledger under another name
    DuplicateContent { existing: String },

    /// Fetch or write failed; contained at the class boundary
    Failed { error: String },
}

/// An artifact together with its acquisition outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactOutcome {
    pub artifact: Artifact,
    pub status: AcquisitionStatus,
}

impl ArtifactOutcome {
    pub fn new(artifact: Artifact, status: AcquisitionStatus) -> Self {
        Self { artifact, status }
    }
}
