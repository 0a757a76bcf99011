//! Domain types for the downloader.
//!
//! - Hierarchy: LearningPath, Course, Class, ResumeCursor
//! - Artifact: files a class produces and how acquiring them went
//! - Attachments: the files-links listing tree
//! - Report: per-run summaries

pub mod artifact;
pub mod attachments;
pub mod hierarchy;
pub mod report;

pub use artifact::{AcquisitionStatus, Artifact, ArtifactKind, ArtifactOutcome};
pub use attachments::{AttachmentEntry, AttachmentListing, AttachmentNode};
pub use hierarchy::{
    sanitize_filename, sanitize_pdf_filename, Anchor, Class, Course, LearningPath, ResumeCursor,
};
pub use report::{ClassReport, CourseReport, CourseState, PathFailure, PathReport, RunReport};
