//! platzi-dl - Bulk downloader for Platzi learning paths
//!
//! Walks a learning path's courses and classes in a logged-in browser,
//! and saves each class as a video (HLS via yt-dlp) or, when the page
//! has no video, as a PDF print of the page. Attached files are
//! downloaded with the browser's session and de-duplicated per course
//! by content hash.
//!
//! # Architecture
//!
//! - Media is discovered from the page's resource-timing entries, not
//!   from an API
//! - Every write is guarded by a path-existence check, so re-running a
//!   path only fills in what is missing
//! - Failures stay at the class or course where they happen; only a
//!   failed login ends a run
//!
//! # Modules
//!
//! - `adapters`: Browser (WebDriver), HTTP (reqwest) and yt-dlp
//! - `core`: Traversal, acquisition, ledger, pacing, session
//! - `domain`: Hierarchy, artifacts, attachment listings, reports
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Download a learning path, choosing the start course interactively
//! platzi-dl download https://platzi.com/ruta/desarrollo-backend-python/
//!
//! # Several paths, starting each at course 3
//! platzi-dl download <url1>,<url2> --resume-from 3
//!
//! # Inspect a course's attachment ledger
//! platzi-dl ledger "Platzi_Downloads/Backend/03_Python"
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod diagnostics;
pub mod domain;
pub mod error;

// Re-export main types at crate root for convenience
pub use core::{RunController, RunRequest, TraversalEngine};
pub use domain::{Class, Course, LearningPath, ResumeCursor, RunReport};
pub use error::CrawlError;
