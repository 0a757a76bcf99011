//! Error taxonomy for the crawl.
//!
//! Plumbing failures travel as `anyhow::Error`; the conditions the
//! traversal branches on are typed here so callers can tell a course
//! that never rendered its listing from a login that never happened.

use std::time::Duration;

use thiserror::Error;

/// Typed crawl failures
#[derive(Debug, Clone, Error)]
pub enum CrawlError {
    #[error("Page did not finish loading within {0:?}")]
    LoadTimeout(Duration),

    #[error("Class listing '{selector}' did not appear within {timeout:?}")]
    ListingMissing { selector: String, timeout: Duration },

    #[error("No class links found")]
    NoClasses,

    #[error("No courses found on learning path: {url}")]
    NoCourses { url: String },

    #[error("Learning path title not found with selector '{selector}'")]
    TitleMissing { selector: String },

    #[error("Failed to login after {attempts} attempts")]
    LoginFailed { attempts: u32 },

    #[error("Resume course number must be between 1 and {available}, got {requested}")]
    InvalidResumeCursor { requested: usize, available: usize },

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Media download failed after {attempts} attempts: {last_error}")]
    MediaExhausted { attempts: u32, last_error: String },
}

impl CrawlError {
    /// Whether this error must abort the whole run rather than a single course or class
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::LoginFailed { .. })
    }
}
