//! Crawl logic.
//!
//! This module contains:
//! - Pacing: randomized delays, retry budgets and page timeouts
//! - Ledger: per-course content hashes of downloaded attachments
//! - Telemetry: media discovery from resource-timing entries
//! - Session: login verification and the captured session snapshot
//! - Acquisition: what a class contributes and how it is fetched
//! - Traversal: learning path → course → class walk
//! - Controller: a whole run across learning paths

pub mod acquisition;
pub mod context;
pub mod controller;
pub mod ledger;
pub mod pacing;
pub mod session;
pub mod telemetry;
pub mod traversal;

pub use acquisition::AcquisitionPolicy;
pub use context::CrawlContext;
pub use controller::{OperatorPrompt, RunController, RunRequest};
pub use ledger::{content_hash, Ledger, LEDGER_FILE};
pub use pacing::{DelayRange, Pacing, PageTimeouts, RetryPolicy};
pub use session::{ensure_login, SessionSnapshot, MAX_LOGIN_ATTEMPTS};
pub use telemetry::{Discovery, DiscoveryStrategy, ResourceTimeline};
pub use traversal::TraversalEngine;
