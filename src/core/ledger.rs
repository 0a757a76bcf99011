//! Per-course ledger of downloaded attachments.
//!
//! A pretty-printed JSON object (`downloaded_files.json`) mapping each
//! written file name to the SHA-256 of its content. An attachment whose
//! hash matches any recorded entry is skipped, whatever its name.
//! Single process, single run per course folder: no locking.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;

/// Ledger file name inside each course folder
pub const LEDGER_FILE: &str = "downloaded_files.json";

/// File name → content hash for one course
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    entries: BTreeMap<String, String>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger file path for a course folder
    pub fn path(course_dir: &Path) -> PathBuf {
        course_dir.join(LEDGER_FILE)
    }

    /// Load a course ledger; a missing file is an empty ledger
    pub async fn load(course_dir: &Path) -> Result<Self> {
        let path = Self::path(course_dir);

        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read ledger: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse ledger: {}", path.display()))
    }

    /// Overwrite the course ledger on disk
    pub async fn save(&self, course_dir: &Path) -> Result<()> {
        let path = Self::path(course_dir);

        fs::create_dir_all(course_dir).await?;

        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write ledger: {}", path.display()))?;

        Ok(())
    }

    /// Whether any recorded file has this content hash
    pub fn contains_hash(&self, hash: &str) -> bool {
        self.name_for_hash(hash).is_some()
    }

    /// Name of a recorded file with this content hash
    pub fn name_for_hash(&self, hash: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, h)| h.as_str() == hash)
            .map(|(name, _)| name.as_str())
    }

    pub fn record(&mut self, name: impl Into<String>, hash: impl Into<String>) {
        self.entries.insert(name.into(), hash.into());
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, h)| (n.as_str(), h.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Hex SHA-256 of a file body
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
