//! yt-dlp media downloader.
//!
//! Spawns `yt-dlp` for each stream. Session cookies are handed over in
//! a Netscape cookie file inside a throwaway temp directory, headers as
//! `--add-header` pairs.

use std::fmt::Write as _;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use super::{FormatPolicy, MediaDownloader};
use crate::core::SessionSnapshot;

/// Media downloader using the yt-dlp CLI
pub struct YtDlpDownloader {
    /// Path to the yt-dlp binary (default: "yt-dlp")
    binary_path: String,

    /// Domain the session cookies are scoped to
    cookie_domain: String,

    /// Upper bound for a single download
    download_timeout: Duration,
}

impl YtDlpDownloader {
    pub fn new(
        binary_path: impl Into<String>,
        cookie_domain: impl Into<String>,
        download_timeout: Duration,
    ) -> Self {
        Self {
            binary_path: binary_path.into(),
            cookie_domain: cookie_domain.into(),
            download_timeout,
        }
    }

    /// Render session cookies in Netscape cookie-file format
    fn cookie_file_contents(&self, session: &SessionSnapshot) -> String {
        let mut out = String::from("# Netscape HTTP Cookie File\n");
        for (name, value) in session.cookies() {
            let _ = writeln!(
                out,
                "{}\tTRUE\t/\tTRUE\t0\t{}\t{}",
                self.cookie_domain, name, value
            );
        }
        out
    }

    fn build_args(
        &self,
        url: &str,
        output: &Path,
        policy: &FormatPolicy,
        session: &SessionSnapshot,
        cookie_file: &Path,
    ) -> Vec<String> {
        let mut args = vec![
            url.to_string(),
            "-o".to_string(),
            output.display().to_string(),
            "-f".to_string(),
            policy.selector(),
            "--cookies".to_string(),
            cookie_file.display().to_string(),
            "--hls-prefer-native".to_string(),
            "--hls-use-mpegts".to_string(),
        ];

        for (name, value) in session.headers() {
            args.push("--add-header".to_string());
            args.push(format!("{}:{}", name, value));
        }

        args
    }
}

#[async_trait]
impl MediaDownloader for YtDlpDownloader {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn fetch(
        &self,
        url: &str,
        output: &Path,
        policy: &FormatPolicy,
        session: &SessionSnapshot,
    ) -> Result<()> {
        let temp_dir = tempfile::tempdir().context("Failed to create temp dir")?;
        let cookie_file = temp_dir.path().join("cookies.txt");
        tokio::fs::write(&cookie_file, self.cookie_file_contents(session))
            .await
            .context("Failed to write cookie file")?;

        let args = self.build_args(url, output, policy, session, &cookie_file);

        let child = Command::new(&self.binary_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.binary_path))?;

        let result = timeout(self.download_timeout, child.wait_with_output())
            .await
            .with_context(|| format!("yt-dlp timed out after {:?}", self.download_timeout))?
            .context("Failed to wait for yt-dlp")?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let exit_code = result.status.code().unwrap_or(-1);
            anyhow::bail!("yt-dlp failed with exit code {}: {}", exit_code, stderr.trim());
        }

        Ok(())
    }
}
