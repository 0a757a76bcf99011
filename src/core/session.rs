//! Login verification and the session snapshot threaded through the crawl.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::adapters::{BrowserSession, USER_AGENT_SCRIPT};
use crate::config::PlatformSettings;
use crate::error::CrawlError;

use super::controller::OperatorPrompt;
use super::pacing::PageTimeouts;

/// Attempts at finding a logged-in profile before giving up
pub const MAX_LOGIN_ATTEMPTS: u32 = 3;

/// Cookies and headers captured once after login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    cookies: BTreeMap<String, String>,
    headers: Vec<(String, String)>,
}

impl SessionSnapshot {
    /// Build the snapshot's header set for a browser user agent and site origin
    pub fn new(cookies: BTreeMap<String, String>, user_agent: &str, origin: &str) -> Self {
        let origin = origin.trim_end_matches('/');
        let headers = vec![
            ("User-Agent".to_string(), user_agent.to_string()),
            ("Accept".to_string(), "*/*".to_string()),
            ("Accept-Language".to_string(), "en-US,en;q=0.5".to_string()),
            ("Origin".to_string(), origin.to_string()),
            ("Referer".to_string(), format!("{}/", origin)),
            ("Connection".to_string(), "keep-alive".to_string()),
        ];

        Self { cookies, headers }
    }

    /// Read user agent and cookies from the logged-in browser
    pub async fn capture(browser: &dyn BrowserSession, platform: &PlatformSettings) -> Result<Self> {
        let user_agent = match browser
            .evaluate(USER_AGENT_SCRIPT)
            .await
            .context("Failed to read user agent")?
        {
            serde_json::Value::String(user_agent) => user_agent,
            other => {
                warn!(value = %other, "Browser returned no user agent, sending an empty one");
                String::new()
            }
        };

        let cookies = browser.cookies().await?;
        debug!(cookies = cookies.len(), %user_agent, "Captured session");

        Ok(Self::new(cookies, &user_agent, &platform.origin))
    }

    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name == "User-Agent")
            .map(|(_, value)| value.as_str())
    }

    /// `name=value; ...`, or `None` without cookies
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }

        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

async fn is_logged_in(
    browser: &dyn BrowserSession,
    platform: &PlatformSettings,
    timeouts: &PageTimeouts,
) -> Result<bool> {
    for selector in &platform.profile_selectors {
        if browser
            .wait_for_element(selector, timeouts.profile_marker)
            .await?
        {
            info!(%selector, "Profile element found");
            return Ok(true);
        }
        debug!(%selector, "Profile element not found");
    }

    Ok(false)
}

/// Make sure the browser holds a logged-in session, asking the operator
/// to log in by hand between attempts
pub async fn ensure_login(
    browser: &dyn BrowserSession,
    platform: &PlatformSettings,
    timeouts: &PageTimeouts,
    prompt: &dyn OperatorPrompt,
) -> Result<()> {
    info!("Verifying session...");
    browser.navigate(&platform.origin).await?;
    browser.wait_for_load(timeouts.page_load).await?;

    for attempt in 1..=MAX_LOGIN_ATTEMPTS {
        if is_logged_in(browser, platform, timeouts).await? {
            info!("Active session detected");
            return Ok(());
        }

        if attempt < MAX_LOGIN_ATTEMPTS {
            warn!(
                attempt,
                max_attempts = MAX_LOGIN_ATTEMPTS,
                "No active session detected, waiting for manual login"
            );
            prompt.await_manual_login(attempt, MAX_LOGIN_ATTEMPTS).await?;
            browser.refresh().await?;
            browser.wait_for_load(timeouts.page_load).await?;
        }
    }

    warn!("Login attempts exhausted");
    Err(CrawlError::LoginFailed {
        attempts: MAX_LOGIN_ATTEMPTS,
    }
    .into())
}
