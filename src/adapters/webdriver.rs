//! WebDriver-backed browser session.
//!
//! Drives a local Chrome through chromedriver using the operator's own
//! profile, so an existing platform login is reused.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::wd::PrintConfiguration;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;

use super::BrowserSession;
use crate::domain::Anchor;

/// Browser session over the WebDriver protocol
pub struct WebDriverSession {
    client: Client,
}

impl WebDriverSession {
    /// Start a Chrome session through the WebDriver server at `webdriver_url`
    pub async fn connect(
        webdriver_url: &str,
        user_data_dir: Option<&Path>,
        headless: bool,
    ) -> Result<Self> {
        let mut args = vec!["--start-maximized".to_string()];
        if let Some(dir) = user_data_dir {
            args.push(format!("user-data-dir={}", dir.display()));
        }
        if headless {
            args.push("--headless=new".to_string());
        }

        let mut capabilities = serde_json::Map::new();
        capabilities.insert("goog:chromeOptions".to_string(), json!({ "args": args }));

        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(webdriver_url)
            .await
            .with_context(|| format!("Failed to connect to WebDriver at {}", webdriver_url))?;

        Ok(Self { client })
    }
}

/// `/`-prefixed selectors are XPath, everything else CSS
fn locator(selector: &str) -> Locator<'_> {
    if selector.starts_with('/') {
        Locator::XPath(selector)
    } else {
        Locator::Css(selector)
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.client
            .goto(url)
            .await
            .with_context(|| format!("Failed to navigate to {}", url))
    }

    async fn refresh(&self) -> Result<()> {
        self.client.refresh().await.context("Failed to refresh page")
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        self.client
            .execute(script, Vec::new())
            .await
            .context("Failed to execute script")
    }

    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<bool> {
        match self
            .client
            .wait()
            .at_most(timeout)
            .for_element(locator(selector))
            .await
        {
            Ok(_) => Ok(true),
            Err(CmdError::WaitTimeout) => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed waiting for '{}'", selector)),
        }
    }

    async fn element_text(&self, selector: &str) -> Result<Option<String>> {
        match self.client.find(locator(selector)).await {
            Ok(element) => Ok(Some(element.text().await?.trim().to_string())),
            Err(e) if e.is_no_such_element() => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to find '{}'", selector)),
        }
    }

    async fn anchors(&self, selector: &str, title_selector: Option<&str>) -> Result<Vec<Anchor>> {
        let elements = self
            .client
            .find_all(locator(selector))
            .await
            .with_context(|| format!("Failed to find '{}'", selector))?;

        let mut anchors = Vec::with_capacity(elements.len());
        for element in elements {
            let text = match title_selector {
                Some(title) => element.find(locator(title)).await?.text().await?,
                None => element.text().await?,
            };
            let href = element.prop("href").await?.unwrap_or_default();
            anchors.push(Anchor::new(text.trim(), href));
        }

        Ok(anchors)
    }

    async fn cookies(&self) -> Result<BTreeMap<String, String>> {
        let cookies = self
            .client
            .get_all_cookies()
            .await
            .context("Failed to read browser cookies")?;

        Ok(cookies
            .iter()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect())
    }

    async fn print_to_pdf(&self) -> Result<Vec<u8>> {
        let config = PrintConfiguration::builder()
            .background(true)
            .build()
            .map_err(|e| anyhow::anyhow!("Invalid print configuration: {:?}", e))?;

        self.client
            .print(config)
            .await
            .context("Failed to print page to PDF")
    }

    async fn quit(&self) -> Result<()> {
        self.client
            .clone()
            .close()
            .await
            .context("Failed to close browser session")
    }
}
