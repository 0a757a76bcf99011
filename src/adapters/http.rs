//! Authenticated HTTP fetcher built on reqwest.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};

use super::{HttpFetcher, HttpResponse};
use crate::core::SessionSnapshot;

/// HTTP client replaying the browser's cookies and headers
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }
}

/// Header map for a session: its header set plus a Cookie header
fn session_headers(session: &SessionSnapshot) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    for (name, value) in session.headers() {
        let name = HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("Invalid header name: {}", name))?;
        let value = HeaderValue::from_str(value)
            .with_context(|| format!("Invalid value for header {}", name))?;
        headers.insert(name, value);
    }

    if let Some(cookie) = session.cookie_header() {
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&cookie).context("Invalid cookie header")?,
        );
    }

    Ok(headers)
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get(&self, url: &str, session: &SessionSnapshot) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .headers(session_headers(session)?)
            .send()
            .await
            .with_context(|| format!("Failed to GET {}", url))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body from {}", url))?
            .to_vec();

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_session_headers_include_cookies() {
        let cookies: BTreeMap<String, String> = [
            ("csrftoken".to_string(), "abc".to_string()),
            ("sessionid".to_string(), "xyz".to_string()),
        ]
        .into_iter()
        .collect();
        let session = SessionSnapshot::new(cookies, "Mozilla/5.0 Test", "https://platzi.com");

        let headers = session_headers(&session).unwrap();
        assert_eq!(headers.get(COOKIE).unwrap(), "csrftoken=abc; sessionid=xyz");
        assert_eq!(headers.get("user-agent").unwrap(), "Mozilla/5.0 Test");
        assert_eq!(headers.get("referer").unwrap(), "https://platzi.com/");
    }
}
