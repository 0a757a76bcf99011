//! Scripted fakes for the browser, HTTP client and media downloader.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use platzi_dl::adapters::{
    BrowserSession, FormatPolicy, HttpFetcher, HttpResponse, MediaDownloader, READY_STATE_SCRIPT,
    USER_AGENT_SCRIPT,
};
use platzi_dl::config::{PlatformSettings, ResolvedConfig};
use platzi_dl::core::telemetry::RESOURCE_ENTRIES_SCRIPT;
use platzi_dl::core::{CrawlContext, OperatorPrompt, Pacing, PageTimeouts, SessionSnapshot};
use platzi_dl::diagnostics::Diagnostics;
use platzi_dl::domain::{Anchor, LearningPath, ResumeCursor};

pub const FAKE_USER_AGENT: &str = "FakeBrowser/1.0";
pub const PDF_BYTES: &[u8] = b"%PDF-1.4 fake page";

/// One scripted page
#[derive(Debug, Default, Clone)]
pub struct FakePage {
    pub title: Option<String>,
    pub course_anchors: Vec<Anchor>,
    pub class_anchors: Vec<Anchor>,
    pub resources: Vec<String>,
}

impl FakePage {
    pub fn learning_path(title: &str, courses: &[(&str, &str)]) -> Self {
        Self {
            title: Some(title.to_string()),
            course_anchors: anchors(courses),
            ..Default::default()
        }
    }

    pub fn course(classes: &[(&str, &str)]) -> Self {
        Self {
            class_anchors: anchors(classes),
            ..Default::default()
        }
    }

    pub fn class(resources: &[&str]) -> Self {
        Self {
            resources: resources.iter().map(|r| r.to_string()).collect(),
            ..Default::default()
        }
    }
}

pub fn anchors(pairs: &[(&str, &str)]) -> Vec<Anchor> {
    pairs.iter().map(|(text, href)| Anchor::new(*text, *href)).collect()
}

/// Browser answering from a URL → page map
pub struct FakeBrowser {
    platform: PlatformSettings,
    pages: Mutex<HashMap<String, FakePage>>,
    /// Listing failures left before a course page shows its classes
    listing_failures: Mutex<HashMap<String, usize>>,
    current: Mutex<Option<String>>,
    navigations: Mutex<Vec<String>>,
    logged_in: AtomicBool,
    user_agent: Value,
    prints: AtomicUsize,
    quit: AtomicBool,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self {
            platform: PlatformSettings::default(),
            pages: Mutex::new(HashMap::new()),
            listing_failures: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            navigations: Mutex::new(Vec::new()),
            logged_in: AtomicBool::new(true),
            user_agent: json!(FAKE_USER_AGENT),
            prints: AtomicUsize::new(0),
            quit: AtomicBool::new(false),
        }
    }

    pub fn with_page(self, url: &str, page: FakePage) -> Self {
        self.pages.lock().unwrap().insert(url.to_string(), page);
        self
    }

    /// The class listing of `url` is missing for the first `times` visits
    pub fn with_listing_failures(self, url: &str, times: usize) -> Self {
        self.listing_failures
            .lock()
            .unwrap()
            .insert(url.to_string(), times);
        self
    }

    /// What `navigator.userAgent` evaluates to
    pub fn with_user_agent(mut self, value: Value) -> Self {
        self.user_agent = value;
        self
    }

    pub fn logged_out(self) -> Self {
        self.logged_in.store(false, Ordering::SeqCst);
        self
    }

    pub fn log_in(&self) {
        self.logged_in.store(true, Ordering::SeqCst);
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn visits(&self, url: &str) -> usize {
        self.navigations().iter().filter(|u| *u == url).count()
    }

    pub fn prints(&self) -> usize {
        self.prints.load(Ordering::SeqCst)
    }

    pub fn was_quit(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }

    fn current_page(&self) -> FakePage {
        let current = self.current.lock().unwrap().clone();
        current
            .and_then(|url| self.pages.lock().unwrap().get(&url).cloned())
            .unwrap_or_default()
    }

    fn class_listing_visible(&self) -> bool {
        let Some(url) = self.current.lock().unwrap().clone() else {
            return false;
        };

        let mut failures = self.listing_failures.lock().unwrap();
        if let Some(left) = failures.get_mut(&url) {
            if *left > 0 {
                *left -= 1;
                return false;
            }
        }
        drop(failures);

        !self.current_page().class_anchors.is_empty()
    }
}

#[async_trait]
impl BrowserSession for FakeBrowser {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.navigations.lock().unwrap().push(url.to_string());
        *self.current.lock().unwrap() = Some(url.to_string());
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        Ok(match script {
            READY_STATE_SCRIPT => json!("complete"),
            USER_AGENT_SCRIPT => self.user_agent.clone(),
            RESOURCE_ENTRIES_SCRIPT => Value::Array(
                self.current_page()
                    .resources
                    .iter()
                    .map(|name| json!({"name": name, "entryType": "resource"}))
                    .collect(),
            ),
            _ => Value::Null,
        })
    }

    async fn wait_for_element(&self, selector: &str, _timeout: Duration) -> Result<bool> {
        if self.platform.profile_selectors.iter().any(|s| s == selector) {
            return Ok(self.logged_in.load(Ordering::SeqCst));
        }
        if selector == self.platform.course_link_selector {
            return Ok(!self.current_page().course_anchors.is_empty());
        }
        if selector == self.platform.class_link_selector {
            return Ok(self.class_listing_visible());
        }
        Ok(false)
    }

    async fn element_text(&self, selector: &str) -> Result<Option<String>> {
        if selector == self.platform.path_title_selector {
            return Ok(self.current_page().title);
        }
        Ok(None)
    }

    async fn anchors(&self, selector: &str, _title_selector: Option<&str>) -> Result<Vec<Anchor>> {
        let page = self.current_page();
        if selector == self.platform.course_link_selector {
            return Ok(page.course_anchors);
        }
        if selector == self.platform.class_link_selector {
            return Ok(page.class_anchors);
        }
        Ok(Vec::new())
    }

    async fn cookies(&self) -> Result<BTreeMap<String, String>> {
        Ok([("sessionid".to_string(), "abc123".to_string())]
            .into_iter()
            .collect())
    }

    async fn print_to_pdf(&self) -> Result<Vec<u8>> {
        self.prints.fetch_add(1, Ordering::SeqCst);
        Ok(PDF_BYTES.to_vec())
    }

    async fn quit(&self) -> Result<()> {
        self.quit.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// HTTP fetcher answering from a URL → response map; unknown URLs are 404
#[derive(Default)]
pub struct FakeHttp {
    responses: Mutex<HashMap<String, HttpResponse>>,
    requests: Mutex<Vec<String>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(self, url: &str, value: Value) -> Self {
        self.with_body(url, 200, value.to_string().into_bytes())
    }

    pub fn with_body(self, url: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.responses.lock().unwrap().insert(
            url.to_string(),
            HttpResponse {
                status,
                body: body.into(),
            },
        );
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requested(&self, url: &str) -> usize {
        self.requests().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl HttpFetcher for FakeHttp {
    async fn get(&self, url: &str, session: &SessionSnapshot) -> Result<HttpResponse> {
        assert_eq!(session.user_agent(), Some(FAKE_USER_AGENT));
        self.requests.lock().unwrap().push(url.to_string());

        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or(HttpResponse {
                status: 404,
                body: Vec::new(),
            }))
    }
}

/// Downloader that fails a scripted number of times, then writes a file
pub struct FakeDownloader {
    failures_left: AtomicU32,
    calls: AtomicU32,
    urls: Mutex<Vec<String>>,
}

impl FakeDownloader {
    pub fn new() -> Self {
        Self::failing(0)
    }

    pub fn failing(times: u32) -> Self {
        Self {
            failures_left: AtomicU32::new(times),
            calls: AtomicU32::new(0),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaDownloader for FakeDownloader {
    fn name(&self) -> &str {
        "fake"
    }

    async fn fetch(
        &self,
        url: &str,
        output: &Path,
        policy: &FormatPolicy,
        _session: &SessionSnapshot,
    ) -> Result<()> {
        assert_eq!(policy.max_height, 1080);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());

        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            anyhow::bail!("stream interrupted");
        }

        tokio::fs::write(output, b"fake video").await?;
        Ok(())
    }
}

/// Prompt with canned answers; can log the browser in when asked
pub struct ScriptedPrompt {
    start: Option<usize>,
    login_browser: Option<Arc<FakeBrowser>>,
    login_prompts: AtomicU32,
    start_prompts: AtomicU32,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self {
            start: None,
            login_browser: None,
            login_prompts: AtomicU32::new(0),
            start_prompts: AtomicU32::new(0),
        }
    }

    pub fn starting_at(mut self, ordinal: usize) -> Self {
        self.start = Some(ordinal);
        self
    }

    pub fn logging_in(mut self, browser: Arc<FakeBrowser>) -> Self {
        self.login_browser = Some(browser);
        self
    }

    pub fn login_prompts(&self) -> u32 {
        self.login_prompts.load(Ordering::SeqCst)
    }

    pub fn start_prompts(&self) -> u32 {
        self.start_prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OperatorPrompt for ScriptedPrompt {
    async fn await_manual_login(&self, _attempt: u32, _max_attempts: u32) -> Result<()> {
        self.login_prompts.fetch_add(1, Ordering::SeqCst);
        if let Some(browser) = &self.login_browser {
            browser.log_in();
        }
        Ok(())
    }

    async fn choose_start_course(&self, path: &LearningPath) -> Result<ResumeCursor> {
        self.start_prompts.fetch_add(1, Ordering::SeqCst);
        match self.start {
            Some(n) => Ok(ResumeCursor::new(n, path.courses.len())?),
            None => Ok(ResumeCursor::default()),
        }
    }
}

pub fn short_timeouts() -> PageTimeouts {
    PageTimeouts {
        page_load: Duration::from_secs(1),
        course_load: Duration::from_secs(1),
        class_listing: Duration::from_millis(10),
        course_listing: Duration::from_millis(10),
        profile_marker: Duration::from_millis(10),
    }
}

pub fn session() -> SessionSnapshot {
    let cookies = [("sessionid".to_string(), "abc123".to_string())]
        .into_iter()
        .collect();
    SessionSnapshot::new(cookies, FAKE_USER_AGENT, "https://platzi.com")
}

/// Crawl context over fakes with no pacing delays
pub fn context(
    browser: Arc<FakeBrowser>,
    http: Arc<FakeHttp>,
    media: Arc<FakeDownloader>,
    base_dir: &Path,
) -> Arc<CrawlContext> {
    Arc::new(CrawlContext {
        browser,
        http,
        media,
        session: session(),
        platform: PlatformSettings::default(),
        pacing: Pacing::immediate(),
        timeouts: short_timeouts(),
        format: FormatPolicy::default(),
        diagnostics: Diagnostics::new(base_dir.join("debug")),
    })
}

pub fn resolved_config(base_dir: &Path) -> ResolvedConfig {
    ResolvedConfig {
        base_dir: base_dir.to_path_buf(),
        webdriver_url: "http://localhost:9515".to_string(),
        user_data_dir: None,
        headless: true,
        ytdlp: "yt-dlp".to_string(),
        http_timeout: Duration::from_secs(5),
        media_timeout: Duration::from_secs(5),
        platform: PlatformSettings::default(),
        config_file: None,
    }
}

/// Every file under `dir`, relative and sorted
pub fn files_under(dir: &Path) -> Vec<String> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(root, &path, out);
            } else if let Ok(rel) = path.strip_prefix(root) {
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }

    let mut out = Vec::new();
    walk(dir, dir, &mut out);
    out.sort();
    out
}
