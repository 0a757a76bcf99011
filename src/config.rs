//! Configuration for platzi-dl.
//!
//! Configuration sources (highest priority first):
//! 1. CLI flags (`--base-dir`, `--webdriver`), applied by the caller
//! 2. Environment variables (PLATZI_DL_BASE_DIR, PLATZI_DL_WEBDRIVER,
//!    PLATZI_DL_USER_DATA_DIR, PLATZI_DL_YTDLP)
//! 3. Config file (.platzi-dl/config.yaml)
//! 4. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .platzi-dl/config.yaml
//! - Paths in config file are relative to the directory holding .platzi-dl/

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const CONFIG_DIR: &str = ".platzi-dl";
const CONFIG_FILE: &str = "config.yaml";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub browser: Option<BrowserConfig>,
    #[serde(default)]
    pub platform: Option<PlatformSettings>,
    #[serde(default)]
    pub timeouts: Option<TimeoutsConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Download root (relative to the project directory)
    pub base_dir: Option<String>,
    /// yt-dlp binary
    pub ytdlp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    pub webdriver_url: Option<String>,
    pub user_data_dir: Option<String>,
    #[serde(default)]
    pub headless: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsConfig {
    pub http_seconds: Option<u64>,
    pub media_seconds: Option<u64>,
}

/// Platform-specific URLs and page selectors.
///
/// Selectors starting with `/` are XPath, anything else is CSS.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformSettings {
    /// Site origin, also used for Origin/Referer headers
    pub origin: String,
    /// Host serving HLS playlists
    pub media_host: String,
    /// Path fragment of the attachment listing API
    pub attachments_api_path: String,
    /// Domain cookies are scoped to when handed to the media downloader
    pub cookie_domain: String,
    pub course_link_selector: String,
    pub course_title_selector: String,
    pub path_title_selector: String,
    pub class_link_selector: String,
    pub profile_selectors: Vec<String>,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            origin: "https://platzi.com".to_string(),
            media_host: "mediastream.platzi.com".to_string(),
            attachments_api_path: "api.platzi.com/api/v4/material/files-links/".to_string(),
            cookie_domain: ".platzi.com".to_string(),
            course_link_selector: "a.Course_Course__bLjGn".to_string(),
            course_title_selector: "h3".to_string(),
            path_title_selector: "/html/body/div/div[2]/div/div/div[1]/div[1]/div[1]/h1".to_string(),
            class_link_selector: ".ContentClass-item-link".to_string(),
            profile_selectors: vec![
                "/html/body/div/header/nav/div[3]/div/div/div".to_string(),
                "/html/body/div[1]/div[2]/header/div/div[3]/div/button/div[1]".to_string(),
            ],
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Download root; learning paths and `debug/` live under it
    pub base_dir: PathBuf,
    /// WebDriver endpoint (chromedriver)
    pub webdriver_url: String,
    /// Chrome profile holding the logged-in session
    pub user_data_dir: Option<PathBuf>,
    pub headless: bool,
    /// yt-dlp binary
    pub ytdlp: String,
    pub http_timeout: Duration,
    pub media_timeout: Duration,
    pub platform: PlatformSettings,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Directory for the debug log and telemetry snapshots
    pub fn debug_dir(&self) -> PathBuf {
        self.base_dir.join("debug")
    }

    /// Apply CLI overrides on top of the resolved configuration
    pub fn with_overrides(mut self, base_dir: Option<PathBuf>, webdriver_url: Option<String>) -> Self {
        if let Some(base_dir) = base_dir {
            self.base_dir = base_dir;
        }
        if let Some(url) = webdriver_url {
            self.webdriver_url = url;
        }
        self
    }
}

/// Default Chrome profile location for the current platform
fn default_user_data_dir() -> Option<PathBuf> {
    if cfg!(target_os = "macos") {
        dirs::home_dir().map(|h| h.join("Library/Application Support/Google/Chrome"))
    } else {
        dirs::config_dir().map(|c| c.join("google-chrome"))
    }
}

/// Find config file by searching a directory and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Load configuration from all sources, searching from `cwd`
fn load_config_from(cwd: &Path) -> Result<ResolvedConfig> {
    let config_file = find_config_file(cwd);
    let parsed = config_file.as_deref().map(load_config_file).transpose()?;

    // Project directory is the parent of .platzi-dl/
    let project_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .and_then(Path::parent)
        .unwrap_or(cwd)
        .to_path_buf();

    let (paths, browser, platform, timeouts) = match parsed {
        Some(file) => (file.paths, file.browser, file.platform, file.timeouts),
        None => (PathsConfig::default(), None, None, None),
    };

    let base_dir = match std::env::var("PLATZI_DL_BASE_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => paths
            .base_dir
            .as_deref()
            .map(|p| resolve_path(&project_dir, p))
            .unwrap_or_else(|| cwd.join("Platzi_Downloads")),
    };

    let webdriver_url = std::env::var("PLATZI_DL_WEBDRIVER").ok().unwrap_or_else(|| {
        browser
            .as_ref()
            .and_then(|b| b.webdriver_url.clone())
            .unwrap_or_else(|| "http://localhost:9515".to_string())
    });

    let user_data_dir = match std::env::var("PLATZI_DL_USER_DATA_DIR") {
        Ok(dir) => Some(PathBuf::from(dir)),
        Err(_) => browser
            .as_ref()
            .and_then(|b| b.user_data_dir.as_deref())
            .map(|p| resolve_path(&project_dir, p))
            .or_else(default_user_data_dir),
    };

    let ytdlp = std::env::var("PLATZI_DL_YTDLP")
        .ok()
        .or(paths.ytdlp)
        .unwrap_or_else(|| "yt-dlp".to_string());

    let http_seconds = timeouts.as_ref().and_then(|t| t.http_seconds).unwrap_or(120);
    let media_seconds = timeouts.as_ref().and_then(|t| t.media_seconds).unwrap_or(3600);

    Ok(ResolvedConfig {
        base_dir,
        webdriver_url,
        user_data_dir,
        headless: browser.map(|b| b.headless).unwrap_or(false),
        ytdlp,
        http_timeout: Duration::from_secs(http_seconds),
        media_timeout: Duration::from_secs(media_seconds),
        platform: platform.unwrap_or_default(),
        config_file,
    })
}

fn load_config() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    load_config_from(&cwd)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(CONFIG_DIR);
        std::fs::create_dir_all(&dir).unwrap();

        let config_path = dir.join(CONFIG_FILE);
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
paths:
  base_dir: ./downloads
browser:
  webdriver_url: http://127.0.0.1:4444
  headless: true
platform:
  media_host: media.example.com
timeouts:
  media_seconds: 60
"#
        )
        .unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.paths.base_dir, Some("./downloads".to_string()));

        let browser = config.browser.unwrap();
        assert_eq!(browser.webdriver_url.as_deref(), Some("http://127.0.0.1:4444"));
        assert!(browser.headless);

        // Unspecified platform fields keep their defaults
        let platform = config.platform.unwrap();
        assert_eq!(platform.media_host, "media.example.com");
        assert_eq!(platform.class_link_selector, ".ContentClass-item-link");
        assert_eq!(config.timeouts.unwrap().media_seconds, Some(60));
    }

    #[test]
    fn test_config_discovered_from_subdirectory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(CONFIG_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(CONFIG_FILE),
            "version: \"1.0\"\ntimeouts:\n  http_seconds: 5\n",
        )
        .unwrap();

        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config_file(&nested), Some(dir.join(CONFIG_FILE)));

        let config = load_config_from(&nested).unwrap();
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.config_file, Some(dir.join(CONFIG_FILE)));
    }

    #[test]
    fn test_cli_overrides() {
        let temp = TempDir::new().unwrap();
        let config = load_config_from(temp.path())
            .unwrap()
            .with_overrides(Some(PathBuf::from("/data")), Some("http://h:1".to_string()));

        assert_eq!(config.base_dir, PathBuf::from("/data"));
        assert_eq!(config.debug_dir(), PathBuf::from("/data/debug"));
        assert_eq!(config.webdriver_url, "http://h:1");
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "downloads"),
            PathBuf::from("/home/user/project/downloads")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
