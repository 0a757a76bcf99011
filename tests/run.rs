//! Run Controller Integration Tests
//!
//! Login handling, per-path failure containment and start-course
//! selection across a whole run.

mod support;

use std::sync::Arc;

use serde_json::Value;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

use platzi_dl::config::PlatformSettings;
use platzi_dl::core::{Pacing, RunController, RunRequest, SessionSnapshot};
use platzi_dl::domain::CourseState;
use platzi_dl::CrawlError;

use support::{
    resolved_config, short_timeouts, FakeBrowser, FakeDownloader, FakeHttp, FakePage,
    ScriptedPrompt,
};

const FRONTEND_URL: &str = "https://platzi.com/ruta/frontend/";
const DATA_URL: &str = "https://platzi.com/ruta/data/";
const BROKEN_URL: &str = "https://platzi.com/ruta/no-existe/";

const HTML_URL: &str = "https://platzi.com/cursos/html/";
const CSS_URL: &str = "https://platzi.com/cursos/css/";
const SQL_URL: &str = "https://platzi.com/cursos/sql/";

fn browser() -> FakeBrowser {
    FakeBrowser::new()
        .with_page(
            FRONTEND_URL,
            FakePage::learning_path("Frontend", &[("HTML", HTML_URL), ("CSS", CSS_URL)]),
        )
        .with_page(DATA_URL, FakePage::learning_path("Data", &[("SQL", SQL_URL)]))
        .with_page(BROKEN_URL, FakePage::default())
        .with_page(HTML_URL, FakePage::course(&[("Etiquetas", "https://platzi.com/clases/html/1/")]))
        .with_page(CSS_URL, FakePage::course(&[("Selectores", "https://platzi.com/clases/css/1/")]))
        .with_page(SQL_URL, FakePage::course(&[("SELECT", "https://platzi.com/clases/sql/1/")]))
}

fn controller(temp: &TempDir) -> RunController {
    RunController::new(resolved_config(temp.path()))
        .with_pacing(Pacing::immediate())
        .with_timeouts(short_timeouts())
}

fn request(urls: &[&str], resume_from: Option<usize>) -> RunRequest {
    RunRequest {
        urls: urls.iter().map(|u| u.to_string()).collect(),
        resume_from,
    }
}

#[tokio::test]
async fn test_login_failure_aborts_run() {
    let temp = TempDir::new().unwrap();
    let browser = Arc::new(browser().logged_out());
    let prompt = ScriptedPrompt::new();

    let err = assert_err!(
        controller(&temp)
            .run_with(
                browser.clone(),
                Arc::new(FakeHttp::new()),
                Arc::new(FakeDownloader::new()),
                request(&[FRONTEND_URL], None),
                &prompt,
            )
            .await
    );

    assert!(matches!(
        err.downcast_ref::<CrawlError>(),
        Some(CrawlError::LoginFailed { attempts: 3 })
    ));
    // Prompted between attempts, not after the last one
    assert_eq!(prompt.login_prompts(), 2);
    assert_eq!(browser.visits(FRONTEND_URL), 0);
    assert!(browser.was_quit());
}

#[tokio::test]
async fn test_manual_login_between_attempts() {
    let temp = TempDir::new().unwrap();
    let browser = Arc::new(browser().logged_out());
    let prompt = ScriptedPrompt::new().logging_in(browser.clone());

    let report = assert_ok!(
        controller(&temp)
            .run_with(
                browser.clone(),
                Arc::new(FakeHttp::new()),
                Arc::new(FakeDownloader::new()),
                request(&[DATA_URL], Some(1)),
                &prompt,
            )
            .await
    );

    assert_eq!(prompt.login_prompts(), 1);
    assert_eq!(report.paths.len(), 1);
    assert!(temp.path().join("Data/01_SQL/01_SELECT.pdf").exists());
    assert!(browser.was_quit());
}

#[tokio::test]
async fn test_single_path_asks_for_start_course() {
    let temp = TempDir::new().unwrap();
    let browser = Arc::new(browser());
    let prompt = ScriptedPrompt::new().starting_at(2);

    let report = assert_ok!(
        controller(&temp)
            .run_with(
                browser.clone(),
                Arc::new(FakeHttp::new()),
                Arc::new(FakeDownloader::new()),
                request(&[FRONTEND_URL], None),
                &prompt,
            )
            .await
    );

    assert_eq!(prompt.start_prompts(), 1);
    let courses = &report.paths[0].courses;
    assert!(matches!(courses[0].state, CourseState::Skipped));
    assert!(courses[1].is_completed());
    assert_eq!(browser.visits(HTML_URL), 0);
    assert!(temp.path().join("Frontend/02_CSS/01_Selectores.pdf").exists());
}

#[tokio::test]
async fn test_resume_flag_applies_to_every_path_without_asking() {
    let temp = TempDir::new().unwrap();
    let browser = Arc::new(browser());
    let prompt = ScriptedPrompt::new();

    let report = assert_ok!(
        controller(&temp)
            .run_with(
                browser.clone(),
                Arc::new(FakeHttp::new()),
                Arc::new(FakeDownloader::new()),
                request(&[FRONTEND_URL, DATA_URL], Some(2)),
                &prompt,
            )
            .await
    );

    assert_eq!(prompt.start_prompts(), 0);
    assert_eq!(report.paths.len(), 2);
    assert!(report.paths[0].courses[1].is_completed());
    // Data has a single course, so everything there is before the cursor
    assert!(matches!(report.paths[1].courses[0].state, CourseState::Skipped));
    assert_eq!(browser.visits(SQL_URL), 0);
}

#[tokio::test]
async fn test_broken_path_does_not_stop_the_others() {
    let temp = TempDir::new().unwrap();
    let browser = Arc::new(browser());
    let prompt = ScriptedPrompt::new();

    let report = assert_ok!(
        controller(&temp)
            .run_with(
                browser.clone(),
                Arc::new(FakeHttp::new()),
                Arc::new(FakeDownloader::new()),
                request(&[BROKEN_URL, DATA_URL], None),
                &prompt,
            )
            .await
    );

    // Several paths: no start prompt, every path starts at course 1
    assert_eq!(prompt.start_prompts(), 0);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].url, BROKEN_URL);
    assert!(report.failures[0].error.contains("No courses found"));

    assert_eq!(report.paths.len(), 1);
    assert_eq!(report.paths[0].title, "Data");
    assert_eq!(report.written(), 1);
    assert!(browser.was_quit());
}

#[tokio::test]
async fn test_non_string_user_agent_becomes_empty_header() {
    let browser = browser().with_user_agent(Value::Null);

    let snapshot = assert_ok!(SessionSnapshot::capture(&browser, &PlatformSettings::default()).await);

    assert_eq!(snapshot.user_agent(), Some(""));
    assert_eq!(snapshot.cookies().get("sessionid").map(String::as_str), Some("abc123"));
}
