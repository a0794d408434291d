//! Drives [`HeadlessLogin`] against a fake WebDriver server.

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use quire_core::error::AuthError;
use quire_platform::browser::{BrowserOptions, WebDriverEndpoint};
use quire_platform::login::{Credentials, HeadlessLogin, LoginDriver};

const LOGIN_URL: &str = "https://example.com/sign-in";
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735d66b46a";

// ---------------------------------------------------------------------------
// Fake WebDriver
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeDriver {
    /// Submitting the form moves the page away from the sign-in URL.
    redirect_on_submit: AtomicBool,
    /// Navigation takes longer than any login timeout used here.
    stall_navigation: AtomicBool,
    /// The driver accepts connections but never starts a browser session.
    stall_session: AtomicBool,
    sessions_started: AtomicUsize,
    url: Mutex<String>,
    typed: Mutex<Vec<(String, String)>>,
    sessions_deleted: AtomicUsize,
}

type Shared = Arc<FakeDriver>;

fn value(v: Value) -> Response {
    Json(json!({ "value": v })).into_response()
}

async fn new_session(State(fake): State<Shared>) -> Response {
    if fake.stall_session.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_secs(60)).await;
    }
    fake.sessions_started.fetch_add(1, Ordering::SeqCst);
    value(json!({ "sessionId": "s1", "capabilities": { "browserName": "chrome" } }))
}

async fn navigate(State(fake): State<Shared>, Json(body): Json<Value>) -> Response {
    if fake.stall_navigation.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    *fake.url.lock().unwrap() = body["url"].as_str().unwrap_or_default().to_string();
    value(Value::Null)
}

async fn current_url(State(fake): State<Shared>) -> Response {
    let url = fake.url.lock().unwrap().clone();
    if url.is_empty() {
        return value(json!("about:blank"));
    }
    value(json!(url))
}

async fn find_element(Json(body): Json<Value>) -> Response {
    let id = match body["value"].as_str().unwrap_or_default() {
        r#"input[type="email"]"# => "e-email",
        r#"input[type="password"]"# => "e-password",
        r#"button[type="submit"]"# => "e-submit",
        _ => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "value": {
                        "error": "no such element",
                        "message": "not on page",
                        "stacktrace": "",
                    }
                })),
            )
                .into_response()
        }
    };
    value(json!({ ELEMENT_KEY: id }))
}

async fn send_keys(
    State(fake): State<Shared>,
    Path((_session, element)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let text = body["text"].as_str().unwrap_or_default().to_string();
    fake.typed.lock().unwrap().push((element, text));
    value(Value::Null)
}

async fn click(
    State(fake): State<Shared>,
    Path((_session, element)): Path<(String, String)>,
) -> Response {
    if element == "e-submit" && fake.redirect_on_submit.load(Ordering::SeqCst) {
        *fake.url.lock().unwrap() = "https://example.com/home".to_string();
    }
    value(Value::Null)
}

async fn cookies() -> Response {
    value(json!([
        { "name": "sid", "value": "abc", "domain": ".example.com", "path": "/", "secure": true, "httpOnly": true },
        { "name": "ad", "value": "zzz", "domain": "ads.test", "path": "/", "secure": false, "httpOnly": false },
    ]))
}

async fn delete_session(State(fake): State<Shared>) -> Response {
    fake.sessions_deleted.fetch_add(1, Ordering::SeqCst);
    value(Value::Null)
}

async fn start(fake: Shared) -> HeadlessLogin {
    let app = Router::new()
        .route("/status", get(|| async { value(json!({ "ready": true })) }))
        .route("/session", post(new_session))
        .route("/session/{id}", delete(delete_session))
        .route("/session/{id}/url", get(current_url).post(navigate))
        .route("/session/{id}/element", post(find_element))
        .route("/session/{id}/element/{element}/value", post(send_keys))
        .route("/session/{id}/element/{element}/click", post(click))
        .route("/session/{id}/cookie", get(cookies))
        .with_state(fake);
    let url = common::spawn_server(app).await;

    let options = BrowserOptions::new(WebDriverEndpoint::Remote { url }, "UA/1.0");
    HeadlessLogin::new(options, LOGIN_URL, "example.com").with_step_delay(Duration::ZERO)
}

fn credentials() -> Credentials {
    Credentials {
        email: "ed@example.com".into(),
        password: "hunter2".into(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_captures_cookies_for_platform_domain() {
    let fake = Shared::default();
    fake.redirect_on_submit.store(true, Ordering::SeqCst);
    let login = start(fake.clone()).await;

    let session = login.login(&credentials()).await.unwrap();

    let names: Vec<&str> = session.cookies().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["sid"]);
    assert_eq!(
        *fake.typed.lock().unwrap(),
        vec![
            ("e-email".to_string(), "ed@example.com".to_string()),
            ("e-password".to_string(), "hunter2".to_string()),
        ]
    );
    assert_eq!(fake.sessions_deleted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn staying_on_sign_in_page_is_login_failure() {
    let fake = Shared::default();
    let login = start(fake.clone()).await;

    let err = login.login(&credentials()).await.unwrap_err();

    assert_matches!(err, AuthError::Login(msg) if msg.contains("No redirect"));
    assert_eq!(fake.sessions_deleted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stalled_login_times_out_and_closes_browser() {
    let fake = Shared::default();
    fake.stall_navigation.store(true, Ordering::SeqCst);
    let login = start(fake.clone())
        .await
        .with_timeout(Duration::from_millis(200));

    let err = login.login(&credentials()).await.unwrap_err();

    assert_matches!(err, AuthError::LoginTimeout { .. });
    assert_eq!(fake.sessions_deleted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stalled_session_start_counts_against_login_timeout() {
    let fake = Shared::default();
    fake.stall_session.store(true, Ordering::SeqCst);
    let login = start(fake.clone())
        .await
        .with_timeout(Duration::from_millis(200));

    let started = Instant::now();
    let err = login.login(&credentials()).await.unwrap_err();

    assert_matches!(err, AuthError::LoginTimeout { .. });
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "login ran for {:?}",
        started.elapsed()
    );
    assert_eq!(fake.sessions_started.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_driver_binary_is_login_failure() {
    let login = HeadlessLogin::new(
        BrowserOptions::new(
            WebDriverEndpoint::Spawn {
                binary: "/nonexistent/quire/chromedriver".into(),
                port: 9515,
            },
            "UA/1.0",
        ),
        LOGIN_URL,
        "example.com",
    );

    let err = login.login(&credentials()).await.unwrap_err();

    assert_matches!(err, AuthError::Login(msg) if msg.contains("chromedriver"));
}
