//! Credential login through a headless browser.
//!
//! The platform has no API keys, so a fresh session is obtained the way a
//! person would: open the sign-in page, type the credentials, submit, and
//! keep the cookies the browser ends up with.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use quire_core::error::AuthError;
use quire_core::session::Session;

use crate::browser::{Browser, BrowserError, BrowserOptions, Page};

/// Fixed pause between dependent browser steps, absorbing redirect latency.
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_secs(3);

/// Wall-clock budget for one whole login attempt.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(90);

/// Account identifier and secret for interactive login.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Something that can turn credentials into a fresh session.
#[async_trait]
pub trait LoginDriver: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError>;
}

/// CSS selectors for the sign-in form.
#[derive(Debug, Clone)]
struct LoginSelectors {
    email: String,
    /// Link that switches the form from magic-link to password entry, if
    /// the page shows one.
    password_option: Option<String>,
    password: String,
    submit: String,
}

impl Default for LoginSelectors {
    fn default() -> Self {
        Self {
            email: r#"input[type="email"]"#.into(),
            password_option: Some("a.login-option".into()),
            password: r#"input[type="password"]"#.into(),
            submit: r#"button[type="submit"]"#.into(),
        }
    }
}

/// [`LoginDriver`] backed by a WebDriver-controlled browser.
#[derive(Debug, Clone)]
pub struct HeadlessLogin {
    browser: BrowserOptions,
    login_url: String,
    cookie_domain: String,
    selectors: LoginSelectors,
    step_delay: Duration,
    timeout: Duration,
}

impl HeadlessLogin {
    pub fn new(
        browser: BrowserOptions,
        login_url: impl Into<String>,
        cookie_domain: impl Into<String>,
    ) -> Self {
        Self {
            browser,
            login_url: login_url.into(),
            cookie_domain: cookie_domain.into(),
            selectors: LoginSelectors::default(),
            step_delay: DEFAULT_STEP_DELAY,
            timeout: DEFAULT_LOGIN_TIMEOUT,
        }
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// navigate → fill → submit → wait → check redirect → extract cookies.
    async fn drive(&self, page: &Page, credentials: &Credentials) -> Result<Session, AuthError> {
        page.goto(&self.login_url).await.map_err(step_failed)?;
        tokio::time::sleep(self.step_delay).await;

        if let Some(selector) = &self.selectors.password_option {
            if page.click_if_present(selector).await.map_err(step_failed)? {
                tokio::time::sleep(self.step_delay).await;
            }
        }

        page.fill(&self.selectors.email, &credentials.email)
            .await
            .map_err(step_failed)?;
        page.fill(&self.selectors.password, &credentials.password)
            .await
            .map_err(step_failed)?;
        page.click(&self.selectors.submit).await.map_err(step_failed)?;
        tokio::time::sleep(self.step_delay).await;

        let current = page.current_url().await.map_err(step_failed)?;
        if is_same_page(&current, &self.login_url) {
            return Err(AuthError::Login(format!(
                "No redirect to an authenticated page (still at {current})"
            )));
        }

        let cookies = page.cookies().await.map_err(step_failed)?;
        let session = Session::new(cookies).scoped_to(&self.cookie_domain);
        if session.is_empty() {
            return Err(AuthError::Login(format!(
                "No cookies for {} were set after login",
                self.cookie_domain
            )));
        }

        tracing::info!(
            cookie_count = session.cookies().len(),
            landed_on = %current,
            "Captured platform session from browser",
        );
        Ok(session)
    }

    fn timed_out(&self) -> AuthError {
        AuthError::LoginTimeout {
            secs: self.timeout.as_secs(),
        }
    }
}

#[async_trait]
impl LoginDriver for HeadlessLogin {
    /// The login timeout covers the whole attempt, driver startup included.
    async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        tracing::info!(login_url = %self.login_url, "Starting headless browser login");
        let deadline = Instant::now() + self.timeout;

        let browser = match tokio::time::timeout_at(deadline, Browser::open(&self.browser)).await {
            Ok(opened) => opened.map_err(step_failed)?,
            Err(_elapsed) => return Err(self.timed_out()),
        };

        let outcome =
            tokio::time::timeout_at(deadline, self.drive(browser.page(), credentials)).await;
        browser.close().await;

        outcome.unwrap_or_else(|_elapsed| Err(self.timed_out()))
    }
}

fn step_failed(e: BrowserError) -> AuthError {
    AuthError::Login(e.to_string())
}

/// Same host and path, ignoring query, fragment and a trailing slash.
fn is_same_page(current: &str, login_url: &str) -> bool {
    match (url::Url::parse(current), url::Url::parse(login_url)) {
        (Ok(a), Ok(b)) => {
            a.host_str() == b.host_str()
                && a.path().trim_end_matches('/') == b.path().trim_end_matches('/')
        }
        _ => current.starts_with(login_url),
    }
}
