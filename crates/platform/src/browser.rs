//! Browser automation for scripted logins, on top of `fantoccini`.
//!
//! [`Browser::open`] either spawns a local driver (e.g. `chromedriver`) or
//! attaches to a running WebDriver server, then starts a headless browser
//! session. Page commands go through [`Page`]; the driver process is held
//! separately by the [`Browser`] and is spawned with `kill_on_drop(true)`,
//! so dropping a `Browser` on any path never leaves it running.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use fantoccini::error::{CmdError, NewSessionError};
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Map, Value};
use tokio::process::{Child, Command};
use tokio::time::Instant;

use quire_core::session::SessionCookie;

/// Delay between readiness checks while the driver boots.
const STARTUP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on ending the browser session during cleanup.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Where the WebDriver server comes from.
#[derive(Debug, Clone)]
pub enum WebDriverEndpoint {
    /// Spawn `binary --port=<port>` and own the process.
    Spawn { binary: PathBuf, port: u16 },
    /// Use an already-running server at `url`.
    Remote { url: String },
}

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub endpoint: WebDriverEndpoint,
    pub headless: bool,
    pub user_agent: String,
    /// How long to wait for a spawned driver to accept connections.
    pub startup_timeout: Duration,
}

impl BrowserOptions {
    pub fn new(endpoint: WebDriverEndpoint, user_agent: impl Into<String>) -> Self {
        Self {
            endpoint,
            headless: true,
            user_agent: user_agent.into(),
            startup_timeout: Duration::from_secs(15),
        }
    }

    fn chrome_args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-sandbox".to_string(),
            "--disable-gpu".to_string(),
            "--disable-dev-shm-usage".to_string(),
            format!("--user-agent={}", self.user_agent),
        ];
        if self.headless {
            args.insert(0, "--headless=new".to_string());
        }
        args
    }

    fn capabilities(&self) -> Map<String, Value> {
        let mut caps = Map::new();
        caps.insert("browserName".into(), json!("chrome"));
        caps.insert(
            "goog:chromeOptions".into(),
            json!({ "args": self.chrome_args() }),
        );
        caps
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("Failed to start WebDriver '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("WebDriver not ready after {0:?}")]
    NotReady(Duration),

    #[error("TLS setup for WebDriver client failed: {0}")]
    Tls(#[source] std::io::Error),

    #[error("Failed to start browser session: {0}")]
    Session(#[from] NewSessionError),

    #[error("WebDriver command failed: {0}")]
    Command(#[from] CmdError),

    #[error("No element matches '{0}'")]
    ElementNotFound(String),
}

// ---------------------------------------------------------------------------
// Browser
// ---------------------------------------------------------------------------

/// One browser session plus the driver process it runs on, if spawned.
pub struct Browser {
    page: Page,
    driver: Option<Child>,
}

impl Browser {
    /// Start the driver (when spawning) and open a browser session.
    ///
    /// A spawned driver is killed if the session cannot be started, including
    /// when this future is dropped before it completes.
    pub async fn open(options: &BrowserOptions) -> Result<Self, BrowserError> {
        let (url, driver) = match &options.endpoint {
            WebDriverEndpoint::Remote { url } => (url.clone(), None),
            WebDriverEndpoint::Spawn { binary, port } => {
                let child = Command::new(binary)
                    .arg(format!("--port={port}"))
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .kill_on_drop(true)
                    .spawn()
                    .map_err(|source| BrowserError::Spawn {
                        binary: binary.display().to_string(),
                        source,
                    })?;
                tracing::debug!(binary = %binary.display(), port, "Spawned WebDriver");

                let url = format!("http://127.0.0.1:{port}");
                wait_until_ready(&url, options.startup_timeout).await?;
                (url, Some(child))
            }
        };

        let mut builder = ClientBuilder::rustls().map_err(BrowserError::Tls)?;
        builder.capabilities(options.capabilities());
        let client = builder.connect(&url).await?;
        tracing::debug!(webdriver = %url, "Browser session started");

        Ok(Self {
            page: Page { client },
            driver,
        })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// End the browser session and stop the driver. Errors are logged, not
    /// returned: close runs on failure paths too.
    pub async fn close(self) {
        let Self { page, driver } = self;

        match tokio::time::timeout(CLOSE_TIMEOUT, page.client.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Failed to end browser session"),
            Err(_) => tracing::warn!("Timed out ending browser session"),
        }

        if let Some(mut driver) = driver {
            if let Err(e) = driver.kill().await {
                tracing::warn!(error = %e, "Failed to stop WebDriver process");
            }
        }
    }
}

/// Poll `/status` until the driver answers, bounded by `timeout`.
async fn wait_until_ready(base_url: &str, timeout: Duration) -> Result<(), BrowserError> {
    let http = reqwest::Client::new();
    let status_url = format!("{}/status", base_url.trim_end_matches('/'));
    let deadline = Instant::now() + timeout;
    loop {
        let ready = http.get(&status_url).send().await;
        if matches!(&ready, Ok(response) if response.status().is_success()) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(BrowserError::NotReady(timeout));
        }
        tokio::time::sleep(STARTUP_POLL_INTERVAL).await;
    }
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// Commands against the current tab of an open [`Browser`].
pub struct Page {
    client: Client,
}

impl Page {
    pub async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.client.goto(url).await?;
        Ok(())
    }

    pub async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.client.current_url().await?.to_string())
    }

    /// Type `text` into the first element matching `selector`.
    pub async fn fill(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
        let element = self.find(selector).await?;
        element.send_keys(text).await?;
        Ok(())
    }

    /// Click the first element matching `selector`.
    pub async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        self.find(selector).await?.click().await?;
        Ok(())
    }

    /// Click `selector` if the page has it. Returns whether it was clicked.
    pub async fn click_if_present(&self, selector: &str) -> Result<bool, BrowserError> {
        match self.click(selector).await {
            Ok(()) => Ok(true),
            Err(BrowserError::ElementNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// All cookies visible to the current page.
    pub async fn cookies(&self) -> Result<Vec<SessionCookie>, BrowserError> {
        let cookies = self.client.get_all_cookies().await?;
        Ok(cookies.iter().map(session_cookie).collect())
    }

    async fn find(&self, selector: &str) -> Result<fantoccini::elements::Element, BrowserError> {
        self.client
            .find(Locator::Css(selector))
            .await
            .map_err(|e| {
                if e.is_no_such_element() {
                    BrowserError::ElementNotFound(selector.to_string())
                } else {
                    BrowserError::Command(e)
                }
            })
    }
}

fn session_cookie(cookie: &fantoccini::cookies::Cookie<'_>) -> SessionCookie {
    SessionCookie {
        name: cookie.name().to_string(),
        value: cookie.value().to_string(),
        domain: cookie.domain().map(str::to_string),
        path: cookie.path().map(str::to_string),
    }
}
