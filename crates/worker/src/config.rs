use std::path::PathBuf;
use std::time::Duration;

use quire_platform::browser::WebDriverEndpoint;
use quire_platform::config::DEFAULT_REQUEST_TIMEOUT;
use quire_platform::login::{Credentials, DEFAULT_LOGIN_TIMEOUT, DEFAULT_STEP_DELAY};

const DEFAULT_WEBDRIVER_BINARY: &str = "chromedriver";
const DEFAULT_WEBDRIVER_PORT: u16 = 9515;
const DEV_SESSION_FILE: &str = ".quire/session.json";
const PROD_SESSION_FILE_NAME: &str = "quire-session.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Deployment environment; decides where the session file lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub publication_url: String,
    /// Sign-in page; `None` uses the platform root domain's `/sign-in`.
    pub login_url: Option<String>,
    /// Domain session cookies are scoped to; `None` derives it from the
    /// publication host. Needed for multi-label public suffixes like `co.uk`.
    pub cookie_domain: Option<String>,
    /// Present only when both email and password are set.
    pub credentials: Option<Credentials>,
    pub database_url: Option<String>,
    pub app_env: AppEnv,
    pub session_file: PathBuf,
    pub request_timeout: Duration,
    pub login_timeout: Duration,
    pub login_step_delay: Duration,
    pub webdriver: WebDriverEndpoint,
    pub headless: bool,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                                 |
    /// |--------------------------|-----------------------------------------|
    /// | `PUBLICATION_URL`        | required                                |
    /// | `PLATFORM_LOGIN_URL`     | `https://<root domain>/sign-in`         |
    /// | `PLATFORM_COOKIE_DOMAIN` | last two labels of the publication host |
    /// | `PLATFORM_EMAIL`         | unset                                   |
    /// | `PLATFORM_PASSWORD`      | unset                                   |
    /// | `DATABASE_URL`           | unset (file store only)                 |
    /// | `APP_ENV`                | `development`                           |
    /// | `SESSION_FILE`           | per `APP_ENV`                           |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                                    |
    /// | `LOGIN_TIMEOUT_SECS`     | `90`                                    |
    /// | `LOGIN_STEP_DELAY_MS`    | `3000`                                  |
    /// | `WEBDRIVER_URL`          | unset (spawn `WEBDRIVER_BINARY`)        |
    /// | `WEBDRIVER_BINARY`       | `chromedriver`                          |
    /// | `WEBDRIVER_PORT`         | `9515`                                  |
    /// | `BROWSER_HEADLESS`       | `true`                                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let publication_url = var("PUBLICATION_URL").ok_or(ConfigError::Missing("PUBLICATION_URL"))?;

        let credentials = match (var("PLATFORM_EMAIL"), lookup("PLATFORM_PASSWORD")) {
            (Some(email), Some(password)) if !password.is_empty() => {
                Some(Credentials { email, password })
            }
            _ => None,
        };

        let app_env = match var("APP_ENV").as_deref() {
            None | Some("development") | Some("dev") | Some("test") => AppEnv::Development,
            Some("production") | Some("prod") => AppEnv::Production,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "APP_ENV",
                    value: other.to_string(),
                    expected: "'development' or 'production'",
                })
            }
        };

        let session_file = var("SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_session_file(app_env));

        let request_timeout = match var("REQUEST_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse("REQUEST_TIMEOUT_SECS", &v)?),
            None => DEFAULT_REQUEST_TIMEOUT,
        };
        let login_timeout = match var("LOGIN_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse("LOGIN_TIMEOUT_SECS", &v)?),
            None => DEFAULT_LOGIN_TIMEOUT,
        };
        let login_step_delay = match var("LOGIN_STEP_DELAY_MS") {
            Some(v) => Duration::from_millis(parse("LOGIN_STEP_DELAY_MS", &v)?),
            None => DEFAULT_STEP_DELAY,
        };

        let webdriver = match var("WEBDRIVER_URL") {
            Some(url) => WebDriverEndpoint::Remote { url },
            None => WebDriverEndpoint::Spawn {
                binary: var("WEBDRIVER_BINARY")
                    .unwrap_or_else(|| DEFAULT_WEBDRIVER_BINARY.into())
                    .into(),
                port: match var("WEBDRIVER_PORT") {
                    Some(v) => parse("WEBDRIVER_PORT", &v)?,
                    None => DEFAULT_WEBDRIVER_PORT,
                },
            },
        };

        let headless = match var("BROWSER_HEADLESS") {
            Some(v) => parse("BROWSER_HEADLESS", &v)?,
            None => true,
        };

        Ok(Self {
            publication_url,
            login_url: var("PLATFORM_LOGIN_URL"),
            cookie_domain: var("PLATFORM_COOKIE_DOMAIN")
                .map(|d| d.trim_start_matches('.').to_ascii_lowercase()),
            credentials,
            database_url: var("DATABASE_URL"),
            app_env,
            session_file,
            request_timeout,
            login_timeout,
            login_step_delay,
            webdriver,
            headless,
        })
    }
}

fn default_session_file(app_env: AppEnv) -> PathBuf {
    match app_env {
        AppEnv::Production => std::env::temp_dir().join(PROD_SESSION_FILE_NAME),
        AppEnv::Development => PathBuf::from(DEV_SESSION_FILE),
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
        expected: std::any::type_name::<T>(),
    })
}
