//! Assembles the publisher from configuration.

use std::sync::Arc;

use quire_pipeline::bootstrap::Bootstrapper;
use quire_pipeline::orchestrator::TieredPublisher;
use quire_pipeline::store::{DatabaseBackend, FileBackend, SessionBackend, SessionStore};
use quire_platform::api::HttpConnector;
use quire_platform::browser::BrowserOptions;
use quire_platform::config::{PlatformConfig, PlatformConfigError};
use quire_platform::login::HeadlessLogin;

use crate::config::WorkerConfig;

pub fn platform_config(config: &WorkerConfig) -> Result<PlatformConfig, PlatformConfigError> {
    let mut platform =
        PlatformConfig::new(&config.publication_url)?.with_request_timeout(config.request_timeout);
    if let Some(domain) = &config.cookie_domain {
        platform = platform.with_cookie_domain(domain);
    }
    Ok(platform)
}

/// Database backend first when `DATABASE_URL` is set, the session file always.
pub fn session_store(config: &WorkerConfig) -> SessionStore {
    let primary = config.database_url.as_deref().and_then(|url| {
        match quire_db::create_pool(url) {
            Ok(pool) => Some(Arc::new(DatabaseBackend::new(pool)) as Arc<dyn SessionBackend>),
            Err(e) => {
                tracing::warn!(error = %e, "Invalid DATABASE_URL, using the session file only");
                None
            }
        }
    });
    SessionStore::new(primary, Arc::new(FileBackend::new(&config.session_file)))
}

pub fn headless_login(config: &WorkerConfig, platform: &PlatformConfig) -> HeadlessLogin {
    let mut browser = BrowserOptions::new(config.webdriver.clone(), platform.user_agent.clone());
    browser.headless = config.headless;

    let login_url = config
        .login_url
        .clone()
        .unwrap_or_else(|| platform.default_login_url());

    HeadlessLogin::new(browser, login_url, platform.cookie_domain())
        .with_step_delay(config.login_step_delay)
        .with_timeout(config.login_timeout)
}

/// Everything the `publish` and `verify` commands need.
pub fn build_publisher(config: &WorkerConfig) -> Result<TieredPublisher, PlatformConfigError> {
    let platform = platform_config(config)?;
    let login = headless_login(config, &platform);
    let connector = Arc::new(HttpConnector::new(platform));

    if config.credentials.is_none() {
        tracing::info!("No platform credentials configured, browser login disabled");
    }

    let bootstrapper = Bootstrapper::new(
        Arc::new(session_store(config)),
        connector.clone(),
        Arc::new(login),
        config.credentials.clone(),
    );
    Ok(TieredPublisher::new(Arc::new(bootstrapper), connector))
}
