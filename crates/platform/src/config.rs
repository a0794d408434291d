//! Addressing and request identity for one publication.

use std::net::IpAddr;
use std::time::Duration;

use url::Url;

/// Browser identity presented on every API call. The platform rejects
/// requests that do not look like they come from its own editor.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const API_PREFIX: &str = "/api/v1";

/// Errors building a [`PlatformConfig`].
#[derive(Debug, thiserror::Error)]
pub enum PlatformConfigError {
    #[error("Invalid publication URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Publication URL '{0}' has no host")]
    MissingHost(String),
}

/// Where the publication lives and how requests identify themselves.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    origin: String,
    cookie_domain: String,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl PlatformConfig {
    /// Build from the publication's base URL, e.g. `https://weekly.example.com`.
    ///
    /// The cookie domain defaults to the host's last two labels so that
    /// cookies issued for the platform's root domain are sent.
    pub fn new(publication_url: &str) -> Result<Self, PlatformConfigError> {
        let url = Url::parse(publication_url).map_err(|source| PlatformConfigError::InvalidUrl {
            url: publication_url.to_string(),
            source,
        })?;
        let host = url
            .host_str()
            .ok_or_else(|| PlatformConfigError::MissingHost(publication_url.to_string()))?;

        Ok(Self {
            origin: url.origin().ascii_serialization(),
            cookie_domain: root_domain(host),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_cookie_domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie_domain = domain.into();
        self
    }

    /// Publication origin without a trailing slash.
    pub fn publication_url(&self) -> &str {
        &self.origin
    }

    /// Domain whose cookies make up the session.
    pub fn cookie_domain(&self) -> &str {
        &self.cookie_domain
    }

    /// Full URL of an API endpoint such as `/drafts`.
    pub fn api_url(&self, endpoint: &str) -> String {
        format!("{}{API_PREFIX}{endpoint}", self.origin)
    }

    /// The editor page, sent as `Referer`.
    pub fn editor_url(&self) -> String {
        format!("{}/publish", self.origin)
    }

    /// Public URL of a post addressed by slug (or numeric id).
    pub fn post_url(&self, slug: &str) -> String {
        format!("{}/p/{slug}", self.origin)
    }

    /// Sign-in page on the platform's root domain.
    pub fn default_login_url(&self) -> String {
        format!("https://{}/sign-in", self.cookie_domain)
    }
}

fn root_domain(host: &str) -> String {
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if bare.parse::<IpAddr>().is_ok() {
        return bare.to_string();
    }
    let labels: Vec<&str> = bare.split('.').collect();
    if labels.len() <= 2 {
        return bare.to_string();
    }
    labels[labels.len() - 2..].join(".")
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn derives_endpoints_from_publication() {
        let config = PlatformConfig::new("https://weekly.example.com/").unwrap();
        assert_eq!(config.publication_url(), "https://weekly.example.com");
        assert_eq!(config.api_url("/drafts"), "https://weekly.example.com/api/v1/drafts");
        assert_eq!(config.editor_url(), "https://weekly.example.com/publish");
        assert_eq!(config.post_url("moon"), "https://weekly.example.com/p/moon");
        assert_eq!(config.cookie_domain(), "example.com");
        assert_eq!(config.default_login_url(), "https://example.com/sign-in");
    }

    #[test]
    fn ip_hosts_keep_full_address() {
        let config = PlatformConfig::new("http://127.0.0.1:8080").unwrap();
        assert_eq!(config.cookie_domain(), "127.0.0.1");
        assert_eq!(config.publication_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn rejects_garbage_url() {
        assert_matches!(
            PlatformConfig::new("not a url"),
            Err(PlatformConfigError::InvalidUrl { .. })
        );
    }
}
