//! Authenticated platform session.
//!
//! A [`Session`] is the set of cookies captured from a logged-in browser.
//! It is valid or it is discarded; nothing mutates it in place.

use serde::{Deserialize, Serialize};

/// One captured cookie record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: Some(domain.into()),
            path: Some("/".into()),
        }
    }

    /// `true` when the cookie's domain is `root` or a subdomain of it.
    /// Cookies without a domain never match.
    pub fn belongs_to(&self, root: &str) -> bool {
        let Some(domain) = self.domain.as_deref() else {
            return false;
        };
        let domain = domain.trim_start_matches('.');
        domain.eq_ignore_ascii_case(root)
            || domain
                .to_ascii_lowercase()
                .ends_with(&format!(".{}", root.to_ascii_lowercase()))
    }
}

/// An opaque credential bundle for the platform.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    cookies: Vec<SessionCookie>,
}

impl Session {
    pub fn new(cookies: Vec<SessionCookie>) -> Self {
        Self { cookies }
    }

    pub fn cookies(&self) -> &[SessionCookie] {
        &self.cookies
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Keep only cookies scoped to `root` (or its subdomains).
    pub fn scoped_to(&self, root: &str) -> Session {
        Session::new(
            self.cookies
                .iter()
                .filter(|c| c.belongs_to(root))
                .cloned()
                .collect(),
        )
    }

    /// `Cookie` header value built from the cookies scoped to `root`.
    pub fn cookie_header(&self, root: &str) -> String {
        self.cookies
            .iter()
            .filter(|c| c.belongs_to(root))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Persisted form: a JSON array of cookie records.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.cookies)
    }

    /// Parse the persisted form. An empty array is an error here so callers
    /// can treat it the same as a corrupt payload.
    pub fn from_json(raw: &str) -> Result<Session, SessionParseError> {
        let cookies: Vec<SessionCookie> = serde_json::from_str(raw)?;
        if cookies.is_empty() {
            return Err(SessionParseError::Empty);
        }
        Ok(Session::new(cookies))
    }
}

/// Cookie values are credentials: only names are shown.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field(
                "cookies",
                &self.cookies.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionParseError {
    #[error("Malformed session payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Session payload contains no cookies")]
    Empty,
}
