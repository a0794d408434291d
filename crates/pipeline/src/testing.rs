//! In-memory fakes for the platform and login seams.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use quire_core::document::{Audience, PublishDocument};
use quire_core::error::AuthError;
use quire_core::session::{Session, SessionCookie};
use quire_core::types::DraftId;
use quire_platform::api::{
    BylineRef, DraftRecord, PlatformApi, PlatformApiError, PlatformConnector, PublicationInfo,
    PublishedPost,
};
use quire_platform::config::PlatformConfig;
use quire_platform::login::{Credentials, LoginDriver};

pub(crate) const PUBLICATION_URL: &str = "https://weekly.example.com";

pub(crate) fn session(sid: &str) -> Session {
    Session::new(vec![SessionCookie::new("sid", sid, ".example.com")])
}

pub(crate) fn credentials() -> Credentials {
    Credentials {
        email: "ed@example.com".into(),
        password: "hunter2".into(),
    }
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// Shared state behind every [`FakeApi`] a [`FakeConnector`] hands out.
#[derive(Default)]
pub(crate) struct FakePlatform {
    /// `sid` cookie value the platform accepts.
    pub accepted_sid: Mutex<String>,
    pub fail_paid_drafts: AtomicBool,
    pub fail_publish: AtomicBool,
    pub omit_canonical_url: AtomicBool,
    pub connects: AtomicUsize,
    pub verifies: AtomicUsize,
    pub drafts: Mutex<Vec<(String, Audience)>>,
    pub publishes: Mutex<Vec<(DraftId, bool)>>,
}

impl FakePlatform {
    pub fn accepting(sid: &str) -> Arc<Self> {
        let platform = Self::default();
        *platform.accepted_sid.lock().unwrap() = sid.to_string();
        Arc::new(platform)
    }

    pub fn draft_calls(&self) -> usize {
        self.drafts.lock().unwrap().len()
    }
}

pub(crate) struct FakeConnector {
    pub platform: Arc<FakePlatform>,
    config: PlatformConfig,
}

impl FakeConnector {
    pub fn new(platform: Arc<FakePlatform>) -> Arc<Self> {
        Arc::new(Self {
            platform,
            config: PlatformConfig::new(PUBLICATION_URL).unwrap(),
        })
    }
}

impl PlatformConnector for FakeConnector {
    fn connect(&self, session: &Session) -> Result<Arc<dyn PlatformApi>, PlatformApiError> {
        self.platform.connects.fetch_add(1, Ordering::SeqCst);
        let sid = session
            .cookies()
            .iter()
            .find(|c| c.name == "sid")
            .map(|c| c.value.clone());
        Ok(Arc::new(FakeApi {
            platform: self.platform.clone(),
            sid,
        }))
    }

    fn config(&self) -> &PlatformConfig {
        &self.config
    }
}

struct FakeApi {
    platform: Arc<FakePlatform>,
    sid: Option<String>,
}

impl FakeApi {
    fn authorized(&self) -> bool {
        self.sid.as_deref() == Some(self.platform.accepted_sid.lock().unwrap().as_str())
    }
}

fn api_error(status: u16, status_text: &str, body: &str) -> PlatformApiError {
    PlatformApiError::Api {
        status,
        status_text: status_text.into(),
        body: body.into(),
    }
}

#[async_trait]
impl PlatformApi for FakeApi {
    async fn verify_identity(&self) -> Result<PublicationInfo, AuthError> {
        self.platform.verifies.fetch_add(1, Ordering::SeqCst);
        if !self.authorized() {
            return Err(AuthError::SessionRejected(
                "Platform API error: 401 Unauthorized - not logged in".into(),
            ));
        }
        Ok(PublicationInfo {
            id: 1,
            name: "Weekly".into(),
            subdomain: Some("weekly".into()),
            custom_domain: None,
            author_id: Some(42),
        })
    }

    async fn resolve_default_byline(&self) -> Vec<BylineRef> {
        vec![BylineRef::author(42)]
    }

    async fn create_draft(&self, doc: &PublishDocument) -> Result<DraftRecord, PlatformApiError> {
        if !self.authorized() {
            return Err(api_error(401, "Unauthorized", "not logged in"));
        }
        let n = {
            let mut drafts = self.platform.drafts.lock().unwrap();
            drafts.push((doc.title.clone(), doc.audience));
            drafts.len() as i64
        };
        if doc.audience == Audience::PaidOnly && self.platform.fail_paid_drafts.load(Ordering::SeqCst) {
            return Err(api_error(500, "Internal Server Error", "draft store unavailable"));
        }
        Ok(DraftRecord {
            id: 100 + n,
            slug: Some(format!("post-{n}")),
            draft_title: Some(doc.title.clone()),
            draft_body: None,
        })
    }

    async fn publish_draft(
        &self,
        draft_id: DraftId,
        send_email: bool,
    ) -> Result<PublishedPost, PlatformApiError> {
        if self.platform.fail_publish.load(Ordering::SeqCst) {
            return Err(api_error(502, "Bad Gateway", "upstream timeout"));
        }
        self.platform.publishes.lock().unwrap().push((draft_id, send_email));
        let slug = format!("post-{}", draft_id - 100);
        let canonical_url = (!self.platform.omit_canonical_url.load(Ordering::SeqCst))
            .then(|| format!("https://read.example.com/p/{slug}"));
        Ok(PublishedPost {
            id: Some(draft_id),
            slug: Some(slug),
            canonical_url,
        })
    }
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

pub(crate) struct FakeLogin {
    pub calls: AtomicUsize,
    outcome: Result<Session, AuthError>,
}

impl FakeLogin {
    pub fn returning(outcome: Result<Session, AuthError>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            outcome,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LoginDriver for FakeLogin {
    async fn login(&self, _credentials: &Credentials) -> Result<Session, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}
