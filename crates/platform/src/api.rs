//! REST client for the platform's editor endpoints.
//!
//! Wraps `GET /publication`, `POST /drafts` and `POST /drafts/{id}/publish`
//! using [`reqwest`]. Every request carries the session cookies plus the
//! browser identity headers the editor UI would send.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, COOKIE, ORIGIN, REFERER};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use quire_core::document::{Audience, PublishDocument};
use quire_core::error::AuthError;
use quire_core::prose;
use quire_core::session::Session;
use quire_core::types::DraftId;

use crate::config::PlatformConfig;

/// Document type sent with every draft.
pub const POST_TYPE_NEWSLETTER: &str = "newsletter";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Identity returned by `GET /publication`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublicationInfo {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub custom_domain: Option<String>,
    #[serde(default)]
    pub author_id: Option<i64>,
}

/// An author credited on a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BylineRef {
    pub id: i64,
    pub is_guest: bool,
}

impl BylineRef {
    pub fn author(id: i64) -> Self {
        Self { id, is_guest: false }
    }
}

/// Server-side draft returned by `POST /drafts`.
#[derive(Debug, Clone, Deserialize)]
pub struct DraftRecord {
    pub id: DraftId,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub draft_title: Option<String>,
    #[serde(default)]
    pub draft_body: Option<String>,
}

/// Response of `POST /drafts/{id}/publish`.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishedPost {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub canonical_url: Option<String>,
}

/// Body of `POST /drafts`.
#[derive(Debug, Clone, Serialize)]
pub struct DraftPayload {
    pub draft_title: String,
    pub draft_subtitle: String,
    pub draft_bylines: Vec<BylineRef>,
    pub audience: Audience,
    #[serde(rename = "type")]
    pub post_type: &'static str,
    /// The editor tree, JSON-encoded as a string.
    pub draft_body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_id: Option<i64>,
}

impl DraftPayload {
    pub fn build(doc: &PublishDocument, bylines: Vec<BylineRef>) -> Result<Self, PlatformApiError> {
        let body = prose::to_editor_doc(&doc.body);
        Ok(Self {
            draft_title: doc.title.clone(),
            draft_subtitle: doc.subtitle.clone().unwrap_or_default(),
            draft_bylines: bylines,
            audience: doc.audience,
            post_type: POST_TYPE_NEWSLETTER,
            draft_body: serde_json::to_string(&body).map_err(PlatformApiError::Encode)?,
            section_id: doc.section_id,
        })
    }
}

/// Pull the default byline out of a publication document.
///
/// Accounts expose the author in one of three shapes (a `bylines` list, a
/// top-level `author_id`, or a nested `author` object); all are tried in
/// that order. An empty result is accepted by the draft endpoint.
pub fn extract_bylines(publication: &Value) -> Vec<BylineRef> {
    if let Some(list) = publication.get("bylines").and_then(Value::as_array) {
        let bylines: Vec<BylineRef> = list
            .iter()
            .filter_map(|b| b.get("id").and_then(Value::as_i64))
            .map(BylineRef::author)
            .collect();
        if !bylines.is_empty() {
            return bylines;
        }
    }

    if let Some(id) = publication
        .get("author_id")
        .and_then(Value::as_i64)
        .filter(|id| *id != 0)
    {
        return vec![BylineRef::author(id)];
    }

    if let Some(id) = publication
        .get("author")
        .and_then(|author| author.get("id"))
        .and_then(Value::as_i64)
        .filter(|id| *id != 0)
    {
        return vec![BylineRef::author(id)];
    }

    Vec::new()
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the platform REST layer.
#[derive(Debug, thiserror::Error)]
pub enum PlatformApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The platform returned a non-2xx status code.
    #[error("Platform API error: {status} {status_text} - {body}")]
    Api {
        status: u16,
        status_text: String,
        /// Raw response body for debugging.
        body: String,
    },

    #[error("Failed to encode draft body: {0}")]
    Encode(serde_json::Error),

    /// A session cookie could not be placed in a request header.
    #[error("Invalid header value for {0}")]
    InvalidHeader(&'static str),
}

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// The three platform operations (plus byline lookup) the publisher needs.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Check that the session is accepted. Never returns a transport error:
    /// every failure becomes an [`AuthError`] with the raw diagnostic.
    async fn verify_identity(&self) -> Result<PublicationInfo, AuthError>;

    /// Default byline for new drafts. Never fails; an empty list is valid.
    async fn resolve_default_byline(&self) -> Vec<BylineRef>;

    async fn create_draft(&self, doc: &PublishDocument) -> Result<DraftRecord, PlatformApiError>;

    async fn publish_draft(
        &self,
        draft_id: DraftId,
        send_email: bool,
    ) -> Result<PublishedPost, PlatformApiError>;
}

/// Builds a [`PlatformApi`] bound to one session.
pub trait PlatformConnector: Send + Sync {
    fn connect(&self, session: &Session) -> Result<Arc<dyn PlatformApi>, PlatformApiError>;

    /// Publication origin, used to build post URLs the platform omits.
    fn config(&self) -> &PlatformConfig;
}

/// Connector producing real HTTP clients.
pub struct HttpConnector {
    config: Arc<PlatformConfig>,
}

impl HttpConnector {
    pub fn new(config: PlatformConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl PlatformConnector for HttpConnector {
    fn connect(&self, session: &Session) -> Result<Arc<dyn PlatformApi>, PlatformApiError> {
        Ok(Arc::new(PlatformClient::new(self.config.clone(), session)?))
    }

    fn config(&self) -> &PlatformConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// PlatformClient
// ---------------------------------------------------------------------------

/// HTTP client for one publication, bound to one session.
pub struct PlatformClient {
    client: reqwest::Client,
    config: Arc<PlatformConfig>,
}

impl PlatformClient {
    /// Create a client whose every request carries `session`'s cookies.
    pub fn new(config: Arc<PlatformConfig>, session: &Session) -> Result<Self, PlatformApiError> {
        let headers = identity_headers(&config, session)?;
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> Result<T, PlatformApiError> {
        let response = self.client.get(self.config.api_url(endpoint)).send().await?;
        Self::parse_response(response).await
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &impl Serialize,
    ) -> Result<T, PlatformApiError> {
        let response = self
            .client
            .post(self.config.api_url(endpoint))
            .json(body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Return the response unchanged on success, or a
    /// [`PlatformApiError::Api`] with status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, PlatformApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(PlatformApiError::Api {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PlatformApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl PlatformApi for PlatformClient {
    async fn verify_identity(&self) -> Result<PublicationInfo, AuthError> {
        match self.get_json::<PublicationInfo>("/publication").await {
            Ok(publication) => {
                tracing::info!(
                    publication_id = publication.id,
                    name = %publication.name,
                    "Platform session verified",
                );
                Ok(publication)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Platform rejected session");
                Err(AuthError::SessionRejected(e.to_string()))
            }
        }
    }

    async fn resolve_default_byline(&self) -> Vec<BylineRef> {
        match self.get_json::<Value>("/publication").await {
            Ok(publication) => extract_bylines(&publication),
            Err(e) => {
                tracing::warn!(error = %e, "Could not resolve byline, drafting without one");
                Vec::new()
            }
        }
    }

    async fn create_draft(&self, doc: &PublishDocument) -> Result<DraftRecord, PlatformApiError> {
        let bylines = self.resolve_default_byline().await;
        let payload = DraftPayload::build(doc, bylines)?;
        let draft: DraftRecord = self.post_json("/drafts", &payload).await?;
        tracing::info!(
            draft_id = draft.id,
            audience = doc.audience.as_str(),
            "Draft created",
        );
        Ok(draft)
    }

    async fn publish_draft(
        &self,
        draft_id: DraftId,
        send_email: bool,
    ) -> Result<PublishedPost, PlatformApiError> {
        let body = serde_json::json!({ "send": send_email });
        let post: PublishedPost = self
            .post_json(&format!("/drafts/{draft_id}/publish"), &body)
            .await?;
        tracing::info!(draft_id, send_email, slug = ?post.slug, "Draft published");
        Ok(post)
    }
}

/// Headers that make a request look like it came from the editor UI.
fn identity_headers(config: &PlatformConfig, session: &Session) -> Result<HeaderMap, PlatformApiError> {
    let mut headers = HeaderMap::new();
    let mut cookie = HeaderValue::from_str(&session.cookie_header(config.cookie_domain()))
        .map_err(|_| PlatformApiError::InvalidHeader("Cookie"))?;
    cookie.set_sensitive(true);
    headers.insert(COOKIE, cookie);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        ORIGIN,
        HeaderValue::from_str(config.publication_url())
            .map_err(|_| PlatformApiError::InvalidHeader("Origin"))?,
    );
    headers.insert(
        REFERER,
        HeaderValue::from_str(&config.editor_url())
            .map_err(|_| PlatformApiError::InvalidHeader("Referer"))?,
    );
    Ok(headers)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
