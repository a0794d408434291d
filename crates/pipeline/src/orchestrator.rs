//! Two-tier publishing.
//!
//! [`TieredPublisher::publish_both`] acquires one session, then runs the
//! free and paid tiers concurrently. Each tier succeeds or fails on its own;
//! only a session failure takes down both.

use std::sync::Arc;

use quire_core::document::{PublishDocument, Tier};
use quire_core::error::{AuthError, TransformError};
use quire_core::publish::{PublishResult, TierResults};
use quire_core::types::DraftId;
use quire_platform::api::{
    DraftRecord, PlatformApi, PlatformApiError, PlatformConnector, PublicationInfo, PublishedPost,
};

use crate::bootstrap::SessionSource;

/// Anything that can stop a tier from publishing.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Api(#[from] PlatformApiError),

    /// The draft exists on the platform but was never published.
    #[error("Draft {draft_id} was created but not published: {source}")]
    Unpublished {
        draft_id: DraftId,
        #[source]
        source: PlatformApiError,
    },
}

type Connected = Result<Arc<dyn PlatformApi>, PublishError>;

pub struct TieredPublisher {
    sessions: Arc<dyn SessionSource>,
    connector: Arc<dyn PlatformConnector>,
}

impl TieredPublisher {
    pub fn new(sessions: Arc<dyn SessionSource>, connector: Arc<dyn PlatformConnector>) -> Self {
        Self {
            sessions,
            connector,
        }
    }

    /// Publish both tiers concurrently over one shared session.
    ///
    /// Invalid documents fail their own tier before any network call; when
    /// both are invalid no session is acquired at all.
    pub async fn publish_both(&self, free: PublishDocument, paid: PublishDocument) -> TierResults {
        let free = prepare(Tier::Free, free);
        let paid = prepare(Tier::Paid, paid);

        if let (Err(free_err), Err(paid_err)) = (&free, &paid) {
            tracing::error!("Both documents are invalid, nothing to publish");
            return TierResults {
                free: PublishResult::failed(Tier::Free, free_err.to_string(), None),
                paid: PublishResult::failed(Tier::Paid, paid_err.to_string(), None),
            };
        }

        let api = self.connect().await;
        let (free, paid) = tokio::join!(
            self.run_tier(Tier::Free, free, &api),
            self.run_tier(Tier::Paid, paid, &api),
        );

        tracing::info!(
            free_success = free.success,
            paid_success = paid.success,
            "Tiered publish finished",
        );
        TierResults { free, paid }
    }

    /// Publish a single tier.
    pub async fn publish_tier(&self, tier: Tier, doc: PublishDocument) -> PublishResult {
        let doc = prepare(tier, doc);
        if let Err(e) = &doc {
            return PublishResult::failed(tier, e.to_string(), None);
        }
        let api = self.connect().await;
        self.run_tier(tier, doc, &api).await
    }

    /// Acquire a session and report which publication it belongs to.
    pub async fn verify(&self) -> Result<PublicationInfo, PublishError> {
        let api = self.connect().await?;
        Ok(api.verify_identity().await?)
    }

    // ---- private helpers ----

    async fn connect(&self) -> Connected {
        let session = self.sessions.acquire().await?;
        Ok(self.connector.connect(&session)?)
    }

    async fn run_tier(
        &self,
        tier: Tier,
        doc: Result<PublishDocument, TransformError>,
        api: &Connected,
    ) -> PublishResult {
        let doc = match doc {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!(tier = %tier, error = %e, "Document rejected");
                return PublishResult::failed(tier, e.to_string(), None);
            }
        };
        let api = match api {
            Ok(api) => api,
            Err(e) => {
                tracing::error!(tier = %tier, error = %e, "No platform session, tier not published");
                return PublishResult::failed(tier, e.to_string(), None);
            }
        };

        match self.publish_document(api.as_ref(), tier, &doc).await {
            Ok(result) => result,
            Err(e) => {
                let draft_id = match &e {
                    PublishError::Unpublished { draft_id, .. } => Some(*draft_id),
                    _ => None,
                };
                tracing::error!(tier = %tier, draft_id = ?draft_id, error = %e, "Tier publish failed");
                PublishResult::failed(tier, e.to_string(), draft_id)
            }
        }
    }

    async fn publish_document(
        &self,
        api: &dyn PlatformApi,
        tier: Tier,
        doc: &PublishDocument,
    ) -> Result<PublishResult, PublishError> {
        let draft = api.create_draft(doc).await?;
        tracing::info!(tier = %tier, draft_id = draft.id, "Draft created");

        let post = api
            .publish_draft(draft.id, doc.send_email)
            .await
            .map_err(|source| PublishError::Unpublished {
                draft_id: draft.id,
                source,
            })?;

        let url = self.post_url(&post, &draft);
        tracing::info!(tier = %tier, draft_id = draft.id, url = %url, "Tier published");
        Ok(PublishResult::succeeded(tier, url, draft.id))
    }

    /// Canonical URL, else one built from the slug, else from the draft id.
    fn post_url(&self, post: &PublishedPost, draft: &DraftRecord) -> String {
        if let Some(url) = post.canonical_url.as_deref().filter(|u| !u.is_empty()) {
            return url.to_string();
        }
        let config = self.connector.config();
        match post.slug.as_deref().or(draft.slug.as_deref()) {
            Some(slug) if !slug.is_empty() => config.post_url(slug),
            _ => config.post_url(&draft.id.to_string()),
        }
    }
}

/// Pin the document to its tier's audience and check its invariants.
fn prepare(tier: Tier, mut doc: PublishDocument) -> Result<PublishDocument, TransformError> {
    let audience = tier.audience();
    if doc.audience != audience {
        tracing::warn!(
            tier = %tier,
            requested = doc.audience.as_str(),
            forced = audience.as_str(),
            "Document audience does not match its tier, overriding",
        );
        doc.audience = audience;
    }
    doc.validate()?;
    Ok(doc)
}
