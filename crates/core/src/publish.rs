//! Per-tier publish outcomes returned to the scheduler.

use serde::Serialize;

use crate::document::Tier;
use crate::types::DraftId;

/// Outcome of publishing one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResult {
    pub success: bool,
    pub post_url: Option<String>,
    pub draft_id: Option<DraftId>,
    pub error: Option<String>,
    pub tier: Tier,
}

impl PublishResult {
    pub fn succeeded(tier: Tier, post_url: String, draft_id: DraftId) -> Self {
        Self {
            success: true,
            post_url: Some(post_url),
            draft_id: Some(draft_id),
            error: None,
            tier,
        }
    }

    /// A failed tier. `draft_id` is set when a draft was created but never
    /// published.
    pub fn failed(tier: Tier, error: impl Into<String>, draft_id: Option<DraftId>) -> Self {
        Self {
            success: false,
            post_url: None,
            draft_id,
            error: Some(error.into()),
            tier,
        }
    }
}

/// Combined outcome of one orchestration call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierResults {
    pub free: PublishResult,
    pub paid: PublishResult,
}

impl TierResults {
    pub fn all_succeeded(&self) -> bool {
        self.free.success && self.paid.success
    }

    pub fn any_succeeded(&self) -> bool {
        self.free.success || self.paid.success
    }
}
