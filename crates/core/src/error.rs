/// A publish document that violates its own invariants.
///
/// Raised before any network call: it signals an upstream contract
/// violation, not a transient fault.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("Document title must not be empty")]
    EmptyTitle,

    #[error("Document body must contain at least one block")]
    EmptyBody,
}

/// Failure to obtain or use an authenticated platform session.
///
/// Cloneable because one bootstrap failure is reported on every tier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Session rejected by platform: {0}")]
    SessionRejected(String),

    #[error("No valid stored session and no login credentials configured")]
    NoCredentials,

    #[error("Browser login failed: {0}")]
    Login(String),

    #[error("Browser login timed out after {secs}s")]
    LoginTimeout { secs: u64 },
}
