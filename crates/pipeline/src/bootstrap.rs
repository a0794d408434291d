//! Acquiring a verified platform session.
//!
//! ```text
//! TryStored ──(stored session verifies)──────────────▶ Ready
//!     │
//!     └─(nothing stored / rejected)──▶ NeedsLogin ──(login ok)──▶ Ready
//!                                          │
//!                                          └──(no credentials / login error)──▶ Failed
//! ```
//!
//! Each call to [`Bootstrapper::bootstrap`] walks the machine forward once;
//! no state is revisited and a failure is never retried automatically.

use std::sync::Arc;

use async_trait::async_trait;

use quire_core::error::AuthError;
use quire_core::session::Session;
use quire_platform::api::PlatformConnector;
use quire_platform::login::{Credentials, LoginDriver};

use crate::store::SessionStore;

/// Where the bootstrap currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapState {
    TryStored,
    /// `rejection` is why the stored session was not usable, if one existed.
    NeedsLogin { rejection: Option<AuthError> },
    Ready(Session),
    Failed(AuthError),
}

impl BootstrapState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready(_) | Self::Failed(_))
    }
}

/// Anything that can hand out a verified session.
#[async_trait]
pub trait SessionSource: Send + Sync {
    async fn acquire(&self) -> Result<Session, AuthError>;
}

pub struct Bootstrapper {
    store: Arc<SessionStore>,
    connector: Arc<dyn PlatformConnector>,
    login_driver: Arc<dyn LoginDriver>,
    credentials: Option<Credentials>,
}

impl Bootstrapper {
    pub fn new(
        store: Arc<SessionStore>,
        connector: Arc<dyn PlatformConnector>,
        login_driver: Arc<dyn LoginDriver>,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            store,
            connector,
            login_driver,
            credentials,
        }
    }

    /// Run the machine from `TryStored` to a terminal state.
    pub async fn bootstrap(&self) -> Result<Session, AuthError> {
        let mut state = BootstrapState::TryStored;
        loop {
            state = match state {
                BootstrapState::Ready(session) => return Ok(session),
                BootstrapState::Failed(e) => return Err(e),
                pending => self.step(pending).await,
            };
        }
    }

    /// The single transition function. Terminal states map to themselves.
    pub async fn step(&self, state: BootstrapState) -> BootstrapState {
        match state {
            BootstrapState::TryStored => self.try_stored().await,
            BootstrapState::NeedsLogin { rejection } => self.login(rejection).await,
            terminal => terminal,
        }
    }

    async fn try_stored(&self) -> BootstrapState {
        let Some(session) = self.store.load().await else {
            tracing::info!("No stored session, browser login required");
            return BootstrapState::NeedsLogin { rejection: None };
        };

        match self.verify(&session).await {
            Ok(()) => {
                tracing::info!("Stored session accepted");
                BootstrapState::Ready(session)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stored session rejected, browser login required");
                BootstrapState::NeedsLogin { rejection: Some(e) }
            }
        }
    }

    async fn login(&self, rejection: Option<AuthError>) -> BootstrapState {
        let Some(credentials) = &self.credentials else {
            let error = rejection.unwrap_or(AuthError::NoCredentials);
            tracing::error!(error = %error, "Cannot log in: no credentials configured");
            return BootstrapState::Failed(error);
        };

        let session = match self.login_driver.login(credentials).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(error = %e, "Browser login failed");
                return BootstrapState::Failed(e);
            }
        };

        // A session that cannot be persisted is still good for this run.
        if let Err(e) = self.store.save(&session).await {
            tracing::error!(error = %e, "Failed to persist session after login");
        }
        BootstrapState::Ready(session)
    }

    async fn verify(&self, session: &Session) -> Result<(), AuthError> {
        let api = self
            .connector
            .connect(session)
            .map_err(|e| AuthError::SessionRejected(e.to_string()))?;
        api.verify_identity().await.map(|_| ())
    }
}

#[async_trait]
impl SessionSource for Bootstrapper {
    async fn acquire(&self) -> Result<Session, AuthError> {
        self.bootstrap().await
    }
}
