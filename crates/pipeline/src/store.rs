//! Persistence of the platform session across process restarts.
//!
//! A [`SessionStore`] has an optional primary backend (the `app_config`
//! table) and a mandatory secondary backend (a local JSON file). Reads never
//! fail: any backend problem is logged and the next backend is tried.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use quire_core::session::{Session, SessionParseError};
use quire_db::repositories::AppConfigRepo;
use quire_db::DbPool;

/// `app_config` key the serialized session is stored under.
pub const SESSION_KEY: &str = "platform_session";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored session is unusable: {0}")]
    Corrupt(#[from] SessionParseError),

    #[error("Session could not be serialized: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Session backend '{0}' is not configured")]
    NotConfigured(&'static str),

    #[error("Session could not be saved (primary: {primary}; secondary: {secondary})")]
    AllBackendsFailed { primary: String, secondary: String },
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// One place a serialized session can live.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// The stored payload, or `None` when nothing has been stored yet.
    async fn read(&self) -> Result<Option<String>, StoreError>;

    async fn write(&self, payload: &str) -> Result<(), StoreError>;
}

/// Session row in the `app_config` table.
pub struct DatabaseBackend {
    pool: DbPool,
    key: String,
}

impl DatabaseBackend {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            key: SESSION_KEY.to_string(),
        }
    }
}

#[async_trait]
impl SessionBackend for DatabaseBackend {
    fn name(&self) -> &'static str {
        "database"
    }

    async fn read(&self) -> Result<Option<String>, StoreError> {
        let entry = AppConfigRepo::find(&self.pool, &self.key).await?;
        Ok(entry.and_then(|e| e.value))
    }

    async fn write(&self, payload: &str) -> Result<(), StoreError> {
        AppConfigRepo::ensure_table(&self.pool).await?;
        AppConfigRepo::upsert(&self.pool, &self.key, payload).await?;
        Ok(())
    }
}

/// Session JSON in a local file.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn read(&self) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Written to a sibling temp file and renamed into place, so a crash
    /// mid-write leaves the previous session intact.
    async fn write(&self, payload: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, payload).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Primary-then-secondary session persistence.
pub struct SessionStore {
    primary: Option<Arc<dyn SessionBackend>>,
    secondary: Arc<dyn SessionBackend>,
}

impl SessionStore {
    pub fn new(
        primary: Option<Arc<dyn SessionBackend>>,
        secondary: Arc<dyn SessionBackend>,
    ) -> Self {
        Self { primary, secondary }
    }

    /// File-only store, used when no database is configured.
    pub fn file_only(path: impl Into<PathBuf>) -> Self {
        Self::new(None, Arc::new(FileBackend::new(path)))
    }

    /// The first non-empty, parseable stored session.
    ///
    /// Backend errors and corrupt payloads are logged and treated as absence.
    pub async fn load(&self) -> Option<Session> {
        for backend in self.backends() {
            match Self::load_from(backend.as_ref()).await {
                Ok(Some(session)) => {
                    tracing::debug!(
                        backend = backend.name(),
                        cookie_count = session.cookies().len(),
                        "Loaded stored session",
                    );
                    return Some(session);
                }
                Ok(None) => {
                    tracing::debug!(backend = backend.name(), "No stored session");
                }
                Err(e) => {
                    tracing::warn!(backend = backend.name(), error = %e, "Session backend read failed, falling through");
                }
            }
        }
        None
    }

    /// Persist to the primary, falling back to the secondary on failure.
    pub async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let payload = session.to_json()?;

        let primary_error = match &self.primary {
            Some(primary) => match primary.write(&payload).await {
                Ok(()) => {
                    tracing::info!(backend = primary.name(), "Session saved");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(backend = primary.name(), error = %e, "Session write failed, trying secondary");
                    e
                }
            },
            None => StoreError::NotConfigured("primary"),
        };

        match self.secondary.write(&payload).await {
            Ok(()) => {
                tracing::info!(backend = self.secondary.name(), "Session saved");
                Ok(())
            }
            Err(e) => Err(StoreError::AllBackendsFailed {
                primary: primary_error.to_string(),
                secondary: e.to_string(),
            }),
        }
    }

    fn backends(&self) -> impl Iterator<Item = &Arc<dyn SessionBackend>> {
        self.primary.iter().chain(std::iter::once(&self.secondary))
    }

    async fn load_from(backend: &dyn SessionBackend) -> Result<Option<Session>, StoreError> {
        let Some(raw) = backend.read().await? else {
            return Ok(None);
        };
        match Session::from_json(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(SessionParseError::Empty) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use quire_core::session::SessionCookie;

    use super::*;

    /// In-memory backend that can be told to fail.
    #[derive(Default)]
    struct MemoryBackend {
        payload: Mutex<Option<String>>,
        fail: bool,
        writes: AtomicUsize,
    }

    impl MemoryBackend {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn holding(payload: &str) -> Self {
            Self {
                payload: Mutex::new(Some(payload.to_string())),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl SessionBackend for MemoryBackend {
        fn name(&self) -> &'static str {
            "memory"
        }

        async fn read(&self) -> Result<Option<String>, StoreError> {
            if self.fail {
                return Err(StoreError::Io(std::io::Error::other(
                    "relation \"app_config\" does not exist",
                )));
            }
            Ok(self.payload.lock().unwrap().clone())
        }

        async fn write(&self, payload: &str) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StoreError::Io(std::io::Error::other("unreachable")));
            }
            *self.payload.lock().unwrap() = Some(payload.to_string());
            Ok(())
        }
    }

    fn session() -> Session {
        Session::new(vec![SessionCookie::new("sid", "abc", ".example.com")])
    }

    fn store(primary: Arc<MemoryBackend>, secondary: Arc<MemoryBackend>) -> SessionStore {
        SessionStore::new(Some(primary as Arc<dyn SessionBackend>), secondary)
    }

    // -- load --

    #[tokio::test]
    async fn primary_failure_falls_through_to_secondary() {
        let stored = session().to_json().unwrap();
        let store = store(
            Arc::new(MemoryBackend::failing()),
            Arc::new(MemoryBackend::holding(&stored)),
        );
        assert_eq!(store.load().await, Some(session()));
    }

    #[tokio::test]
    async fn primary_wins_when_it_has_a_session() {
        let primary = Session::new(vec![SessionCookie::new("sid", "db", ".example.com")]);
        let store = store(
            Arc::new(MemoryBackend::holding(&primary.to_json().unwrap())),
            Arc::new(MemoryBackend::holding(&session().to_json().unwrap())),
        );
        assert_eq!(store.load().await, Some(primary));
    }

    #[tokio::test]
    async fn corrupt_and_empty_payloads_are_absence() {
        let store = store(
            Arc::new(MemoryBackend::holding("{not json")),
            Arc::new(MemoryBackend::holding("[]")),
        );
        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn all_backends_failing_loads_nothing() {
        let store = store(
            Arc::new(MemoryBackend::failing()),
            Arc::new(MemoryBackend::failing()),
        );
        assert_eq!(store.load().await, None);
    }

    // -- save --

    #[tokio::test]
    async fn save_prefers_primary() {
        let primary = Arc::new(MemoryBackend::default());
        let secondary = Arc::new(MemoryBackend::default());
        let store = store(primary.clone(), secondary.clone());

        store.save(&session()).await.unwrap();

        assert_eq!(primary.writes.load(Ordering::SeqCst), 1);
        assert_eq!(secondary.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn save_falls_back_when_primary_fails() {
        let secondary = Arc::new(MemoryBackend::default());
        let store = store(Arc::new(MemoryBackend::failing()), secondary.clone());

        store.save(&session()).await.unwrap();

        assert_eq!(store.load().await, Some(session()));
        assert_eq!(secondary.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn save_fails_when_both_backends_fail() {
        let store = store(
            Arc::new(MemoryBackend::failing()),
            Arc::new(MemoryBackend::failing()),
        );
        assert_matches!(
            store.save(&session()).await,
            Err(StoreError::AllBackendsFailed { .. })
        );
    }

    // -- file backend --

    #[tokio::test]
    async fn file_store_round_trips_through_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("session.json");
        let store = SessionStore::file_only(&path);

        assert_eq!(store.load().await, None);
        store.save(&session()).await.unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(store.load().await, Some(session()));
    }

    #[tokio::test]
    async fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("absent.json"));
        assert_matches!(backend.read().await, Ok(None));
    }
}
