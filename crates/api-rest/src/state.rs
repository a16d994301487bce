//! Shared state for the REST handlers.
//!
//! Each consultation session sits behind its own async mutex and is keyed by id; sessions never
//! share mutable state. A session left idle longer than the idle timeout is dropped the next
//! time a session is created. The remedy catalog is an immutable snapshot that a sync swaps out
//! wholesale, so searches never see a half-loaded table.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use frontdesk_core::{CoreConfig, DeskError, RemedyCatalog, Session, StoreConnector};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::ApiError;

pub type SharedSession = Arc<Mutex<Session>>;

/// How long an untouched session is kept.
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(12 * 60 * 60);

struct SessionSlot {
    session: SharedSession,
    last_used: Instant,
}

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    cfg: Arc<RwLock<Arc<CoreConfig>>>,
    catalog: Arc<RwLock<Option<Arc<RemedyCatalog>>>>,
    sessions: Arc<RwLock<HashMap<Uuid, SessionSlot>>>,
    session_idle_timeout: Duration,
    connector: Arc<dyn StoreConnector>,
}

impl AppState {
    pub fn new(cfg: CoreConfig, connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            cfg: Arc::new(RwLock::new(Arc::new(cfg))),
            catalog: Arc::new(RwLock::new(None)),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            session_idle_timeout: DEFAULT_SESSION_IDLE_TIMEOUT,
            connector,
        }
    }

    pub fn with_session_idle_timeout(mut self, timeout: Duration) -> Self {
        self.session_idle_timeout = timeout;
        self
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> Result<Arc<CoreConfig>, ApiError> {
        self.cfg
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| ApiError::internal("configuration lock poisoned"))
    }

    /// Point store operations at another endpoint (or none).
    pub fn set_store_endpoint(&self, endpoint: Option<String>) -> Result<bool, ApiError> {
        let mut cfg = self
            .cfg
            .write()
            .map_err(|_| ApiError::internal("configuration lock poisoned"))?;
        let updated = cfg.with_store_endpoint(endpoint)?;
        let configured = updated.store_endpoint().is_some();
        *cfg = Arc::new(updated);
        Ok(configured)
    }

    pub fn connector(&self) -> Arc<dyn StoreConnector> {
        self.connector.clone()
    }

    /// The loaded catalog, if a sync has succeeded.
    pub fn catalog(&self) -> Result<Option<Arc<RemedyCatalog>>, ApiError> {
        self.catalog
            .read()
            .map(|c| c.clone())
            .map_err(|_| ApiError::internal("catalog lock poisoned"))
    }

    pub fn replace_catalog(&self, catalog: RemedyCatalog) -> Result<(), ApiError> {
        let mut slot = self
            .catalog
            .write()
            .map_err(|_| ApiError::internal("catalog lock poisoned"))?;
        *slot = Some(Arc::new(catalog));
        Ok(())
    }

    /// Open a new session, first dropping any that have sat idle past the timeout.
    pub fn create_session(&self) -> Result<Uuid, ApiError> {
        let session = Session::new();
        let id = session.id();
        let now = Instant::now();

        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| ApiError::internal("session table lock poisoned"))?;
        let before = sessions.len();
        sessions.retain(|_, slot| now.duration_since(slot.last_used) < self.session_idle_timeout);
        let expired = before - sessions.len();
        if expired > 0 {
            tracing::info!(expired, "idle sessions dropped");
        }

        sessions.insert(
            id,
            SessionSlot {
                session: Arc::new(Mutex::new(session)),
                last_used: now,
            },
        );
        Ok(id)
    }

    /// The session with this id, marking it as used.
    pub fn session(&self, id: Uuid) -> Result<SharedSession, ApiError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| ApiError::internal("session table lock poisoned"))?;
        let slot = sessions.get_mut(&id).ok_or(ApiError::UnknownSession(id))?;
        slot.last_used = Instant::now();
        Ok(slot.session.clone())
    }

    pub fn remove_session(&self, id: Uuid) -> Result<(), ApiError> {
        self.sessions
            .write()
            .map_err(|_| ApiError::internal("session table lock poisoned"))?
            .remove(&id)
            .map(|_| ())
            .ok_or(ApiError::UnknownSession(id))
    }
}

/// HTTP status for a core error.
pub fn status_for(e: &DeskError) -> StatusCode {
    match e {
        DeskError::ConfigurationMissing => StatusCode::SERVICE_UNAVAILABLE,
        DeskError::SourceUnavailable { .. } | DeskError::RemoteFailure(_) => {
            StatusCode::BAD_GATEWAY
        }
        DeskError::InvalidInput(_)
        | DeskError::NoActivePatient
        | DeskError::HistoryIndex { .. } => StatusCode::BAD_REQUEST,
    }
}
