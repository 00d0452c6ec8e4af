use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::persist::{StateFile, SESSION_STORAGE_KEY};
use crate::error::{ApiResult, ErrorInfo, ErrorKind};

/// Authenticated actor profile. `id`, `name` and `email` are always present;
/// any further profile fields the backend attaches ride along in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionState {
    token: Option<String>,
    user: Option<UserProfile>,
}

/// Read snapshot of the session at one instant.
///
/// `is_authenticated` is always derived from token presence; no other field
/// may imply authentication.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub token: Option<String>,
    pub user: Option<UserProfile>,
    pub is_authenticated: bool,
}

/// Single source of truth for "who is logged in".
///
/// All mutation funnels through `login`, `logout` and `update_user`; readers
/// take `snapshot`. Mutations hold the write lock for the whole transition,
/// so no reader ever observes token without user (or a half-cleared state).
pub struct SessionStore {
    state: RwLock<SessionState>,
    disk: Option<StateFile>,
}

impl SessionStore {
    /// Store with no durable backing; starts empty.
    pub fn in_memory() -> Self {
        Self { state: RwLock::new(SessionState::default()), disk: None }
    }

    /// Store backed by `<dir>/auth-storage.json`, rehydrated immediately.
    /// Rehydration only marks the session authenticated when a non-empty
    /// token survives the round trip.
    pub fn with_storage(dir: &Path) -> Self {
        let disk = StateFile::new(dir, SESSION_STORAGE_KEY);
        let mut state: SessionState = disk.load().unwrap_or_default();
        if matches!(state.token.as_deref(), Some("")) {
            state.token = None;
        }
        debug!(
            "session rehydrated authenticated={} path={:?}",
            state.token.is_some(),
            disk.path()
        );
        Self { state: RwLock::new(state), disk: Some(disk) }
    }

    /// Establish a session. The token must be non-empty; both fields are set
    /// in one critical section and the new snapshot is persisted.
    pub fn login(&self, user: UserProfile, token: impl Into<String>) -> ApiResult<()> {
        let token = token.into();
        if token.is_empty() {
            return Err(ErrorInfo::message(
                ErrorKind::UnknownError,
                "login requires a non-empty session token",
            ));
        }
        let mut state = self.state.write();
        state.token = Some(token);
        state.user = Some(user);
        self.persist(&state);
        debug!("session login user_id={:?}", state.user.as_ref().map(|u| u.id));
        Ok(())
    }

    /// Clear the session. Idempotent: clearing an empty session is a no-op
    /// with the same observable end state. The cleared snapshot is persisted.
    pub fn logout(&self) {
        let mut state = self.state.write();
        let was_authenticated = state.token.is_some();
        state.token = None;
        state.user = None;
        self.persist(&state);
        if was_authenticated {
            debug!("session logout");
        }
    }

    /// Merge a partial profile into the current user, leaving the token
    /// untouched. Reports `Unauthorized` when no session is active.
    pub fn update_user(&self, patch: Map<String, Value>) -> ApiResult<UserProfile> {
        let mut state = self.state.write();
        if state.token.is_none() {
            return Err(ErrorInfo::unauthorized("update_user requires an active session"));
        }
        let current = state.user.clone().unwrap_or_default();
        let mut merged = match serde_json::to_value(&current) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for (k, v) in patch {
            merged.insert(k, v);
        }
        let updated: UserProfile = serde_json::from_value(Value::Object(merged))
            .map_err(|e| ErrorInfo::unknown(format!("invalid profile patch: {e}")))?;
        state.user = Some(updated.clone());
        self.persist(&state);
        Ok(updated)
    }

    /// Synchronous, side-effect-free read of the current session.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read();
        SessionSnapshot {
            token: state.token.clone(),
            user: state.user.clone(),
            is_authenticated: state.token.is_some(),
        }
    }

    // Persistence failures downgrade to warnings: losing durability must not
    // invalidate an otherwise-correct in-memory session.
    fn persist(&self, state: &SessionState) {
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.save(state) {
                warn!("session persist failed path={:?} err={}", disk.path(), e);
            }
        }
    }
}
