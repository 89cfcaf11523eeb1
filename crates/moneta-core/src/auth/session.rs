use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::storage::{FileStore, KeyValueStore, MemoryStore, WriteBatch};

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

pub const TOKEN_KEY: &str = "auth_token";
pub const USER_KEY: &str = "currentUser";
pub const LOGGED_IN_KEY: &str = "isLoggedIn";

/// Snapshot of the client-side authentication state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    pub current_user: Option<serde_json::Value>,
    /// True iff both `token` and `current_user` are present.
    pub is_logged_in: bool,
}

impl Session {
    fn new(token: Option<String>, current_user: Option<serde_json::Value>) -> Self {
        let is_logged_in = token.is_some() && current_user.is_some();
        Self {
            token,
            current_user,
            is_logged_in,
        }
    }
}

/// Persisted bearer token and last-known user profile.
///
/// Cheap to clone; clones share the same backing store, so a `clear()` from
/// one API call is seen by every other holder.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Session persisted under `<cache_dir>/session.json`.
    pub fn open(cache_dir: &Path) -> Result<Self> {
        let store = FileStore::open(cache_dir.join(SESSION_FILE))
            .context("Failed to open session store")?;
        Ok(Self::new(store))
    }

    /// Session that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Store a new login. Token, user and flag land in one atomic write.
    pub fn set<U: Serialize + ?Sized>(&self, token: &str, user: &U) -> Result<()> {
        let user_json = serde_json::to_string(user).context("Failed to serialize user")?;
        let batch = WriteBatch::new()
            .set(TOKEN_KEY, token)
            .set(USER_KEY, user_json)
            .set(LOGGED_IN_KEY, "true");
        self.store.apply(batch).context("Failed to save session")?;
        debug!("Session saved");
        Ok(())
    }

    /// Remove token, user and flag. Clearing an empty session is a no-op.
    pub fn clear(&self) -> Result<()> {
        let batch = WriteBatch::new()
            .remove(TOKEN_KEY)
            .remove(USER_KEY)
            .remove(LOGGED_IN_KEY);
        self.store.apply(batch).context("Failed to clear session")?;
        debug!("Session cleared");
        Ok(())
    }

    /// Wipe everything in the underlying store, not only the session keys.
    pub fn clear_all(&self) -> Result<()> {
        self.store.clear_all().context("Failed to clear local data")
    }

    pub fn token(&self) -> Result<Option<String>> {
        self.store.get(TOKEN_KEY).context("Failed to read token")
    }

    pub fn current_user(&self) -> Result<Option<serde_json::Value>> {
        match self.store.get(USER_KEY).context("Failed to read current user")? {
            Some(raw) => {
                let user = serde_json::from_str(&raw).context("Failed to parse current user")?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Cached user decoded into a caller-chosen shape.
    pub fn current_user_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match self.current_user()? {
            Some(value) => {
                let user = serde_json::from_value(value).context("Unexpected current user shape")?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Consistent snapshot of all three keys.
    pub fn load(&self) -> Result<Session> {
        let values = self
            .store
            .get_many(&[TOKEN_KEY, USER_KEY])
            .context("Failed to read session")?;
        let mut values = values.into_iter();
        let token = values.next().flatten();
        let current_user = match values.next().flatten() {
            Some(raw) => Some(serde_json::from_str(&raw).context("Failed to parse current user")?),
            None => None,
        };
        Ok(Session::new(token, current_user))
    }

    /// True iff a token and a user are both cached. Read failures count as
    /// logged out.
    pub fn is_authenticated(&self) -> bool {
        match self.load() {
            Ok(session) => session.is_logged_in,
            Err(e) => {
                warn!(error = %e, "Failed to check session");
                false
            }
        }
    }
}
