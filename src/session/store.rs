use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::state::{Session, SessionAction};
use crate::constants::{SESSION_STORAGE_KEY, SESSION_STORAGE_VERSION};
use crate::models::User;
use crate::storage::{load_json, save_json, DurableStorage, StorageError};
use crate::store::{Effect, Store, SubscriptionId};

/// Versioned record written under the session key
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    state: Session,
    #[serde(default)]
    version: u32,
}

/// Read the persisted session subset, if any
pub fn read_persisted_session(storage: &dyn DurableStorage) -> Result<Option<Session>, StorageError> {
    Ok(load_json::<StoredSession>(storage, SESSION_STORAGE_KEY)?.map(|stored| stored.state))
}

/// Effect writing `{user, token, isAuthenticated}` to durable storage
pub struct PersistSession {
    storage: Arc<dyn DurableStorage>,
}

impl PersistSession {
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self { storage }
    }
}

impl Effect<Session> for PersistSession {
    fn run(&self, state: &Session) -> Result<(), StorageError> {
        let stored = StoredSession {
            state: state.clone(),
            version: SESSION_STORAGE_VERSION,
        };
        save_json(self.storage.as_ref(), SESSION_STORAGE_KEY, &stored)?;
        debug!(authenticated = state.is_authenticated, "session persisted");
        Ok(())
    }
}

/// Process-wide source of truth for the logged-in user
pub struct SessionStore {
    store: Store<Session>,
}

impl SessionStore {
    /// Build the store from whatever was persisted; defaults apply when
    /// nothing was stored or the record cannot be read
    pub fn load(storage: Arc<dyn DurableStorage>) -> Self {
        let initial = match read_persisted_session(storage.as_ref()) {
            Ok(Some(session)) => session,
            Ok(None) => Session::default(),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable persisted session");
                Session::default()
            }
        };

        Self {
            store: Store::new(initial).with_effect(PersistSession::new(storage)),
        }
    }

    /// Current session
    pub fn session(&self) -> Session {
        self.store.snapshot()
    }

    pub fn token(&self) -> Option<String> {
        self.store.with_state(|s| s.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.with_state(|s| s.is_authenticated)
    }

    pub fn set_user(&self, user: Option<User>) -> Result<(), StorageError> {
        self.store.dispatch(SessionAction::SetUser(user))
    }

    pub fn set_token(&self, token: Option<String>) -> Result<(), StorageError> {
        self.store.dispatch(SessionAction::SetToken(token))
    }

    pub fn login(&self, user: User, token: impl Into<String>) -> Result<(), StorageError> {
        self.store.dispatch(SessionAction::Login {
            user,
            token: token.into(),
        })
    }

    pub fn logout(&self) -> Result<(), StorageError> {
        self.store.dispatch(SessionAction::Logout)
    }

    /// Observe every session change; called before the mutating call returns
    pub fn subscribe(&self, subscriber: impl Fn(&Session) + Send + Sync + 'static) -> SubscriptionId {
        self.store.subscribe(subscriber)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
