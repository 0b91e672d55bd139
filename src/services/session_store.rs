// src/services/session_store.rs
use crate::config::CredentialContext;
use crate::errors::CabinetError;
use crate::wizard::Wizard;
use chrono::{DateTime, Duration, Utc};
use log::info;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

pub type SharedWizard = Arc<Mutex<Wizard>>;

struct SessionEntry {
    wizard: SharedWizard,
    last_active: DateTime<Utc>,
}

impl SessionEntry {
    fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.last_active > ttl
    }
}

/// In-memory wizard sessions, one per browser tab. Nothing is persisted;
/// sessions idle for longer than the TTL are dropped.
pub struct SessionStore {
    credentials: Arc<CredentialContext>,
    ttl: Duration,
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
}

impl SessionStore {
    pub fn new(credentials: Arc<CredentialContext>, ttl: Duration) -> Self {
        Self {
            credentials,
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create_session(&self) -> (Uuid, SharedWizard) {
        let session_id = Uuid::new_v4();
        let wizard = Arc::new(Mutex::new(Wizard::new(self.credentials.clone())));

        self.sessions.write().await.insert(
            session_id,
            SessionEntry {
                wizard: wizard.clone(),
                last_active: Utc::now(),
            },
        );
        info!("Created session {}", session_id);

        (session_id, wizard)
    }

    /// Looks up a session and marks it active.
    pub async fn get_session(&self, session_id: &Uuid) -> Result<SharedWizard, CabinetError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;

        let expired = match sessions.get_mut(session_id) {
            Some(entry) if !entry.is_expired(now, self.ttl) => {
                entry.last_active = now;
                return Ok(entry.wizard.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            sessions.remove(session_id);
            info!("Session {} expired", session_id);
        }
        Err(CabinetError::SessionNotFound(*session_id))
    }

    pub async fn remove_session(&self, session_id: &Uuid) -> Result<(), CabinetError> {
        self.sessions
            .write()
            .await
            .remove(session_id)
            .map(|_| info!("Removed session {}", session_id))
            .ok_or(CabinetError::SessionNotFound(*session_id))
    }

    /// Drops every session idle past the TTL. Returns how many were removed.
    pub async fn evict_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_expired(now, self.ttl));
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Evicted {} idle sessions", evicted);
        }
        evicted
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
