use crate::session_store::WriteSessionResult;
use crate::{Result, Session, SessionId, SessionLifetime, SessionStoreImplementation};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Debug;

/// # in-memory session store
/// Because there is no external
/// persistence, this session store is ephemeral and will be cleared
/// on server restart.
///
/// # ***READ THIS BEFORE USING IN A PRODUCTION DEPLOYMENT***
///
/// Storing sessions only in memory brings the following problems:
///
/// 1. All sessions must fit in available memory (important for high load services)
/// 2. Sessions stored in memory are removed only on logout, on [MemoryStore::cleanup] or on [SessionStoreImplementation::clear].
///    Expired sessions are hidden on lookup but stay in memory until then.
///    If sessions are not cleaned up properly it might result in OOM
/// 3. All sessions will be lost on shutdown
/// 4. If the service is clustered particular session will be stored only on a single instance.
///    This might be solved by using load balancers with sticky sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    session_map: RwLock<HashMap<SessionId, Session>>,
}

#[async_trait]
impl SessionStoreImplementation for MemoryStore {
    const MAXIMUM_RETRIES_ON_ID_COLLISION: Option<u8> = None;

    async fn create_session(&self, id: &SessionId, session: &Session) -> Result<WriteSessionResult> {
        let mut session_map = self.session_map.write();
        // replace with `try_insert` once stable #82766
        if session_map.contains_key(id) {
            Ok(WriteSessionResult::SessionIdExists)
        } else {
            session_map.insert(id.clone(), session.clone());
            Ok(WriteSessionResult::Ok(()))
        }
    }

    async fn read_session(&self, id: &SessionId) -> Result<Option<Session>> {
        Ok(self.session_map.read().get(id).cloned())
    }

    async fn delete_session(&self, id: &SessionId) -> Result<bool> {
        Ok(self.session_map.write().remove(id).is_some())
    }

    async fn clear(&self) -> Result {
        self.session_map.write().clear();
        Ok(())
    }
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the number of sessions in the memory store, including expired ones.
    pub fn len(&self) -> usize {
        self.session_map.read().len()
    }

    /// Returns true if the memory store is empty.
    pub fn is_empty(&self) -> bool {
        self.session_map.read().is_empty()
    }

    /// Removes all sessions that are expired under `lifetime` and returns how many were removed.
    /// This should be run on an intermittent basis if this store is run for long enough that
    /// memory accumulation is a concern.
    pub fn cleanup(&self, lifetime: SessionLifetime) -> usize {
        log::trace!("Cleaning up memory store...");
        let now = Utc::now();
        let mut session_map = self.session_map.write();
        let initial_len = session_map.len();
        session_map.retain(|_, session| !session.is_expired(now, lifetime));
        let removed = initial_len - session_map.len();
        log::trace!("Deleted {removed} expired sessions");
        removed
    }
}
