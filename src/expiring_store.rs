use crate::session_store::WriteSessionResult;
use crate::{MemoryStore, Result, Session, SessionId, SessionLifetime, SessionStoreImplementation};
use async_trait::async_trait;
use chrono::Utc;

/// A session store implementation that adds a time-to-live to another implementation.
///
/// A session read from the inner implementation is only returned while it is not older than the
/// configured [`SessionLifetime`]. Expired sessions are reported exactly like unknown ones,
/// so callers cannot tell whether a token ever existed.
///
/// Expired sessions are not deleted on read. They stay in the inner implementation until they are
/// destroyed, the store is cleared, or [`ExpiringStore::cleanup`] is called for a [`MemoryStore`].
/// Destroying an expired session evicts it, but reports it like an unknown one.
#[derive(Debug)]
pub struct ExpiringStore<Implementation> {
    inner: Implementation,
    lifetime: SessionLifetime,
}

impl<Implementation> ExpiringStore<Implementation> {
    /// Wrap `inner`, expiring its sessions after `lifetime`.
    pub fn new(inner: Implementation, lifetime: SessionLifetime) -> Self {
        Self { inner, lifetime }
    }

    /// The lifetime of sessions in this store.
    pub fn lifetime(&self) -> SessionLifetime {
        self.lifetime
    }

    /// Returns a reference to the wrapped implementation.
    pub fn inner(&self) -> &Implementation {
        &self.inner
    }
}

impl ExpiringStore<MemoryStore> {
    /// Evict all expired sessions from the wrapped memory store and return how many were removed.
    pub fn cleanup(&self) -> usize {
        self.inner.cleanup(self.lifetime)
    }
}

#[async_trait]
impl<Implementation: SessionStoreImplementation> SessionStoreImplementation
    for ExpiringStore<Implementation>
{
    const MAXIMUM_RETRIES_ON_ID_COLLISION: Option<u8> =
        Implementation::MAXIMUM_RETRIES_ON_ID_COLLISION;

    async fn create_session(&self, id: &SessionId, session: &Session) -> Result<WriteSessionResult> {
        self.inner.create_session(id, session).await
    }

    async fn read_session(&self, id: &SessionId) -> Result<Option<Session>> {
        let Some(session) = self.inner.read_session(id).await? else {
            return Ok(None);
        };
        if session.is_expired(Utc::now(), self.lifetime) {
            log::debug!("Session {id:?} is expired");
            Ok(None)
        } else {
            Ok(Some(session))
        }
    }

    /// Deletes the session even if it is expired, but only reports a valid session as deleted.
    async fn delete_session(&self, id: &SessionId) -> Result<bool> {
        let valid = self.read_session(id).await?.is_some();
        let deleted = self.inner.delete_session(id).await?;
        Ok(valid && deleted)
    }

    async fn clear(&self) -> Result {
        self.inner.clear().await
    }
}
