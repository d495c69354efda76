use crate::session_store::WriteSessionResult;
use crate::{Result, Session, SessionId, SessionStoreImplementation};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// The durable form of a session.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Hex encoded [`SessionId`] of the session, never the token itself.
    pub session_id: String,
    /// The id of the user owning the session.
    pub user_id: String,
    /// The creation time of the session.
    pub created_at: DateTime<Utc>,
}

/// A durable collection of session records, e.g. a database table.
///
/// The backend is responsible for its own concurrency control.
/// It does not need to enforce uniqueness of `session_id`: duplicate records are tolerated by
/// [`DatabaseStore`], which reads the first match and deletes all matches.
#[async_trait]
pub trait SessionRecords: Debug + Send + Sync {
    /// Persist a new record.
    async fn insert(&self, record: SessionRecord) -> anyhow::Result<()>;

    /// Return all records with the given `session_id`, in insertion order.
    async fn search(&self, session_id: &str) -> anyhow::Result<Vec<SessionRecord>>;

    /// Remove all records with the given `session_id` and return how many were removed.
    async fn remove_all(&self, session_id: &str) -> anyhow::Result<usize>;

    /// Remove all records.
    async fn clear(&self) -> anyhow::Result<()>;
}

/// A session store implementation backed by durable [`SessionRecords`] instead of memory.
///
/// Wrap it in an [`ExpiringStore`](crate::ExpiringStore) to apply a session lifetime; the age of a
/// session is then computed at read time from its persisted creation time.
#[derive(Debug)]
pub struct DatabaseStore<Records: ?Sized> {
    records: Arc<Records>,
}

impl<Records: SessionRecords + ?Sized> DatabaseStore<Records> {
    /// Create a store persisting its sessions in `records`.
    pub fn new(records: Arc<Records>) -> Self {
        Self { records }
    }

    /// Returns a reference to the record backend.
    pub fn records(&self) -> &Records {
        &self.records
    }
}

#[async_trait]
impl<Records: SessionRecords + ?Sized> SessionStoreImplementation for DatabaseStore<Records> {
    const MAXIMUM_RETRIES_ON_ID_COLLISION: Option<u8> = Some(8);

    async fn create_session(&self, id: &SessionId, session: &Session) -> Result<WriteSessionResult> {
        let session_id = id.to_hex();
        if !self.records.search(&session_id).await?.is_empty() {
            return Ok(WriteSessionResult::SessionIdExists);
        }
        self.records
            .insert(SessionRecord {
                session_id,
                user_id: session.user_id().to_string(),
                created_at: session.created_at(),
            })
            .await?;
        Ok(WriteSessionResult::Ok(()))
    }

    async fn read_session(&self, id: &SessionId) -> Result<Option<Session>> {
        // A record that is not visible yet is treated as absent.
        Ok(self
            .records
            .search(&id.to_hex())
            .await?
            .into_iter()
            .next()
            .map(|record| Session::new(record.user_id, record.created_at)))
    }

    async fn delete_session(&self, id: &SessionId) -> Result<bool> {
        let removed = self.records.remove_all(&id.to_hex()).await?;
        if removed > 1 {
            log::warn!("Removed {removed} duplicate records of session {id:?}");
        }
        Ok(removed > 0)
    }

    async fn clear(&self) -> Result {
        self.records.clear().await?;
        Ok(())
    }
}

/// Session records persisted as a JSON array in a single file.
///
/// The whole file is rewritten on every change, which is fine for small deployments and tests.
/// Records survive a restart of the process.
///
/// The file is replaced atomically: a new file is written next to it and renamed over it.
/// If writing fails, the change is rejected and the records stay as they were.
#[derive(Debug)]
pub struct JsonFileRecords {
    path: PathBuf,
    records: Mutex<Vec<SessionRecord>>,
}

impl JsonFileRecords {
    /// Open the record file at `path`, loading its records if it exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = match std::fs::read(&path) {
            Ok(contents) if contents.is_empty() => Vec::new(),
            Ok(contents) => serde_json::from_slice(&contents)?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(error) => return Err(error.into()),
        };
        log::debug!("Loaded {} session records from {}", records.len(), path.display());
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// The path of the record file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The number of records, including expired ones.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns true if there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Apply `change` to a copy of the records, and keep the copy only if it could be saved.
    fn update<T>(&self, change: impl FnOnce(&mut Vec<SessionRecord>) -> T) -> Result<T> {
        let mut records = self.records.lock();
        let mut updated = records.clone();
        let result = change(&mut updated);
        if updated != *records {
            self.save(&updated)?;
            *records = updated;
        }
        Ok(result)
    }

    fn save(&self, records: &[SessionRecord]) -> Result {
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(directory)?;
        serde_json::to_writer(&mut file, records)?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|error| error.error)?;
        Ok(())
    }
}

#[async_trait]
impl SessionRecords for JsonFileRecords {
    async fn insert(&self, record: SessionRecord) -> anyhow::Result<()> {
        self.update(|records| records.push(record))?;
        Ok(())
    }

    async fn search(&self, session_id: &str) -> anyhow::Result<Vec<SessionRecord>> {
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|record| record.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn remove_all(&self, session_id: &str) -> anyhow::Result<usize> {
        let removed = self.update(|records| {
            let initial_len = records.len();
            records.retain(|record| record.session_id != session_id);
            initial_len - records.len()
        })?;
        Ok(removed)
    }

    async fn clear(&self) -> anyhow::Result<()> {
        self.update(Vec::clear)?;
        Ok(())
    }
}
