use crate::session::{Session, SessionId};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::fmt::Debug;

mod token_generator;

pub use token_generator::{
    DebugTokenGenerator, DefaultTokenGenerator, TokenGenerator, DEFAULT_TOKEN_LENGTH,
};

/// The session operations needed by strategies and the login and logout collaborators.
///
/// This trait is object safe, so one store instance can be created at process start
/// and shared as `Arc<dyn SessionManager>` by everything that needs it.
#[async_trait]
pub trait SessionManager: Debug + Send + Sync {
    /// Create a session for `user_id` and return its token.
    async fn create(&self, user_id: &str) -> Result<String>;

    /// Return the id of the user owning the session identified by `token`,
    /// or `None` if there is no such session that is valid.
    async fn lookup(&self, token: &str) -> Result<Option<String>>;

    /// Destroy the session identified by `token`.
    /// Returns true if a session was removed.
    async fn destroy(&self, token: &str) -> Result<bool>;
}

/// An async session store.
///
/// This is the user-facing interface of the session store.
/// It abstracts over CRUD-based database operations on sessions,
/// and takes care of generating session tokens.
#[derive(Debug)]
pub struct SessionStore<Implementation, Generator = DefaultTokenGenerator> {
    implementation: Implementation,
    token_generator: Generator,
}

impl<Implementation: SessionStoreImplementation> SessionStore<Implementation> {
    /// Create a new session store with the given implementation.
    pub fn new(implementation: Implementation) -> Self {
        Self::new_with_token_generator(implementation, DefaultTokenGenerator::default())
    }
}

impl<Implementation: SessionStoreImplementation, Generator: TokenGenerator>
    SessionStore<Implementation, Generator>
{
    /// Create a new session store with the given implementation and token generator.
    pub fn new_with_token_generator(implementation: Implementation, token_generator: Generator) -> Self {
        Self {
            implementation,
            token_generator,
        }
    }

    /// Get a session from the storage backend.
    ///
    /// The return value is `Ok(Some(_))` if there is a session identified by the given token that is valid,
    /// or `Ok(None)` if there is no such session.
    pub async fn load_session(&self, token: &str) -> Result<Option<Session>> {
        let session_id = SessionId::from_token(token);
        self.implementation.read_session(&session_id).await
    }

    /// Store a new session for `user_id` in the storage backend and return its token.
    ///
    /// If the generated token collides with an existing one, a new token is generated.
    /// This is retried at most [`SessionStoreImplementation::MAXIMUM_RETRIES_ON_ID_COLLISION`] times.
    pub async fn store_session(&self, user_id: &str) -> Result<String> {
        let session = Session::new(user_id, Utc::now());

        if let Some(maximum_retries_on_collision) = Implementation::MAXIMUM_RETRIES_ON_ID_COLLISION
        {
            for _ in 0..maximum_retries_on_collision {
                if let WriteSessionResult::Ok(token) = self.try_store_session(&session).await? {
                    return Ok(token);
                }
            }

            Err(Error::MaximumTokenGenerationTriesReached {
                maximum: maximum_retries_on_collision,
            })
        } else {
            loop {
                if let WriteSessionResult::Ok(token) = self.try_store_session(&session).await? {
                    return Ok(token);
                }
            }
        }
    }

    async fn try_store_session(&self, session: &Session) -> Result<WriteSessionResult<String>> {
        let token = self.token_generator.generate_token();
        let id = SessionId::from_token(&token);
        let result = self.implementation.create_session(&id, session).await?;
        if matches!(result, WriteSessionResult::SessionIdExists) {
            log::debug!("Generated session token collided with an existing session");
        }
        Ok(result.map(|()| token))
    }

    /// Delete the session identified by `token` from the storage backend.
    pub async fn delete_session(&self, token: &str) -> Result<bool> {
        let session_id = SessionId::from_token(token);
        self.implementation.delete_session(&session_id).await
    }

    /// Empties the entire store, deleting all sessions.
    pub async fn clear_store(&self) -> Result {
        self.implementation.clear().await
    }

    /// Returns a reference to the storage backend.
    pub fn implementation(&self) -> &Implementation {
        &self.implementation
    }

    /// Consume the store, returning the storage backend.
    pub fn into_inner(self) -> Implementation {
        self.implementation
    }
}

#[async_trait]
impl<Implementation, Generator> SessionManager for SessionStore<Implementation, Generator>
where
    Implementation: SessionStoreImplementation,
    Generator: TokenGenerator,
{
    async fn create(&self, user_id: &str) -> Result<String> {
        self.store_session(user_id).await
    }

    async fn lookup(&self, token: &str) -> Result<Option<String>> {
        Ok(self.load_session(token).await?.map(Session::into_user_id))
    }

    async fn destroy(&self, token: &str) -> Result<bool> {
        self.delete_session(token).await
    }
}

/// This is the backend-facing interface of the session store.
/// It defines simple [CRUD]-methods on sessions.
///
/// The session id is expected to be the primary key, uniquely identifying a session.
/// Implementations must be safe to use from concurrent requests.
///
/// [CRUD]: https://en.wikipedia.org/wiki/Create,_read,_update_and_delete
#[async_trait]
pub trait SessionStoreImplementation: Debug + Send + Sync {
    /// Writing a session may fail if the id already exists.
    /// This constant indicates how often the caller should retry with different randomly generated ids until it should give up.
    /// The value `None` indicates that the caller should never give up, possibly looping infinitely.
    const MAXIMUM_RETRIES_ON_ID_COLLISION: Option<u8>;

    /// Create a session with the given `id`.
    async fn create_session(&self, id: &SessionId, session: &Session) -> Result<WriteSessionResult>;

    /// Read the session with the given `id`.
    async fn read_session(&self, id: &SessionId) -> Result<Option<Session>>;

    /// Delete the session with the given `id`.
    /// Returns true if a session was removed.
    async fn delete_session(&self, id: &SessionId) -> Result<bool>;

    /// Delete all sessions in the store.
    async fn clear(&self) -> Result;
}

/// The result of writing a session, indicating if the session could be written, or if the id collided.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum WriteSessionResult<OkData = ()> {
    /// The session could be written without id collision.
    Ok(OkData),
    /// The session could not be written, because the chosen id already exists.
    SessionIdExists,
}

impl<OkData> WriteSessionResult<OkData> {
    fn map<OtherOkData>(
        self,
        f: impl FnOnce(OkData) -> OtherOkData,
    ) -> WriteSessionResult<OtherOkData> {
        match self {
            Self::Ok(data) => WriteSessionResult::Ok(f(data)),
            Self::SessionIdExists => WriteSessionResult::SessionIdExists,
        }
    }
}
