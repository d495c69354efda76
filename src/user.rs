use crate::HashedPassword;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::fmt::Debug;
use uuid::Uuid;

/// A user record, owned by the user store.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique id of the user.
    pub id: String,
    /// Email of the user, used as login identifier.
    pub email: String,
    /// Hash of the user's password.
    pub hashed_password: HashedPassword,
    /// Token of the user's current login session, if any.
    pub session_id: Option<String>,
    /// Pending password reset token, if any.
    pub reset_token: Option<String>,
}

/// An equality lookup on a single user field.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum UserQuery<'a> {
    /// Look up by user id.
    Id(&'a str),
    /// Look up by email.
    Email(&'a str),
    /// Look up by pending password reset token.
    ResetToken(&'a str),
    /// Look up by the token of the current login session.
    SessionId(&'a str),
}

/// The result of adding a user, indicating if the user could be added, or if the email is taken.
#[derive(Debug, Clone)]
pub enum AddUserResult {
    /// The user was added.
    Ok(User),
    /// The user was not added, because a user with the same email already exists.
    EmailExists,
}

/// A partial update of a user record. Fields that are `None` are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    /// Replace the password hash.
    pub hashed_password: Option<HashedPassword>,
    /// Replace the current session token. `Some(None)` clears it.
    pub session_id: Option<Option<String>>,
    /// Replace the password reset token. `Some(None)` clears it.
    pub reset_token: Option<Option<String>>,
}

/// The user store collaborator.
///
/// Lookups return `Ok(None)` when no user matches, and `Err(_)` only when the store itself failed.
/// An update is applied atomically: either all given fields change, or none.
///
/// Emails are unique. The store enforces this itself, since checking with
/// [`UserStore::find_user_by`] before adding races with concurrent registrations.
#[async_trait]
pub trait UserStore: Debug + Send + Sync {
    /// Add a new user and return it.
    ///
    /// Checking for an existing user with the same email and inserting must happen atomically.
    /// Returns [`AddUserResult::EmailExists`] and leaves the store unchanged if the email is taken.
    async fn add_user(
        &self,
        email: &str,
        hashed_password: HashedPassword,
    ) -> anyhow::Result<AddUserResult>;

    /// Return the first user matching `query`.
    async fn find_user_by(&self, query: UserQuery<'_>) -> anyhow::Result<Option<User>>;

    /// Apply `update` to the user with id `user_id`.
    /// Fails if there is no such user.
    async fn update_user(&self, user_id: &str, update: UserUpdate) -> anyhow::Result<()>;
}

impl User {
    fn matches(&self, query: UserQuery<'_>) -> bool {
        match query {
            UserQuery::Id(id) => self.id == id,
            UserQuery::Email(email) => self.email == email,
            UserQuery::ResetToken(token) => self.reset_token.as_deref() == Some(token),
            UserQuery::SessionId(token) => self.session_id.as_deref() == Some(token),
        }
    }

    fn apply(&mut self, update: UserUpdate) {
        if let Some(hashed_password) = update.hashed_password {
            self.hashed_password = hashed_password;
        }
        if let Some(session_id) = update.session_id {
            self.session_id = session_id;
        }
        if let Some(reset_token) = update.reset_token {
            self.reset_token = reset_token;
        }
    }
}

/// An in-memory user store.
///
/// Useful for tests and small tools. Users are lost on shutdown.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    /// Create a new empty user store.
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the number of users.
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Returns true if there are no users.
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn add_user(
        &self,
        email: &str,
        hashed_password: HashedPassword,
    ) -> anyhow::Result<AddUserResult> {
        let mut users = self.users.write();
        if users.iter().any(|user| user.email == email) {
            return Ok(AddUserResult::EmailExists);
        }
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            hashed_password,
            session_id: None,
            reset_token: None,
        };
        users.push(user.clone());
        Ok(AddUserResult::Ok(user))
    }

    async fn find_user_by(&self, query: UserQuery<'_>) -> anyhow::Result<Option<User>> {
        Ok(self
            .users
            .read()
            .iter()
            .find(|user| user.matches(query))
            .cloned())
    }

    async fn update_user(&self, user_id: &str, update: UserUpdate) -> anyhow::Result<()> {
        let mut users = self.users.write();
        let user = users
            .iter_mut()
            .find(|user| user.id == user_id)
            .ok_or_else(|| anyhow::anyhow!("no user with id {user_id}"))?;
        user.apply(update);
        Ok(())
    }
}
