use crate::{
    AddUserResult, CredentialHasher, DefaultTokenGenerator, Error, Result, SessionManager,
    TokenGenerator, User, UserQuery, UserStore, UserUpdate,
};
use std::fmt::Debug;
use std::sync::Arc;

/// The user authentication service: registration, login, logout and password reset.
///
/// This is the collaborator behind the login, logout, profile and password reset endpoints
/// of an application. It shares its session store with the active [`SessionAuth`](crate::SessionAuth)
/// strategy, so sessions created here authenticate later requests.
#[derive(Debug)]
pub struct AuthService<Generator = DefaultTokenGenerator> {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionManager>,
    hasher: CredentialHasher,
    reset_token_generator: Generator,
}

impl AuthService {
    /// Create a service over the given user and session stores.
    pub fn new(users: Arc<dyn UserStore>, sessions: Arc<dyn SessionManager>) -> Self {
        Self::new_with_parts(
            users,
            sessions,
            CredentialHasher::default(),
            DefaultTokenGenerator::default(),
        )
    }
}

impl<Generator: TokenGenerator> AuthService<Generator> {
    /// Create a service with a custom password hasher and reset token generator.
    pub fn new_with_parts(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionManager>,
        hasher: CredentialHasher,
        reset_token_generator: Generator,
    ) -> Self {
        Self {
            users,
            sessions,
            hasher,
            reset_token_generator,
        }
    }

    /// Register a new user.
    ///
    /// Fails with [`Error::UserAlreadyExists`] if the email is taken.
    pub async fn register_user(&self, email: &str, password: &str) -> Result<User> {
        let already_exists = || Error::UserAlreadyExists {
            email: email.to_string(),
        };
        // Skips hashing for the common case, the store decides on conflicts.
        if self.users.find_user_by(UserQuery::Email(email)).await?.is_some() {
            return Err(already_exists());
        }

        let hashed_password = self.hasher.hash(password)?;
        match self.users.add_user(email, hashed_password).await? {
            AddUserResult::Ok(user) => {
                log::info!("Registered user {}", user.id);
                Ok(user)
            }
            AddUserResult::EmailExists => Err(already_exists()),
        }
    }

    /// Returns true if a user with the given email exists and the password is correct.
    pub async fn valid_login(&self, email: &str, password: &str) -> Result<bool> {
        let Some(user) = self.users.find_user_by(UserQuery::Email(email)).await? else {
            log::debug!("Login attempt for unknown email");
            return Ok(false);
        };
        Ok(self.hasher.verify(&user.hashed_password, password))
    }

    /// Create a session for the user with the given email and return its token.
    /// Returns `None` if there is no such user.
    pub async fn create_session(&self, email: &str) -> Result<Option<String>> {
        let Some(user) = self.users.find_user_by(UserQuery::Email(email)).await? else {
            return Ok(None);
        };
        let token = self.sessions.create(&user.id).await?;
        self.users
            .update_user(
                &user.id,
                UserUpdate {
                    session_id: Some(Some(token.clone())),
                    ..Default::default()
                },
            )
            .await?;
        log::info!("User {} logged in", user.id);
        Ok(Some(token))
    }

    /// Check the credentials and create a session on success.
    /// Returns `None` if the credentials are wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<String>> {
        if !self.valid_login(email, password).await? {
            return Ok(None);
        }
        self.create_session(email).await
    }

    /// Returns the user owning the session `session_id`, if the session is valid.
    pub async fn get_user_from_session_id(&self, session_id: Option<&str>) -> Result<Option<User>> {
        let Some(session_id) = session_id else {
            return Ok(None);
        };
        let Some(user_id) = self.sessions.lookup(session_id).await? else {
            return Ok(None);
        };
        Ok(self.users.find_user_by(UserQuery::Id(&user_id)).await?)
    }

    /// End the session `session_id`.
    /// Returns false if there was no such session, or if it has expired.
    ///
    /// The user holding `session_id` has it cleared in either case.
    pub async fn destroy_session(&self, session_id: &str) -> Result<bool> {
        let destroyed = self.sessions.destroy(session_id).await?;
        if let Some(user) = self
            .users
            .find_user_by(UserQuery::SessionId(session_id))
            .await?
        {
            self.users
                .update_user(
                    &user.id,
                    UserUpdate {
                        session_id: Some(None),
                        ..Default::default()
                    },
                )
                .await?;
            log::info!("User {} logged out", user.id);
        }
        Ok(destroyed)
    }

    /// Issue a password reset token for the user with the given email.
    ///
    /// Fails with [`Error::UserNotFound`] if there is no such user.
    /// A previously issued token of the same user becomes invalid.
    pub async fn get_reset_password_token(&self, email: &str) -> Result<String> {
        let user = self
            .users
            .find_user_by(UserQuery::Email(email))
            .await?
            .ok_or_else(|| Error::UserNotFound {
                email: email.to_string(),
            })?;
        let reset_token = self.reset_token_generator.generate_token();
        self.users
            .update_user(
                &user.id,
                UserUpdate {
                    reset_token: Some(Some(reset_token.clone())),
                    ..Default::default()
                },
            )
            .await?;
        log::info!("Issued password reset token for user {}", user.id);
        Ok(reset_token)
    }

    /// Redeem `reset_token`, setting the password of its user to `password`.
    ///
    /// The new password hash is stored and the token cleared in a single update, so a token
    /// can be redeemed only once. Fails with [`Error::InvalidResetToken`] if the token is
    /// empty or unknown.
    pub async fn update_password(&self, reset_token: &str, password: &str) -> Result {
        if reset_token.is_empty() {
            return Err(Error::InvalidResetToken);
        }
        let user = self
            .users
            .find_user_by(UserQuery::ResetToken(reset_token))
            .await?
            .ok_or(Error::InvalidResetToken)?;

        let hashed_password = self.hasher.hash(password)?;
        self.users
            .update_user(
                &user.id,
                UserUpdate {
                    hashed_password: Some(hashed_password),
                    reset_token: Some(None),
                    ..Default::default()
                },
            )
            .await?;
        log::info!("Updated password of user {}", user.id);
        Ok(())
    }
}
