use crate::{AuthStrategy, RequestContext, Result, SessionManager, User, UserQuery, UserStore};
use async_trait::async_trait;
use std::sync::Arc;

/// Session authentication.
///
/// A session is created on login and its token handed to the client in a cookie.
/// Later requests are authenticated by looking the cookie up in the session store.
/// Whether sessions expire or survive a restart depends on the [`SessionManager`] given here.
#[derive(Debug)]
pub struct SessionAuth {
    sessions: Arc<dyn SessionManager>,
    users: Arc<dyn UserStore>,
    cookie_name: String,
}

impl SessionAuth {
    /// Create a strategy reading the session token from the cookie `cookie_name`.
    pub fn new(
        sessions: Arc<dyn SessionManager>,
        users: Arc<dyn UserStore>,
        cookie_name: impl Into<String>,
    ) -> Self {
        Self {
            sessions,
            users,
            cookie_name: cookie_name.into(),
        }
    }

    /// The name of the session cookie.
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// The session store of this strategy.
    pub fn sessions(&self) -> &Arc<dyn SessionManager> {
        &self.sessions
    }

    /// Returns the id of the user owning the session `session_id`, if the session is valid.
    /// A store failure is logged and treated like an unknown session.
    pub async fn user_id_for_session_id(&self, session_id: &str) -> Option<String> {
        match self.sessions.lookup(session_id).await {
            Ok(user_id) => user_id,
            Err(error) => {
                log::warn!("Session lookup failed: {error}");
                None
            }
        }
    }
}

#[async_trait]
impl AuthStrategy for SessionAuth {
    fn session_cookie<'request>(&self, request: &'request RequestContext) -> Option<&'request str> {
        request.cookie(&self.cookie_name)
    }

    async fn current_user(&self, request: &RequestContext) -> Option<User> {
        let session_id = self.session_cookie(request)?;
        let user_id = self.user_id_for_session_id(session_id).await?;
        match self.users.find_user_by(UserQuery::Id(&user_id)).await {
            Ok(user) => user,
            Err(error) => {
                log::warn!("Failed to look up user {user_id}: {error:#}");
                None
            }
        }
    }

    async fn create_session(&self, user_id: &str) -> Result<Option<String>> {
        if user_id.is_empty() {
            return Ok(None);
        }
        let token = self.sessions.create(user_id).await?;
        log::info!("Created session for user {user_id}");
        Ok(Some(token))
    }

    async fn destroy_session(&self, request: &RequestContext) -> Result<bool> {
        let Some(session_id) = self.session_cookie(request) else {
            return Ok(false);
        };
        let destroyed = self.sessions.destroy(session_id).await?;
        if destroyed {
            log::info!("Destroyed session");
        }
        Ok(destroyed)
    }
}
