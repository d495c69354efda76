//! Selection of the authentication strategy at process start.

use crate::{
    AuthStrategy, BasicAuth, CredentialHasher, DatabaseStore, Error, ExemptPaths, ExpiringStore,
    MemoryStore, NullStrategy, Result, SessionAuth, SessionLifetime, SessionManager,
    SessionRecords, SessionStore, UserStore,
};
use serde::Deserialize;
use std::sync::Arc;

/// The cookie holding the session token, unless configured otherwise.
pub const DEFAULT_SESSION_COOKIE_NAME: &str = "_my_session_id";

/// Paths that never require authentication, unless configured otherwise.
pub const DEFAULT_EXEMPT_PATHS: [&str; 4] = [
    "/api/v1/stat*",
    "/api/v1/unauthorized/",
    "/api/v1/forbidden/",
    "/api/v1/auth_session/login/",
];

/// The available authentication strategies.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// No authentication at all.
    #[default]
    None,
    /// The base strategy: non-exempt paths are never authenticated.
    Auth,
    /// HTTP Basic authentication.
    BasicAuth,
    /// Session authentication with in-memory sessions that never expire.
    SessionAuth,
    /// Session authentication with in-memory sessions that expire.
    SessionExpAuth,
    /// Session authentication with expiring sessions kept in durable session records.
    SessionDbAuth,
}

impl StrategyKind {
    /// Parse a strategy name as used in the `AUTH_TYPE` environment variable.
    /// Unknown names select no authentication.
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "auth" => Self::Auth,
            "basic_auth" => Self::BasicAuth,
            "session_auth" => Self::SessionAuth,
            "session_exp_auth" => Self::SessionExpAuth,
            "session_db_auth" => Self::SessionDbAuth,
            "" | "none" => Self::None,
            unknown => {
                log::warn!("Unknown authentication strategy {unknown:?}, authentication is disabled");
                Self::None
            }
        }
    }
}

/// Authentication configuration.
///
/// Can be loaded from the environment with [`AuthConfig::from_env`], or be embedded into
/// the configuration file of the host application, where every field is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// The active strategy.
    pub strategy: StrategyKind,
    /// The name of the cookie holding the session token.
    pub session_cookie_name: String,
    /// The session lifetime in seconds. Zero or negative values mean that sessions never expire.
    /// Only used by the expiring strategies.
    pub session_duration: i64,
    /// Path patterns that do not require authentication.
    pub exempt_paths: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::None,
            session_cookie_name: DEFAULT_SESSION_COOKIE_NAME.to_string(),
            session_duration: 0,
            exempt_paths: DEFAULT_EXEMPT_PATHS.iter().map(|path| path.to_string()).collect(),
        }
    }
}

impl AuthConfig {
    /// Read the configuration from the environment variables `AUTH_TYPE`, `SESSION_NAME` and
    /// `SESSION_DURATION`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration from the given variable lookup.
    ///
    /// Missing or invalid values fall back to their defaults instead of failing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(strategy) = lookup("AUTH_TYPE") {
            config.strategy = StrategyKind::parse(&strategy);
        }
        if let Some(cookie_name) = lookup("SESSION_NAME").filter(|name| !name.is_empty()) {
            config.session_cookie_name = cookie_name;
        }
        let duration = lookup("SESSION_DURATION");
        config.session_duration = duration
            .as_deref()
            .and_then(|duration| duration.trim().parse().ok())
            .unwrap_or_else(|| {
                if let Some(duration) = &duration {
                    log::warn!("Ignoring invalid SESSION_DURATION {duration:?}, sessions never expire");
                }
                0
            });
        config
    }

    /// The session lifetime.
    pub fn session_lifetime(&self) -> SessionLifetime {
        SessionLifetime::from_seconds(self.session_duration)
    }

    /// Compile the exempt path patterns.
    pub fn exempt_paths(&self) -> Result<ExemptPaths> {
        ExemptPaths::new(&self.exempt_paths)
    }
}

/// Builds the configured strategy once at process start.
#[derive(Debug)]
pub struct StrategyFactory {
    users: Arc<dyn UserStore>,
    session_records: Option<Arc<dyn SessionRecords>>,
    hasher: CredentialHasher,
}

impl StrategyFactory {
    /// Create a factory for strategies resolving users from `users`.
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self {
            users,
            session_records: None,
            hasher: CredentialHasher::default(),
        }
    }

    /// Use `records` as durable session storage for [`StrategyKind::SessionDbAuth`].
    pub fn with_session_records(mut self, records: Arc<dyn SessionRecords>) -> Self {
        self.session_records = Some(records);
        self
    }

    /// Use `hasher` to verify passwords in [`StrategyKind::BasicAuth`].
    pub fn with_hasher(mut self, hasher: CredentialHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Build the session store required by the configured strategy.
    /// Returns `None` for strategies without sessions.
    pub fn session_manager(&self, config: &AuthConfig) -> Result<Option<Arc<dyn SessionManager>>> {
        let lifetime = config.session_lifetime();
        let sessions: Arc<dyn SessionManager> = match config.strategy {
            StrategyKind::None | StrategyKind::Auth | StrategyKind::BasicAuth => return Ok(None),
            StrategyKind::SessionAuth => Arc::new(SessionStore::new(MemoryStore::new())),
            StrategyKind::SessionExpAuth => Arc::new(SessionStore::new(ExpiringStore::new(
                MemoryStore::new(),
                lifetime,
            ))),
            StrategyKind::SessionDbAuth => {
                let records = self
                    .session_records
                    .clone()
                    .ok_or(Error::MissingSessionRecords)?;
                Arc::new(SessionStore::new(ExpiringStore::new(
                    DatabaseStore::new(records),
                    lifetime,
                )))
            }
        };
        Ok(Some(sessions))
    }

    /// Build the configured strategy with a new session store.
    /// Returns `None` if authentication is disabled.
    pub fn build(&self, config: &AuthConfig) -> Result<Option<Box<dyn AuthStrategy>>> {
        let sessions = self.session_manager(config)?;
        self.build_with_sessions(config, sessions)
    }

    /// Build the configured strategy using an existing session store,
    /// e.g. one shared with an [`AuthService`](crate::AuthService).
    pub fn build_with_sessions(
        &self,
        config: &AuthConfig,
        sessions: Option<Arc<dyn SessionManager>>,
    ) -> Result<Option<Box<dyn AuthStrategy>>> {
        let strategy: Box<dyn AuthStrategy> = match config.strategy {
            StrategyKind::None => return Ok(None),
            StrategyKind::Auth => Box::new(NullStrategy),
            StrategyKind::BasicAuth => Box::new(BasicAuth::new_with_hasher(
                self.users.clone(),
                self.hasher.clone(),
            )),
            StrategyKind::SessionAuth | StrategyKind::SessionExpAuth | StrategyKind::SessionDbAuth => {
                let sessions = match sessions {
                    Some(sessions) => sessions,
                    None => self
                        .session_manager(config)?
                        .ok_or(Error::MissingSessionRecords)?,
                };
                Box::new(SessionAuth::new(
                    sessions,
                    self.users.clone(),
                    config.session_cookie_name.clone(),
                ))
            }
        };
        log::info!("Using authentication strategy {:?}", config.strategy);
        Ok(Some(strategy))
    }
}
