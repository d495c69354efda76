//! Pluggable HTTP authentication.
//!
//! This crate answers, for each inbound request, the question "who is this?".
//! The HTTP layer stays outside: it hands in a [`RequestContext`] and maps the answer of a
//! [`RequestGate`] onto its responses.
//!
//! # Strategies
//!
//! An [`AuthStrategy`] is selected once at process start from an [`AuthConfig`]:
//!
//! - [`NullStrategy`]: requires authentication, but never authenticates anybody.
//! - [`BasicAuth`]: checks `Authorization: Basic ...` credentials against the user store on every request.
//! - [`SessionAuth`]: resolves a session cookie through a [`SessionManager`].
//!   Depending on the configuration, sessions live in a [`MemoryStore`], expire via an
//!   [`ExpiringStore`], or are kept in durable [`SessionRecords`] via a [`DatabaseStore`].
//!
//! Users are owned by a [`UserStore`] implemented by the application.
//!
//! # Security
//!
//! Passwords are hashed with Argon2id and verified in constant time.
//! Session tokens are 64 random alphanumeric characters, and session stores only ever see a
//! blake3 hash of a token. An expired session cannot be told apart from one that never existed.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use typed_auth::{
//!     AuthService, GateDecision, MemoryStore, MemoryUserStore, RequestContext, RequestGate,
//!     SessionAuth, SessionManager, SessionStore, UserStore, ExemptPaths,
//! };
//!
//! # fn main() -> typed_auth::Result {
//! # async_std::task::block_on(async {
//! // Create the stores once at process start.
//! let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
//! let sessions: Arc<dyn SessionManager> = Arc::new(SessionStore::new(MemoryStore::new()));
//!
//! // The service handles registration and login, the gate checks requests.
//! let service = AuthService::new(users.clone(), sessions.clone());
//! let strategy = SessionAuth::new(sessions, users, "session_id");
//! let gate = RequestGate::new(Some(Box::new(strategy)), ExemptPaths::new(["/status"])?);
//!
//! service.register_user("bob@example.com", "hunter2").await?;
//! let token = service.login("bob@example.com", "hunter2").await?.unwrap();
//!
//! let request = RequestContext::new("/profile").with_cookie("session_id", token);
//! let GateDecision::Authenticated(user) = gate.check(&request).await else { unreachable!() };
//! assert_eq!(user.email, "bob@example.com");
//!
//! assert!(gate.check(&RequestContext::new("/status")).await.is_allowed());
//! assert_eq!(gate.check(&RequestContext::new("/profile")).await.status_code(), Some(401));
//! #
//! # Ok(()) }) }
//! ```

#![forbid(unsafe_code)]
#![deny(
    future_incompatible,
    missing_debug_implementations,
    nonstandard_style,
    unused_qualifications
)]
#![warn(missing_docs, unreachable_pub, missing_copy_implementations)]

mod config;
mod database_store;
mod error;
mod expiring_store;
mod gate;
mod hasher;
mod memory_store;
mod redact;
mod request;
mod service;
mod session;
mod session_store;
mod strategy;
mod user;

pub use config::{
    AuthConfig, StrategyFactory, StrategyKind, DEFAULT_EXEMPT_PATHS, DEFAULT_SESSION_COOKIE_NAME,
};
pub use database_store::{DatabaseStore, JsonFileRecords, SessionRecord, SessionRecords};
pub use error::Error;
pub use expiring_store::ExpiringStore;
pub use gate::{GateDecision, RequestGate};
pub use hasher::{CredentialHasher, HashedPassword};
pub use memory_store::MemoryStore;
pub use redact::{
    RedactingLogger, Redactor, DEFAULT_REDACTION, DEFAULT_SEPARATOR, PII_FIELDS,
};
pub use request::{ExemptPaths, RequestContext, AUTHORIZATION};
pub use service::AuthService;
pub use session::{Session, SessionId, SessionLifetime};
pub use session_store::{
    DebugTokenGenerator, DefaultTokenGenerator, SessionManager, SessionStore,
    SessionStoreImplementation, TokenGenerator, WriteSessionResult, DEFAULT_TOKEN_LENGTH,
};
pub use strategy::{AuthStrategy, BasicAuth, Credentials, NullStrategy, SessionAuth};
pub use user::{AddUserResult, MemoryUserStore, User, UserQuery, UserStore, UserUpdate};

/// A result with this crate's [`Error`] and a default return type of ()
pub type Result<T = ()> = std::result::Result<T, Error>;
