//! Authentication strategies.
//!
//! The default method bodies of [`AuthStrategy`] form the base strategy, which never
//! authenticates anybody. The other strategies override what they need.

use crate::request::AUTHORIZATION;
use crate::{ExemptPaths, RequestContext, Result, User};
use async_trait::async_trait;
use std::fmt::Debug;

mod basic;
mod session;

pub use basic::{BasicAuth, Credentials};
pub use session::SessionAuth;

/// An authentication strategy.
///
/// One strategy instance is selected at process start (see [`StrategyFactory`](crate::StrategyFactory))
/// and asked about every inbound request.
#[async_trait]
pub trait AuthStrategy: Debug + Send + Sync {
    /// Returns false iff `path` matches one of the `exempt` patterns.
    fn requires_auth(&self, path: Option<&str>, exempt: &ExemptPaths) -> bool {
        exempt.requires_auth(path)
    }

    /// The value of the `Authorization` header, if present.
    fn authorization_header<'request>(&self, request: &'request RequestContext) -> Option<&'request str> {
        request.header(AUTHORIZATION)
    }

    /// The value of the session cookie, if this strategy uses sessions and the cookie is present.
    fn session_cookie<'request>(&self, _request: &'request RequestContext) -> Option<&'request str> {
        None
    }

    /// The user authenticated by `request`, if any.
    async fn current_user(&self, _request: &RequestContext) -> Option<User> {
        None
    }

    /// Start a session for `user_id` and return its token.
    /// Returns `Ok(None)` if this strategy does not use sessions or `user_id` is empty.
    async fn create_session(&self, _user_id: &str) -> Result<Option<String>> {
        Ok(None)
    }

    /// End the session referenced by `request`.
    /// Returns true if a session was destroyed.
    async fn destroy_session(&self, _request: &RequestContext) -> Result<bool> {
        Ok(false)
    }
}

/// The base strategy. It requires authentication for non-exempt paths, but never resolves a user.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStrategy;

impl AuthStrategy for NullStrategy {}
