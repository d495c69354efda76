use crate::{AuthStrategy, CredentialHasher, RequestContext, User, UserQuery, UserStore};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

const BASIC_SCHEME: &str = "Basic ";

/// An email and password pair taken from a request.
#[derive(Clone, Eq, PartialEq)]
pub struct Credentials {
    /// The login identifier.
    pub email: String,
    /// The cleartext password.
    pub password: String,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// HTTP Basic authentication.
///
/// Each request carries `Authorization: Basic <base64(email:password)>`, and the password is
/// verified against the user store on every request.
#[derive(Debug)]
pub struct BasicAuth {
    users: Arc<dyn UserStore>,
    hasher: CredentialHasher,
}

impl BasicAuth {
    /// Create a strategy resolving users from `users`.
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self::new_with_hasher(users, CredentialHasher::default())
    }

    /// Create a strategy resolving users from `users`, verifying passwords with `hasher`.
    pub fn new_with_hasher(users: Arc<dyn UserStore>, hasher: CredentialHasher) -> Self {
        Self { users, hasher }
    }

    /// Returns the base64 part of an `Authorization` header value of the `Basic` scheme.
    pub fn extract_base64_authorization_header<'header>(
        &self,
        authorization_header: &'header str,
    ) -> Option<&'header str> {
        authorization_header
            .strip_prefix(BASIC_SCHEME)
            .filter(|token| !token.is_empty())
    }

    /// Decodes a base64 token into a UTF-8 string.
    pub fn decode_base64_authorization_header(&self, token: &str) -> Option<String> {
        let bytes = STANDARD.decode(token).ok()?;
        String::from_utf8(bytes).ok()
    }

    /// Splits a decoded `email:password` string on its first `:`.
    /// The password may contain further colons. Neither part may be empty.
    pub fn extract_user_credentials(&self, decoded: &str) -> Option<Credentials> {
        let (email, password) = decoded.split_once(':')?;
        if email.is_empty() || password.is_empty() {
            return None;
        }
        Some(Credentials {
            email: email.to_string(),
            password: password.to_string(),
        })
    }

    /// Returns the user with the given credentials, if it exists and the password is correct.
    pub async fn user_object_from_credentials(&self, credentials: &Credentials) -> Option<User> {
        let user = match self
            .users
            .find_user_by(UserQuery::Email(&credentials.email))
            .await
        {
            Ok(Some(user)) => user,
            Ok(None) => {
                log::debug!("Basic auth for unknown user {}", credentials.email);
                return None;
            }
            Err(error) => {
                log::warn!("Failed to look up user {}: {error:#}", credentials.email);
                return None;
            }
        };

        if self.hasher.verify(&user.hashed_password, &credentials.password) {
            Some(user)
        } else {
            log::debug!("Basic auth with wrong password for user {}", credentials.email);
            None
        }
    }
}

#[async_trait]
impl AuthStrategy for BasicAuth {
    async fn current_user(&self, request: &RequestContext) -> Option<User> {
        let header = self.authorization_header(request)?;
        let token = self.extract_base64_authorization_header(header)?;
        let decoded = self.decode_base64_authorization_header(token)?;
        let credentials = self.extract_user_credentials(&decoded)?;
        self.user_object_from_credentials(&credentials).await
    }
}
