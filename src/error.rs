/// All errors that can occur in this crate.
///
/// Malformed credentials, unknown users and unknown or expired sessions are not errors:
/// the strategies report those as `None` or `false`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A user with the given email is already registered.
    #[error("user {email} already exists")]
    UserAlreadyExists {
        /// The email that was attempted to be registered twice.
        email: String,
    },

    /// No user matches the given email.
    #[error("no user found for email {email}")]
    UserNotFound {
        /// The email that was looked up.
        email: String,
    },

    /// The password reset token is empty, unknown or was already redeemed.
    #[error("the password reset token is invalid")]
    InvalidResetToken,

    /// The password hashing primitive failed.
    #[error("password hashing failed: {0}")]
    PasswordHashing(String),

    /// Tried as often as allowed to generate a session token, but all generated tokens already exist.
    #[error("the maximum number of retries to generate a session token was reached")]
    MaximumTokenGenerationTriesReached {
        /// The maximum number of retries that was reached.
        maximum: u8,
    },

    /// An exempt path pattern or a redaction pattern could not be compiled.
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// The underlying compilation error.
        source: regex::Error,
    },

    /// The database-backed session strategy was selected, but no session record backend was given.
    #[error("strategy session_db_auth requires a session record backend")]
    MissingSessionRecords,

    /// Reading or writing a session record file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Session records could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An error reported by a user store or session record backend.
    #[error("{0}")]
    Backend(#[from] anyhow::Error),
}

mod expect_impl_error {
    trait ExpectImplError: std::error::Error + Send + Sync + 'static {}

    impl ExpectImplError for super::Error {}
}
