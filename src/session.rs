use chrono::{DateTime, Duration, Utc};
use std::fmt::{Debug, Formatter};

/// A login session as held by a session store.
///
/// A session is created on login and never mutated afterwards.
/// It ends when it is destroyed on logout or when it outlives the configured [`SessionLifetime`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Session {
    user_id: String,
    created_at: DateTime<Utc>,
}

/// How long a session stays valid after its creation.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub enum SessionLifetime {
    /// Sessions never expire, unless they are explicitly destroyed.
    #[default]
    Never,
    /// Sessions expire once they are older than the given duration.
    Limited(Duration),
}

/// Larger lifetimes would overflow [`Duration`].
const MAXIMUM_LIFETIME_SECONDS: i64 = i64::MAX / 1_000;

/// A session id.
///
/// Stores never see session tokens. They are keyed by the hash of the token instead,
/// so a leaked store does not leak usable tokens.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SessionId(Box<[u8; blake3::OUT_LEN]>);

impl Session {
    /// Create a session for `user_id` that was created at `created_at`.
    pub fn new(user_id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            created_at,
        }
    }

    /// The id of the user owning this session.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Consume the session, returning the id of the user owning it.
    pub fn into_user_id(self) -> String {
        self.user_id
    }

    /// The creation time of this session.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns true if this session is expired at `now` under the given `lifetime`.
    /// A session is still valid at the very instant its lifetime is reached.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use typed_auth::{Session, SessionLifetime};
    /// use chrono::{Duration, Utc};
    ///
    /// let now = Utc::now();
    /// let session = Session::new("user-1", now - Duration::seconds(2));
    /// assert!(session.is_expired(now, SessionLifetime::from_seconds(1)));
    /// assert!(!session.is_expired(now, SessionLifetime::from_seconds(2)));
    /// assert!(!session.is_expired(now, SessionLifetime::Never));
    /// ```
    pub fn is_expired(&self, now: DateTime<Utc>, lifetime: SessionLifetime) -> bool {
        match lifetime {
            SessionLifetime::Never => false,
            SessionLifetime::Limited(ttl) => self
                .created_at
                .checked_add_signed(ttl)
                .map_or(false, |expiry| expiry < now),
        }
    }
}

impl SessionLifetime {
    /// Interpret a number of seconds as a session lifetime.
    /// Zero or negative values mean that sessions never expire.
    pub fn from_seconds(seconds: i64) -> Self {
        if seconds <= 0 {
            Self::Never
        } else {
            Self::Limited(Duration::seconds(seconds.min(MAXIMUM_LIFETIME_SECONDS)))
        }
    }

    /// Parse a lifetime from a configuration value in seconds.
    /// Absent or non-numeric values mean that sessions never expire.
    pub fn parse_seconds(value: Option<&str>) -> Self {
        value
            .and_then(|value| value.trim().parse::<i64>().ok())
            .map(Self::from_seconds)
            .unwrap_or_default()
    }
}

impl SessionId {
    /// Applies a cryptographic hash function on a session token to obtain the session id for that token.
    pub fn from_token(token: &str) -> Self {
        let hash = blake3::hash(token.as_bytes());
        Self(Box::new(hash.into()))
    }

    /// Hex representation of this id, used as key by durable session record backends.
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(*self.0).to_hex().to_string()
    }
}

impl Debug for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionId({})", self.to_hex())
    }
}
