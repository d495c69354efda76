use crate::{Error, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use std::fmt::{Debug, Formatter};

/// A salted password hash in PHC string format.
///
/// The string embeds the algorithm, its cost parameters and the salt, so it can be verified
/// without any further context. Two hashes of the same password differ, so there is no `PartialEq`:
/// compare with [`CredentialHasher::verify`].
#[derive(Clone)]
pub struct HashedPassword(String);

impl HashedPassword {
    /// Wrap a PHC string loaded from storage. The string is not validated here,
    /// a malformed hash simply never verifies.
    pub fn from_phc_string(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    /// The PHC string, for writing to storage.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for HashedPassword {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("HashedPassword(..)")
    }
}

/// One-way password hashing with Argon2id.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    /// Create a hasher with Argon2's default cost parameters.
    pub fn new() -> Self {
        Self::with_params(Params::default())
    }

    /// Create a hasher with custom Argon2id cost parameters.
    pub fn with_params(params: Params) -> Self {
        Self { params }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash `secret` with a fresh random salt.
    pub fn hash(&self, secret: &str) -> Result<HashedPassword> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| HashedPassword(hash.to_string()))
            .map_err(|error| Error::PasswordHashing(error.to_string()))
    }

    /// Check `secret` against `hash`.
    ///
    /// The parameters and salt embedded in `hash` are used, not the ones of this hasher.
    /// A hash that cannot be parsed yields `false`.
    pub fn verify(&self, hash: &HashedPassword, secret: &str) -> bool {
        let parsed = match PasswordHash::new(hash.as_str()) {
            Ok(parsed) => parsed,
            Err(error) => {
                log::debug!("Refusing to verify against a malformed password hash: {error}");
                return false;
            }
        };
        self.argon2()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new()
    }
}
