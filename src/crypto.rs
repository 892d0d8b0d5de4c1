//! Password hashing.

use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Argon2, Params, Version};
use rand::rngs::OsRng;

use crate::config::Argon2 as ArgonConfig;

#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("argon2 error: {0}")]
    Argon2(String),
    #[error("stored credential is not a PHC string")]
    Credential,
}

/// Turn plaintext passwords into opaque credentials and back-check them.
#[derive(Clone, Debug)]
pub struct PasswordManager {
    params: Params,
}

impl PasswordManager {
    /// Create a new [`PasswordManager`].
    pub fn new(config: Option<ArgonConfig>) -> Result<Self, CryptoError> {
        let config = config.unwrap_or_default();

        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            Some(config.hash_length),
        )
        .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'_> {
        Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash password using Argon2id.
    ///
    /// The returned bytes are the PHC string, salt included.
    pub fn hash_password(
        &self,
        password: impl AsRef<[u8]>,
    ) -> Result<Vec<u8>, CryptoError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_ref(), &salt)
            .map_err(|e| CryptoError::Argon2(e.to_string()))?;

        Ok(hash.to_string().into_bytes())
    }

    /// Check `password` against a credential produced by
    /// [`PasswordManager::hash_password`].
    pub fn verify_password(
        &self,
        password: impl AsRef<[u8]>,
        credential: &[u8],
    ) -> Result<bool, CryptoError> {
        let phc = std::str::from_utf8(credential).map_err(|_| CryptoError::Credential)?;
        let hash = PasswordHash::new(phc).map_err(|_| CryptoError::Credential)?;

        match self.argon2().verify_password(password.as_ref(), &hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(err) => Err(CryptoError::Argon2(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> PasswordManager {
        // Small parameters keep tests fast.
        PasswordManager::new(Some(ArgonConfig {
            memory_cost: 1024,
            iterations: 1,
            parallelism: 1,
            hash_length: 32,
        }))
        .unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let pwd = manager();
        let credential = pwd.hash_password("correct horse").unwrap();

        assert!(credential.starts_with(b"$argon2id$"));
        assert!(pwd.verify_password("correct horse", &credential).unwrap());
        assert!(!pwd.verify_password("battery staple", &credential).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let pwd = manager();
        assert_ne!(
            pwd.hash_password("same").unwrap(),
            pwd.hash_password("same").unwrap()
        );
    }

    #[test]
    fn test_garbage_credential() {
        let pwd = manager();
        assert!(matches!(
            pwd.verify_password("x", &[0xff, 0x00]),
            Err(CryptoError::Credential)
        ));
    }

    #[test]
    fn test_invalid_params() {
        let err = PasswordManager::new(Some(ArgonConfig {
            memory_cost: 1,
            iterations: 0,
            parallelism: 1,
            hash_length: 32,
        }));
        assert!(err.is_err());
    }
}
