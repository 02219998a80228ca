//! Argon2id implementation of the `PasswordHasher` port.
//!
//! Hashes are stored as PHC strings, so parameters and salt travel with the
//! hash and older hashes keep verifying after a parameter change.

use argon2::password_hash::{self, PasswordHasher as _, PasswordVerifier as _, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;

use crate::domain::ports::{PasswordHashError, PasswordHasher};
use crate::domain::{Password, PasswordHash};

/// Argon2id hasher.
#[derive(Clone, Default)]
pub struct Argon2PasswordHasher {
    params: Params,
}

impl Argon2PasswordHasher {
    /// Hasher with explicit cost parameters.
    ///
    /// # Errors
    /// Returns [`PasswordHashError::Hash`] when the parameters are out of
    /// range for Argon2.
    pub fn with_costs(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, PasswordHashError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|err| PasswordHashError::hash(err.to_string()))?;
        Ok(Self { params })
    }

    fn engine(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, password: &Password) -> Result<PasswordHash, PasswordHashError> {
        let salt = SaltString::generate(&mut OsRng);
        let phc = self
            .engine()
            .hash_password(password.expose().as_bytes(), &salt)
            .map_err(|err| PasswordHashError::hash(err.to_string()))?;
        Ok(PasswordHash::new(phc.to_string()))
    }

    fn verify(&self, password: &Password, hash: &PasswordHash) -> Result<bool, PasswordHashError> {
        let parsed = password_hash::PasswordHash::new(hash.as_str())
            .map_err(|err| PasswordHashError::malformed(err.to_string()))?;
        match self.engine().verify_password(password.expose().as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(err) => Err(PasswordHashError::hash(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn hasher() -> Argon2PasswordHasher {
        // Minimum costs keep the suite fast.
        Argon2PasswordHasher::with_costs(Params::MIN_M_COST, 1, 1).expect("valid costs")
    }

    fn password(raw: &str) -> Password {
        Password::new(raw).expect("valid password")
    }

    #[rstest]
    fn hashes_verify_against_the_same_password(hasher: Argon2PasswordHasher) {
        let hash = hasher.hash(&password("correct horse")).expect("hash");
        assert!(hash.as_str().starts_with("$argon2id$"));
        assert!(hasher.verify(&password("correct horse"), &hash).expect("verify"));
    }

    #[rstest]
    fn wrong_passwords_do_not_verify(hasher: Argon2PasswordHasher) {
        let hash = hasher.hash(&password("correct horse")).expect("hash");
        assert!(!hasher.verify(&password("battery staple"), &hash).expect("verify"));
    }

    #[rstest]
    fn salts_differ_between_hashes(hasher: Argon2PasswordHasher) {
        let first = hasher.hash(&password("correct horse")).expect("hash");
        let second = hasher.hash(&password("correct horse")).expect("hash");
        assert_ne!(first, second);
    }

    #[rstest]
    fn malformed_hashes_are_reported(hasher: Argon2PasswordHasher) {
        let err = hasher
            .verify(&password("correct horse"), &PasswordHash::new("plaintext".to_owned()))
            .expect_err("malformed");
        assert!(matches!(err, PasswordHashError::Malformed { .. }));
    }

    #[rstest]
    fn zero_parallelism_is_rejected() {
        assert!(Argon2PasswordHasher::with_costs(Params::MIN_M_COST, 1, 0).is_err());
    }
}
