//! Port for one-way password hashing.

use crate::domain::{Password, PasswordHash};

use super::define_port_error;

define_port_error! {
    /// Failures raised by hashing adapters.
    pub enum PasswordHashError {
        /// Hashing the password failed.
        Hash => "password hashing failed",
        /// The stored hash could not be parsed.
        Malformed => "stored password hash is malformed",
    }
}

/// Hash and verify passwords. Implementations are CPU bound and synchronous.
#[cfg_attr(test, mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    /// Produce a salted hash of `password`.
    fn hash(&self, password: &Password) -> Result<PasswordHash, PasswordHashError>;

    /// Whether `password` matches `hash`.
    fn verify(&self, password: &Password, hash: &PasswordHash) -> Result<bool, PasswordHashError>;
}
