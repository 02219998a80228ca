//! Port abstraction for account persistence.

use async_trait::async_trait;

use crate::domain::{EmailAddress, Page, PageRequest, PasswordHash, Role, User, UserId};

use super::RepositoryError;

/// An account together with its stored password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    /// Account.
    pub user: User,
    /// PHC hash to verify against.
    pub password_hash: PasswordHash,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account.
    ///
    /// Returns [`RepositoryError::Conflict`] when the e-mail is taken.
    async fn insert(&self, user: &User, password_hash: &PasswordHash)
    -> Result<(), RepositoryError>;

    /// Fetch an account by identifier.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Fetch an account by normalised e-mail.
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, RepositoryError>;

    /// Fetch an account and its hash for login.
    async fn find_credentials(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<StoredCredentials>, RepositoryError>;

    /// List accounts newest first, optionally restricted to one role.
    async fn list(
        &self,
        role: Option<Role>,
        page: PageRequest,
    ) -> Result<Page<User>, RepositoryError>;
}
