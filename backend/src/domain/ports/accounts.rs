//! Driving port for registration, login and account lookups.

use async_trait::async_trait;

use crate::domain::{Error, LoginCredentials, Page, PageRequest, Principal, Registration, Role, User};

/// Account use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Accounts: Send + Sync {
    /// Create a doctor or patient account.
    async fn register(&self, registration: Registration) -> Result<User, Error>;

    /// Check credentials and return the account they belong to.
    async fn login(&self, credentials: &LoginCredentials) -> Result<User, Error>;

    /// The caller's own account.
    async fn current_user(&self, principal: Principal) -> Result<User, Error>;

    /// Every account, for operators.
    async fn list_users(
        &self,
        principal: Principal,
        role: Option<Role>,
        page: PageRequest,
    ) -> Result<Page<User>, Error>;
}
