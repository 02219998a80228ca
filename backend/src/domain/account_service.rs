//! Registration, login and account lookups.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::ports::{Accounts, PasswordHashError, PasswordHasher, Referrals, UserRepository};
use crate::domain::{
    Error, LoginCredentials, Page, PageRequest, Principal, Registration, Role, User, UserId,
};

fn invalid_credentials() -> Error {
    Error::unauthorized("invalid credentials")
}

fn map_hash_error(error: PasswordHashError) -> Error {
    Error::internal(error.to_string())
}

/// Account service implementing [`Accounts`].
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    referrals: Arc<dyn Referrals>,
    clock: Arc<dyn Clock>,
}

impl AccountService {
    /// Create the service.
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        referrals: Arc<dyn Referrals>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            hasher,
            referrals,
            clock,
        }
    }

    async fn convert_referrals(&self, user: &User) {
        match self.referrals.mark_converted_for(&user.email, user.id).await {
            Ok(0) => {}
            Ok(converted) => info!(user_id = %user.id, converted, "referrals converted"),
            Err(err) => warn!(user_id = %user.id, error = %err, "referral conversion failed"),
        }
    }
}

#[async_trait]
impl Accounts for AccountService {
    async fn register(&self, registration: Registration) -> Result<User, Error> {
        if registration.role == Role::SuperAdmin {
            return Err(Error::forbidden("super admin accounts cannot self-register"));
        }
        if self.users.find_by_email(&registration.email).await?.is_some() {
            return Err(Error::conflict("email already registered")
                .with_details(json!({ "field": "email", "code": "taken" })));
        }
        let hash = self
            .hasher
            .hash(&registration.password)
            .map_err(map_hash_error)?;
        let user = User {
            id: UserId::random(),
            email: registration.email,
            display_name: registration.display_name,
            role: registration.role,
            created_at: self.clock.utc(),
        };
        self.users.insert(&user, &hash).await?;
        info!(user_id = %user.id, role = %user.role, "account registered");
        self.convert_referrals(&user).await;
        Ok(user)
    }

    async fn login(&self, credentials: &LoginCredentials) -> Result<User, Error> {
        let Some(stored) = self.users.find_credentials(credentials.email()).await? else {
            return Err(invalid_credentials());
        };
        let matches = self
            .hasher
            .verify(credentials.password(), &stored.password_hash)
            .map_err(map_hash_error)?;
        if matches {
            Ok(stored.user)
        } else {
            Err(invalid_credentials())
        }
    }

    async fn current_user(&self, principal: Principal) -> Result<User, Error> {
        self.users
            .find_by_id(principal.user_id)
            .await?
            .ok_or_else(|| Error::unauthorized("session account no longer exists"))
    }

    async fn list_users(
        &self,
        principal: Principal,
        role: Option<Role>,
        page: PageRequest,
    ) -> Result<Page<User>, Error> {
        principal.require_admin()?;
        Ok(self.users.list(role, page).await?)
    }
}

#[cfg(test)]
#[path = "account_service_tests.rs"]
mod tests;
