//! PostgreSQL-backed `UserRepository`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{RepositoryError, StoredCredentials, UserRepository};
use crate::domain::{
    DisplayName, EmailAddress, Page, PageKey, PageRequest, PasswordHash, Role, User, UserId,
};

use super::diesel_helpers::{corrupt_row, fetch_limit, map_diesel_error};
use super::models::{CredentialsRow, NewUserRow, UserRow};
use super::pool::DbPool;
use super::schema::users;

/// Diesel implementation of [`UserRepository`].
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Rebuild an account, re-validating the stored text columns.
pub(super) fn row_to_user(row: UserRow) -> Result<User, RepositoryError> {
    Ok(User {
        id: UserId::from_uuid(row.id),
        email: EmailAddress::parse(&row.email).map_err(|err| corrupt_row("user email", err))?,
        display_name: DisplayName::new(&row.display_name)
            .map_err(|err| corrupt_row("display name", err))?,
        role: row
            .role
            .parse::<Role>()
            .map_err(|err| corrupt_row("user role", err))?,
        created_at: row.created_at,
    })
}

pub(super) fn user_key(user: &User) -> PageKey {
    PageKey::new(user.created_at, *user.id.as_uuid())
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn insert(&self, user: &User, password_hash: &PasswordHash) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await?;
        let row = NewUserRow {
            id: *user.id.as_uuid(),
            email: user.email.as_str(),
            display_name: user.display_name.as_str(),
            role: user.role.as_str(),
            password_hash: password_hash.as_str(),
            created_at: user.created_at,
        };
        diesel::insert_into(users::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let row = users::table
            .filter(users::id.eq(id.as_uuid()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_user).transpose()
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let row = users::table
            .filter(users::email.eq(email.as_str()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_user).transpose()
    }

    async fn find_credentials(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<StoredCredentials>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let row = users::table
            .filter(users::email.eq(email.as_str()))
            .select(CredentialsRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(|row| {
            Ok(StoredCredentials {
                user: row_to_user(row.user)?,
                password_hash: PasswordHash::new(row.password_hash),
            })
        })
        .transpose()
    }

    async fn list(&self, role: Option<Role>, page: PageRequest) -> Result<Page<User>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let mut query = users::table
            .select(UserRow::as_select())
            .order((users::created_at.desc(), users::id.desc()))
            .limit(fetch_limit(&page))
            .into_boxed();
        if let Some(role) = role {
            query = query.filter(users::role.eq(role.as_str()));
        }
        if let Some(after) = page.after {
            query = query.filter(
                users::created_at.lt(after.created_at).or(users::created_at
                    .eq(after.created_at)
                    .and(users::id.lt(after.id))),
            );
        }
        let rows = query.load(&mut conn).await.map_err(map_diesel_error)?;
        let accounts = rows
            .into_iter()
            .map(row_to_user)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::from_overfetch(accounts, &page, user_key))
    }
}
