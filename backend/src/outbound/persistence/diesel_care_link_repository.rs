//! PostgreSQL-backed `CareLinkRepository`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{CareLinkRepository, RepositoryError};
use crate::domain::{CareLink, LinkedUser, Page, PageKey, PageRequest, UserId};

use super::diesel_helpers::{fetch_limit, map_diesel_error, touched};
use super::diesel_user_repository::row_to_user;
use super::models::{CareLinkRow, UserRow};
use super::pool::DbPool;
use super::schema::{care_links, users};

/// Diesel implementation of [`CareLinkRepository`].
#[derive(Clone)]
pub struct DieselCareLinkRepository {
    pool: DbPool,
}

impl DieselCareLinkRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn linked(user: UserRow, linked_at: DateTime<Utc>) -> Result<LinkedUser, RepositoryError> {
    Ok(LinkedUser {
        user: row_to_user(user)?,
        linked_at,
    })
}

#[async_trait]
impl CareLinkRepository for DieselCareLinkRepository {
    async fn insert(&self, link: &CareLink) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await?;
        let row = CareLinkRow {
            doctor_id: *link.doctor_id.as_uuid(),
            patient_id: *link.patient_id.as_uuid(),
            created_at: link.created_at,
        };
        diesel::insert_into(care_links::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn delete(&self, doctor_id: UserId, patient_id: UserId) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await?;
        diesel::delete(
            care_links::table
                .filter(care_links::doctor_id.eq(doctor_id.as_uuid()))
                .filter(care_links::patient_id.eq(patient_id.as_uuid())),
        )
        .execute(&mut conn)
        .await
        .map(touched)
        .map_err(map_diesel_error)
    }

    async fn exists(&self, doctor_id: UserId, patient_id: UserId) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await?;
        diesel::select(diesel::dsl::exists(
            care_links::table
                .filter(care_links::doctor_id.eq(doctor_id.as_uuid()))
                .filter(care_links::patient_id.eq(patient_id.as_uuid())),
        ))
        .get_result(&mut conn)
        .await
        .map_err(map_diesel_error)
    }

    async fn count_patients(&self, doctor_id: UserId) -> Result<u64, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let count: i64 = care_links::table
            .filter(care_links::doctor_id.eq(doctor_id.as_uuid()))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn list_patients(
        &self,
        doctor_id: UserId,
        page: PageRequest,
    ) -> Result<Page<LinkedUser>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let mut query = care_links::table
            .inner_join(users::table.on(users::id.eq(care_links::patient_id)))
            .filter(care_links::doctor_id.eq(doctor_id.as_uuid()))
            .select((UserRow::as_select(), care_links::created_at))
            .order((care_links::created_at.desc(), care_links::patient_id.desc()))
            .limit(fetch_limit(&page))
            .into_boxed();
        if let Some(after) = page.after {
            query = query.filter(
                care_links::created_at.lt(after.created_at).or(care_links::created_at
                    .eq(after.created_at)
                    .and(care_links::patient_id.lt(after.id))),
            );
        }
        let rows: Vec<(UserRow, DateTime<Utc>)> =
            query.load(&mut conn).await.map_err(map_diesel_error)?;
        let patients = rows
            .into_iter()
            .map(|(user, linked_at)| linked(user, linked_at))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::from_overfetch(patients, &page, |patient| {
            PageKey::new(patient.linked_at, *patient.user.id.as_uuid())
        }))
    }

    async fn list_doctors(&self, patient_id: UserId) -> Result<Vec<LinkedUser>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let rows: Vec<(UserRow, DateTime<Utc>)> = care_links::table
            .inner_join(users::table.on(users::id.eq(care_links::doctor_id)))
            .filter(care_links::patient_id.eq(patient_id.as_uuid()))
            .select((UserRow::as_select(), care_links::created_at))
            .order(care_links::created_at.asc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter()
            .map(|(user, linked_at)| linked(user, linked_at))
            .collect()
    }
}
