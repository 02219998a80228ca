//! PostgreSQL-backed `ClinicRepository`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::AsyncConnection as _;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;

use crate::domain::ports::{ClinicRepository, RepositoryError};
use crate::domain::{Clinic, ClinicId, ClinicMember, ClinicMembership, ClinicRole, UserId};

use super::diesel_helpers::{corrupt_row, map_diesel_error, touched};
use super::diesel_user_repository::row_to_user;
use super::models::{ClinicRow, MembershipRow, UserRow};
use super::pool::DbPool;
use super::schema::{clinic_memberships, clinics, users};

/// Diesel implementation of [`ClinicRepository`].
#[derive(Clone)]
pub struct DieselClinicRepository {
    pool: DbPool,
}

impl DieselClinicRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn membership_to_row(membership: &ClinicMembership) -> MembershipRow {
    MembershipRow {
        clinic_id: *membership.clinic_id.as_uuid(),
        doctor_id: *membership.doctor_id.as_uuid(),
        role: membership.role.as_str().to_owned(),
        joined_at: membership.joined_at,
    }
}

fn row_to_membership(row: MembershipRow) -> Result<ClinicMembership, RepositoryError> {
    Ok(ClinicMembership {
        clinic_id: ClinicId::from_uuid(row.clinic_id),
        doctor_id: UserId::from_uuid(row.doctor_id),
        role: row
            .role
            .parse()
            .map_err(|err| corrupt_row("clinic role", err))?,
        joined_at: row.joined_at,
    })
}

fn row_to_clinic(row: ClinicRow) -> Clinic {
    Clinic {
        id: ClinicId::from_uuid(row.id),
        name: row.name,
        created_by: UserId::from_uuid(row.created_by),
        created_at: row.created_at,
    }
}

#[async_trait]
impl ClinicRepository for DieselClinicRepository {
    async fn create(&self, clinic: &Clinic, owner: &ClinicMembership) -> Result<(), RepositoryError> {
        let clinic_row = ClinicRow {
            id: *clinic.id.as_uuid(),
            name: clinic.name.clone(),
            created_by: *clinic.created_by.as_uuid(),
            created_at: clinic.created_at,
        };
        let owner_row = membership_to_row(owner);
        let mut conn = self.pool.get().await?;
        conn.transaction(|conn| {
            async move {
                diesel::insert_into(clinics::table)
                    .values(&clinic_row)
                    .execute(conn)
                    .await?;
                diesel::insert_into(clinic_memberships::table)
                    .values(&owner_row)
                    .execute(conn)
                    .await?;
                Ok::<_, diesel::result::Error>(())
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn find(&self, id: ClinicId) -> Result<Option<Clinic>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let row = clinics::table
            .find(id.as_uuid())
            .select(ClinicRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(row_to_clinic))
    }

    async fn membership(
        &self,
        clinic_id: ClinicId,
        doctor_id: UserId,
    ) -> Result<Option<ClinicMembership>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let row = clinic_memberships::table
            .find((clinic_id.as_uuid(), doctor_id.as_uuid()))
            .select(MembershipRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_membership).transpose()
    }

    async fn members(&self, clinic_id: ClinicId) -> Result<Vec<ClinicMember>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let rows: Vec<(MembershipRow, UserRow)> = clinic_memberships::table
            .inner_join(users::table.on(users::id.eq(clinic_memberships::doctor_id)))
            .filter(clinic_memberships::clinic_id.eq(clinic_id.as_uuid()))
            .select((MembershipRow::as_select(), UserRow::as_select()))
            .order((clinic_memberships::joined_at.asc(), clinic_memberships::doctor_id.asc()))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter()
            .map(|(membership, user)| {
                Ok(ClinicMember {
                    membership: row_to_membership(membership)?,
                    user: row_to_user(user)?,
                })
            })
            .collect()
    }

    async fn add_member(&self, membership: &ClinicMembership) -> Result<(), RepositoryError> {
        let row = membership_to_row(membership);
        let mut conn = self.pool.get().await?;
        diesel::insert_into(clinic_memberships::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn update_role(
        &self,
        clinic_id: ClinicId,
        doctor_id: UserId,
        role: ClinicRole,
    ) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await?;
        diesel::update(clinic_memberships::table.find((clinic_id.as_uuid(), doctor_id.as_uuid())))
            .set(clinic_memberships::role.eq(role.as_str()))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn remove_member(
        &self,
        clinic_id: ClinicId,
        doctor_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await?;
        diesel::delete(clinic_memberships::table.find((clinic_id.as_uuid(), doctor_id.as_uuid())))
            .execute(&mut conn)
            .await
            .map(touched)
            .map_err(map_diesel_error)
    }

    async fn count_owners(&self, clinic_id: ClinicId) -> Result<u64, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let count: i64 = clinic_memberships::table
            .filter(clinic_memberships::clinic_id.eq(clinic_id.as_uuid()))
            .filter(clinic_memberships::role.eq(ClinicRole::Owner.as_str()))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn clinics_for(&self, doctor_id: UserId) -> Result<Vec<(Clinic, ClinicRole)>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let rows: Vec<(ClinicRow, String)> = clinic_memberships::table
            .inner_join(clinics::table)
            .filter(clinic_memberships::doctor_id.eq(doctor_id.as_uuid()))
            .select((ClinicRow::as_select(), clinic_memberships::role))
            .order((clinics::name.asc(), clinics::id.asc()))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter()
            .map(|(clinic, role)| {
                let role = role.parse().map_err(|err| corrupt_row("clinic role", err))?;
                Ok((row_to_clinic(clinic), role))
            })
            .collect()
    }
}
