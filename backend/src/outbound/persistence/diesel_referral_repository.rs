//! PostgreSQL-backed `ReferralRepository`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{ReferralRepository, RepositoryError};
use crate::domain::{
    EmailAddress, Page, PageKey, PageRequest, Referral, ReferralDraft, ReferralFilter, ReferralId,
    ReferralStatus, Role, UserId,
};

use super::diesel_helpers::{corrupt_row, fetch_limit, map_diesel_error};
use super::models::ReferralRow;
use super::pool::DbPool;
use super::schema::referrals;

/// Diesel implementation of [`ReferralRepository`].
#[derive(Clone)]
pub struct DieselReferralRepository {
    pool: DbPool,
}

impl DieselReferralRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn open_statuses() -> Vec<&'static str> {
    ReferralStatus::ALL
        .into_iter()
        .filter(|status| status.is_open())
        .map(ReferralStatus::as_str)
        .collect()
}

fn referral_to_row(referral: &Referral) -> ReferralRow {
    ReferralRow {
        id: *referral.id.as_uuid(),
        referrer_id: *referral.referrer_id.as_uuid(),
        target_role: referral.draft.target_role.as_str().to_owned(),
        referee_name: referral.draft.referee_name.clone(),
        referee_email: referral.draft.referee_email.as_str().to_owned(),
        referee_phone: referral.draft.referee_phone.clone(),
        notes: referral.draft.notes.clone(),
        status: referral.status.as_str().to_owned(),
        converted_user_id: referral.converted_user_id.map(|id| *id.as_uuid()),
        created_at: referral.created_at,
        updated_at: referral.updated_at,
    }
}

fn row_to_referral(row: ReferralRow) -> Result<Referral, RepositoryError> {
    let target_role: Role = row
        .target_role
        .parse()
        .map_err(|err| corrupt_row("referral target role", err))?;
    let draft = ReferralDraft::new(
        target_role,
        &row.referee_name,
        &row.referee_email,
        row.referee_phone.as_deref(),
        row.notes.as_deref(),
    )
    .map_err(|err| corrupt_row("referral", err))?;
    Ok(Referral {
        id: ReferralId::from_uuid(row.id),
        referrer_id: UserId::from_uuid(row.referrer_id),
        draft,
        status: row
            .status
            .parse()
            .map_err(|err| corrupt_row("referral status", err))?,
        converted_user_id: row.converted_user_id.map(UserId::from_uuid),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[async_trait]
impl ReferralRepository for DieselReferralRepository {
    async fn insert(&self, referral: &Referral) -> Result<(), RepositoryError> {
        let row = referral_to_row(referral);
        let mut conn = self.pool.get().await?;
        diesel::insert_into(referrals::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn save(&self, referral: &Referral) -> Result<(), RepositoryError> {
        let row = referral_to_row(referral);
        let mut conn = self.pool.get().await?;
        diesel::update(referrals::table.find(row.id))
            .set(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find(&self, id: ReferralId) -> Result<Option<Referral>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let row = referrals::table
            .find(id.as_uuid())
            .select(ReferralRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_referral).transpose()
    }

    async fn has_open(&self, referrer_id: UserId, email: &EmailAddress) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await?;
        diesel::select(diesel::dsl::exists(
            referrals::table
                .filter(referrals::referrer_id.eq(referrer_id.as_uuid()))
                .filter(referrals::referee_email.eq(email.as_str()))
                .filter(referrals::status.eq_any(open_statuses())),
        ))
        .get_result(&mut conn)
        .await
        .map_err(map_diesel_error)
    }

    async fn open_by_email(&self, email: &EmailAddress) -> Result<Vec<Referral>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let rows = referrals::table
            .filter(referrals::referee_email.eq(email.as_str()))
            .filter(referrals::status.eq_any(open_statuses()))
            .select(ReferralRow::as_select())
            .order((referrals::created_at.asc(), referrals::id.asc()))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_referral).collect()
    }

    async fn list(&self, filter: ReferralFilter, page: PageRequest) -> Result<Page<Referral>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let mut query = referrals::table
            .select(ReferralRow::as_select())
            .order((referrals::created_at.desc(), referrals::id.desc()))
            .limit(fetch_limit(&page))
            .into_boxed();
        if let Some(referrer_id) = filter.referrer_id {
            query = query.filter(referrals::referrer_id.eq(*referrer_id.as_uuid()));
        }
        if let Some(status) = filter.status {
            query = query.filter(referrals::status.eq(status.as_str()));
        }
        if let Some(after) = page.after {
            query = query.filter(
                referrals::created_at.lt(after.created_at).or(referrals::created_at
                    .eq(after.created_at)
                    .and(referrals::id.lt(after.id))),
            );
        }
        let rows = query.load(&mut conn).await.map_err(map_diesel_error)?;
        let items = rows
            .into_iter()
            .map(row_to_referral)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::from_overfetch(items, &page, |referral| {
            PageKey::new(referral.created_at, *referral.id.as_uuid())
        }))
    }
}
