//! PostgreSQL-backed `SubscriptionRepository`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{RepositoryError, SubscriptionRepository};
use crate::domain::{Subscription, UserId};

use super::diesel_helpers::{corrupt_row, map_diesel_error};
use super::models::SubscriptionRow;
use super::pool::DbPool;
use super::schema::subscriptions;

/// Diesel implementation of [`SubscriptionRepository`].
#[derive(Clone)]
pub struct DieselSubscriptionRepository {
    pool: DbPool,
}

impl DieselSubscriptionRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_subscription(row: SubscriptionRow) -> Result<Subscription, RepositoryError> {
    Ok(Subscription {
        doctor_id: UserId::from_uuid(row.doctor_id),
        plan: row.plan.parse().map_err(|err| corrupt_row("plan", err))?,
        status: row
            .status
            .parse()
            .map_err(|err| corrupt_row("subscription status", err))?,
        current_period_end: row.current_period_end,
        cancel_at_period_end: row.cancel_at_period_end,
        trial_used: row.trial_used,
        updated_at: row.updated_at,
    })
}

#[async_trait]
impl SubscriptionRepository for DieselSubscriptionRepository {
    async fn find(&self, doctor_id: UserId) -> Result<Option<Subscription>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let row = subscriptions::table
            .find(doctor_id.as_uuid())
            .select(SubscriptionRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_subscription).transpose()
    }

    async fn save(&self, subscription: &Subscription) -> Result<(), RepositoryError> {
        let row = SubscriptionRow {
            doctor_id: *subscription.doctor_id.as_uuid(),
            plan: subscription.plan.as_str().to_owned(),
            status: subscription.status.as_str().to_owned(),
            current_period_end: subscription.current_period_end,
            cancel_at_period_end: subscription.cancel_at_period_end,
            trial_used: subscription.trial_used,
            updated_at: subscription.updated_at,
        };
        let mut conn = self.pool.get().await?;
        diesel::insert_into(subscriptions::table)
            .values(&row)
            .on_conflict(subscriptions::doctor_id)
            .do_update()
            .set((
                subscriptions::plan.eq(excluded(subscriptions::plan)),
                subscriptions::status.eq(excluded(subscriptions::status)),
                subscriptions::current_period_end.eq(excluded(subscriptions::current_period_end)),
                subscriptions::cancel_at_period_end
                    .eq(excluded(subscriptions::cancel_at_period_end)),
                subscriptions::trial_used.eq(excluded(subscriptions::trial_used)),
                subscriptions::updated_at.eq(excluded(subscriptions::updated_at)),
            ))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }
}
