//! Port for doctor subscriptions.

use async_trait::async_trait;

use crate::domain::{Subscription, UserId};

use super::RepositoryError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// The stored subscription, `None` for doctors still on the implicit
    /// free plan.
    async fn find(&self, doctor_id: UserId) -> Result<Option<Subscription>, RepositoryError>;

    /// Insert or replace the doctor's subscription.
    async fn save(&self, subscription: &Subscription) -> Result<(), RepositoryError>;
}
