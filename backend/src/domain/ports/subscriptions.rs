//! Driving port for doctor subscriptions.

use async_trait::async_trait;

use crate::domain::{Error, Plan, Principal, Subscription, SubscriptionStatus, UserId};

/// A subscription with its entitlements as of today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionView {
    /// Stored or implicit subscription.
    pub subscription: Subscription,
    /// Plan whose limits apply today.
    pub effective_plan: Plan,
    /// Patient cap, `None` for unlimited.
    pub patient_limit: Option<u32>,
    /// Patients currently linked.
    pub patients_linked: u64,
}

/// Subscription use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Subscriptions: Send + Sync {
    /// The calling doctor's subscription.
    async fn get_mine(&self, principal: Principal) -> Result<SubscriptionView, Error>;

    /// Switch the calling doctor's plan.
    async fn change_plan(&self, principal: Principal, plan: Plan) -> Result<SubscriptionView, Error>;

    /// Schedule cancellation at the end of the period.
    async fn cancel(&self, principal: Principal) -> Result<SubscriptionView, Error>;

    /// Override a doctor's billing status.
    async fn set_status(
        &self,
        principal: Principal,
        doctor_id: UserId,
        status: SubscriptionStatus,
    ) -> Result<SubscriptionView, Error>;

    /// Patient cap in force for a doctor today.
    async fn patient_limit(&self, doctor_id: UserId) -> Result<Option<u32>, Error>;
}
