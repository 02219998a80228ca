//! Driving port for referrals.

use async_trait::async_trait;

use crate::domain::{
    EmailAddress, Error, Page, PageRequest, Principal, Referral, ReferralDraft, ReferralId,
    ReferralStatus, UserId,
};

/// Referral use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Referrals: Send + Sync {
    /// Record a referral from the caller.
    async fn create(&self, principal: Principal, draft: ReferralDraft) -> Result<Referral, Error>;

    /// Referrals raised by the caller.
    async fn list_mine(
        &self,
        principal: Principal,
        page: PageRequest,
    ) -> Result<Page<Referral>, Error>;

    /// Every referral, for operators.
    async fn list_all(
        &self,
        principal: Principal,
        status: Option<ReferralStatus>,
        page: PageRequest,
    ) -> Result<Page<Referral>, Error>;

    /// Move a referral through its lifecycle.
    async fn update_status(
        &self,
        principal: Principal,
        id: ReferralId,
        status: ReferralStatus,
        notes: Option<String>,
    ) -> Result<Referral, Error>;

    /// Convert every open referral addressed to `email`; returns how many.
    async fn mark_converted_for(&self, email: &EmailAddress, user_id: UserId)
    -> Result<usize, Error>;
}
