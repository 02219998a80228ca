//! Port for referral persistence.

use async_trait::async_trait;

use crate::domain::{
    EmailAddress, Page, PageRequest, Referral, ReferralFilter, ReferralId, UserId,
};

use super::RepositoryError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReferralRepository: Send + Sync {
    /// Store a new referral.
    async fn insert(&self, referral: &Referral) -> Result<(), RepositoryError>;

    /// Persist a status change.
    async fn save(&self, referral: &Referral) -> Result<(), RepositoryError>;

    /// Fetch a referral.
    async fn find(&self, id: ReferralId) -> Result<Option<Referral>, RepositoryError>;

    /// Whether the referrer already has an open referral for `email`.
    async fn has_open(
        &self,
        referrer_id: UserId,
        email: &EmailAddress,
    ) -> Result<bool, RepositoryError>;

    /// Open referrals addressed to `email`, from any referrer.
    async fn open_by_email(&self, email: &EmailAddress) -> Result<Vec<Referral>, RepositoryError>;

    /// Referrals matching `filter`, newest first.
    async fn list(
        &self,
        filter: ReferralFilter,
        page: PageRequest,
    ) -> Result<Page<Referral>, RepositoryError>;
}
