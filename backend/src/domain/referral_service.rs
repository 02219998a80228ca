//! Referral intake, the admin review lifecycle and conversion on sign-up.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::info;

use super::referral::NOTES_MAX;
use super::validation::{ValidationError, optional_text};
use crate::domain::ports::{ReferralRepository, Referrals, UserRepository};
use crate::domain::{
    EmailAddress, Error, Page, PageRequest, Principal, Referral, ReferralDraft, ReferralFilter,
    ReferralId, ReferralStatus, ReferralTransitionError, UserId,
};

fn map_transition_error(error: ReferralTransitionError) -> Error {
    info!(from = %error.from, to = %error.to, "referral transition rejected");
    Error::conflict(error.to_string())
        .with_details(json!({ "from": error.from.as_str(), "to": error.to.as_str() }))
}

/// Referral service implementing [`Referrals`].
#[derive(Clone)]
pub struct ReferralService {
    referrals: Arc<dyn ReferralRepository>,
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
}

impl ReferralService {
    /// Create the service.
    pub fn new(
        referrals: Arc<dyn ReferralRepository>,
        users: Arc<dyn UserRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            referrals,
            users,
            clock,
        }
    }
}

#[async_trait]
impl Referrals for ReferralService {
    async fn create(&self, principal: Principal, draft: ReferralDraft) -> Result<Referral, Error> {
        if principal.is_admin() {
            return Err(Error::forbidden("only doctors and patients may refer"));
        }
        let referrer = self
            .users
            .find_by_id(principal.user_id)
            .await?
            .ok_or_else(|| Error::unauthorized("account no longer exists"))?;
        if referrer.email == draft.referee_email {
            return Err(ValidationError::new(
                "refereeEmail",
                "self_referral",
                "you cannot refer yourself",
            )
            .into());
        }
        if self
            .referrals
            .has_open(principal.user_id, &draft.referee_email)
            .await?
        {
            return Err(Error::conflict("you already have an open referral for this email"));
        }
        let referral = Referral::create(principal.user_id, draft, self.clock.utc());
        self.referrals.insert(&referral).await?;
        info!(referral_id = %referral.id, referrer_id = %referral.referrer_id, "referral created");
        Ok(referral)
    }

    async fn list_mine(
        &self,
        principal: Principal,
        page: PageRequest,
    ) -> Result<Page<Referral>, Error> {
        let filter = ReferralFilter {
            referrer_id: Some(principal.user_id),
            status: None,
        };
        Ok(self.referrals.list(filter, page).await?)
    }

    async fn list_all(
        &self,
        principal: Principal,
        status: Option<ReferralStatus>,
        page: PageRequest,
    ) -> Result<Page<Referral>, Error> {
        principal.require_admin()?;
        let filter = ReferralFilter {
            referrer_id: None,
            status,
        };
        Ok(self.referrals.list(filter, page).await?)
    }

    async fn update_status(
        &self,
        principal: Principal,
        id: ReferralId,
        status: ReferralStatus,
        notes: Option<String>,
    ) -> Result<Referral, Error> {
        principal.require_admin()?;
        let current = self
            .referrals
            .find(id)
            .await?
            .ok_or_else(|| Error::not_found("referral not found"))?;
        let notes = optional_text("notes", notes.as_deref(), NOTES_MAX)?;
        let next = current
            .move_to(status, notes, self.clock.utc())
            .map_err(map_transition_error)?;
        self.referrals.save(&next).await?;
        info!(
            referral_id = %id,
            from = %current.status,
            to = %next.status,
            "referral status changed"
        );
        Ok(next)
    }

    async fn mark_converted_for(
        &self,
        email: &EmailAddress,
        user_id: UserId,
    ) -> Result<usize, Error> {
        let now = self.clock.utc();
        let open = self.referrals.open_by_email(email).await?;
        let mut converted = 0;
        for referral in open {
            let next = referral.convert(user_id, now).map_err(map_transition_error)?;
            self.referrals.save(&next).await?;
            converted += 1;
        }
        if converted > 0 {
            info!(%user_id, converted, "referrals converted on sign-up");
        }
        Ok(converted)
    }
}
