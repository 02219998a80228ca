//! Referrals: growth leads raised by doctors and patients.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{ValidationError, bounded_text, optional_text};
use super::{EmailAddress, ReferralId, Role, UserId};

/// Maximum referee name length.
pub const NAME_MAX: usize = 120;
/// Maximum phone number length.
pub const PHONE_MAX: usize = 32;
/// Maximum notes length.
pub const NOTES_MAX: usize = 2000;

/// Where a referral stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferralStatus {
    /// Recorded, nobody has reached out yet.
    Pending,
    /// The growth team has been in touch.
    Contacted,
    /// The referee signed up.
    Converted,
    /// The referee said no.
    Declined,
    /// The lead went stale.
    Expired,
}

impl ReferralStatus {
    /// Every status in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Contacted,
        Self::Converted,
        Self::Declined,
        Self::Expired,
    ];

    /// Storage and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Contacted => "CONTACTED",
            Self::Converted => "CONVERTED",
            Self::Declined => "DECLINED",
            Self::Expired => "EXPIRED",
        }
    }

    /// Whether the referral is still being worked.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Contacted)
    }

    /// Whether the lifecycle allows moving to `to`.
    #[must_use]
    pub const fn can_move_to(self, to: Self) -> bool {
        match self {
            Self::Pending => !matches!(to, Self::Pending),
            Self::Contacted => matches!(to, Self::Converted | Self::Declined | Self::Expired),
            Self::Converted | Self::Declined | Self::Expired => false,
        }
    }
}

impl fmt::Display for ReferralStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferralStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                ValidationError::new("status", "unknown_status", format!("unknown status {s}"))
            })
    }
}

/// Raw referral details supplied by the referrer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralDraft {
    /// Role the referee would sign up as.
    pub target_role: Role,
    /// Referee's name.
    pub referee_name: String,
    /// Referee's address.
    pub referee_email: EmailAddress,
    /// Optional phone number.
    pub referee_phone: Option<String>,
    /// Optional context.
    pub notes: Option<String>,
}

impl ReferralDraft {
    /// Validate raw input.
    ///
    /// # Errors
    /// Returns a validation error for the first invalid field; only doctors
    /// and patients can be referred.
    pub fn new(
        target_role: Role,
        referee_name: &str,
        referee_email: &str,
        referee_phone: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Self, ValidationError> {
        if target_role == Role::SuperAdmin {
            return Err(ValidationError::new(
                "targetRole",
                "unsupported_role",
                "referrals may only target doctors or patients",
            ));
        }
        Ok(Self {
            target_role,
            referee_name: bounded_text("refereeName", referee_name, NAME_MAX)?,
            referee_email: EmailAddress::parse(referee_email).map_err(|_| {
                ValidationError::new(
                    "refereeEmail",
                    "malformed",
                    "refereeEmail must be a valid address",
                )
            })?,
            referee_phone: optional_text("refereePhone", referee_phone, PHONE_MAX)?,
            notes: optional_text("notes", notes, NOTES_MAX)?,
        })
    }
}

/// A stored referral.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Referral {
    /// Identifier.
    pub id: ReferralId,
    /// Referring account.
    pub referrer_id: UserId,
    /// Referee details.
    pub draft: ReferralDraft,
    /// Lifecycle status.
    pub status: ReferralStatus,
    /// Account created by the referee, once converted.
    pub converted_user_id: Option<UserId>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last change instant.
    pub updated_at: DateTime<Utc>,
}

/// Filter applied when listing referrals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReferralFilter {
    /// Restrict to one referrer.
    pub referrer_id: Option<UserId>,
    /// Restrict to a status.
    pub status: Option<ReferralStatus>,
}

/// Rejected referral status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move referral from {from} to {to}")]
pub struct ReferralTransitionError {
    /// Current status.
    pub from: ReferralStatus,
    /// Requested status.
    pub to: ReferralStatus,
}

impl Referral {
    /// Record a new pending referral.
    #[must_use]
    pub fn create(referrer_id: UserId, draft: ReferralDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: ReferralId::random(),
            referrer_id,
            draft,
            status: ReferralStatus::Pending,
            converted_user_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `to`, optionally replacing the notes.
    ///
    /// # Errors
    /// Returns [`ReferralTransitionError`] for moves the lifecycle forbids.
    pub fn move_to(
        &self,
        to: ReferralStatus,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, ReferralTransitionError> {
        if !self.status.can_move_to(to) {
            return Err(ReferralTransitionError {
                from: self.status,
                to,
            });
        }
        let mut next = self.clone();
        next.status = to;
        if notes.is_some() {
            next.draft.notes = notes;
        }
        next.updated_at = now;
        Ok(next)
    }

    /// Mark converted by the account `user_id`.
    ///
    /// # Errors
    /// Returns [`ReferralTransitionError`] when the referral is closed.
    pub fn convert(&self, user_id: UserId, now: DateTime<Utc>) -> Result<Self, ReferralTransitionError> {
        let mut next = self.move_to(ReferralStatus::Converted, None, now)?;
        next.converted_user_id = Some(user_id);
        Ok(next)
    }
}
