//! Doctor subscriptions and the patient-capacity entitlement.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;
use super::validation::ValidationError;

/// Length of the first paid trial.
pub const TRIAL_DAYS: i64 = 14;
/// Length of a paid billing period.
pub const PERIOD_DAYS: i64 = 30;

/// Subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Plan {
    /// Default tier.
    Free,
    /// Individual practice tier.
    Professional,
    /// Multi-doctor tier without a patient cap.
    Clinic,
}

impl Plan {
    /// Every plan.
    pub const ALL: [Self; 3] = [Self::Free, Self::Professional, Self::Clinic];

    /// Storage and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Professional => "PROFESSIONAL",
            Self::Clinic => "CLINIC",
        }
    }

    /// Maximum linked patients, `None` for unlimited.
    #[must_use]
    pub const fn patient_limit(self) -> Option<u32> {
        match self {
            Self::Free => Some(5),
            Self::Professional => Some(100),
            Self::Clinic => None,
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|plan| plan.as_str() == s)
            .ok_or_else(|| ValidationError::new("plan", "unknown_plan", format!("unknown plan {s}")))
    }
}

/// Billing state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    /// Trial period of a paid plan.
    Trialing,
    /// Paid and current.
    Active,
    /// Payment overdue.
    PastDue,
    /// Cancelled; paid features last until the period ends.
    Canceled,
}

impl SubscriptionStatus {
    /// Every status.
    pub const ALL: [Self; 4] = [Self::Trialing, Self::Active, Self::PastDue, Self::Canceled];

    /// Storage and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trialing => "TRIALING",
            Self::Active => "ACTIVE",
            Self::PastDue => "PAST_DUE",
            Self::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
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

/// A doctor's subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Subscribed doctor.
    pub doctor_id: UserId,
    /// Chosen plan.
    pub plan: Plan,
    /// Billing state.
    pub status: SubscriptionStatus,
    /// Last day of the current period.
    pub current_period_end: NaiveDate,
    /// Whether the subscription lapses at period end.
    pub cancel_at_period_end: bool,
    /// Whether a trial has ever been granted.
    pub trial_used: bool,
    /// Last change instant.
    pub updated_at: DateTime<Utc>,
}

/// Rejected subscription change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionChangeError {
    /// The requested plan is already in effect.
    #[error("plan {0} is already in effect")]
    SamePlan(Plan),
    /// The free plan has nothing to cancel.
    #[error("the free plan cannot be cancelled")]
    CancelFree,
    /// Cancellation was already requested.
    #[error("cancellation is already scheduled")]
    AlreadyCancelling,
}

impl Subscription {
    /// Implicit subscription of a doctor without a stored record.
    #[must_use]
    pub fn free(doctor_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            doctor_id,
            plan: Plan::Free,
            status: SubscriptionStatus::Active,
            current_period_end: now.date_naive(),
            cancel_at_period_end: false,
            trial_used: false,
            updated_at: now,
        }
    }

    /// Plan whose entitlements apply on `today`.
    ///
    /// Trialing and active subscriptions get their plan, unless a pending
    /// cancellation has passed its period end. Cancelled and past due
    /// subscriptions keep the plan until the period ends. Anything else
    /// falls back to the free plan.
    #[must_use]
    pub fn effective_plan(&self, today: NaiveDate) -> Plan {
        match self.status {
            SubscriptionStatus::Trialing | SubscriptionStatus::Active
                if !(self.cancel_at_period_end && today > self.current_period_end) =>
            {
                self.plan
            }
            SubscriptionStatus::PastDue | SubscriptionStatus::Canceled
                if today <= self.current_period_end =>
            {
                self.plan
            }
            _ => Plan::Free,
        }
    }

    /// Switch to `plan` as of `now`.
    ///
    /// The first move onto a paid plan starts a trial; later moves start a
    /// fresh paid period. Moving to the free plan takes effect immediately.
    ///
    /// # Errors
    /// Returns [`SubscriptionChangeError::SamePlan`] when `plan` is already
    /// in effect and no cancellation is pending.
    pub fn change_plan(&self, plan: Plan, now: DateTime<Utc>) -> Result<Self, SubscriptionChangeError> {
        let today = now.date_naive();
        if self.effective_plan(today) == plan && !self.cancel_at_period_end {
            return Err(SubscriptionChangeError::SamePlan(plan));
        }
        let mut next = self.clone();
        next.plan = plan;
        next.cancel_at_period_end = false;
        next.updated_at = now;
        if plan == Plan::Free {
            next.status = SubscriptionStatus::Active;
            next.current_period_end = today;
        } else if self.trial_used {
            next.status = SubscriptionStatus::Active;
            next.current_period_end = today + Duration::days(PERIOD_DAYS);
        } else {
            next.status = SubscriptionStatus::Trialing;
            next.trial_used = true;
            next.current_period_end = today + Duration::days(TRIAL_DAYS);
        }
        Ok(next)
    }

    /// Schedule cancellation at period end.
    ///
    /// # Errors
    /// Returns an error for free plans and repeated cancellations.
    pub fn cancel(&self, now: DateTime<Utc>) -> Result<Self, SubscriptionChangeError> {
        if self.effective_plan(now.date_naive()) == Plan::Free {
            return Err(SubscriptionChangeError::CancelFree);
        }
        if self.cancel_at_period_end {
            return Err(SubscriptionChangeError::AlreadyCancelling);
        }
        let mut next = self.clone();
        next.cancel_at_period_end = true;
        next.updated_at = now;
        Ok(next)
    }

    /// Override the billing status.
    #[must_use]
    pub fn with_status(&self, status: SubscriptionStatus, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.status = status;
        next.updated_at = now;
        next
    }
}
