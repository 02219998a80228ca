//! Doctor–patient care links.

use chrono::{DateTime, Utc};

use super::{User, UserId};

/// A doctor's authorisation to care for a patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CareLink {
    /// Caring doctor.
    pub doctor_id: UserId,
    /// Cared-for patient.
    pub patient_id: UserId,
    /// Link instant.
    pub created_at: DateTime<Utc>,
}

/// The other side of a care link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedUser {
    /// Linked account.
    pub user: User,
    /// Link instant.
    pub linked_at: DateTime<Utc>,
}
