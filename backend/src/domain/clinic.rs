//! Clinics group doctors under shared membership roles.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{ValidationError, bounded_text};
use super::{ClinicId, User, UserId};

/// Maximum clinic name length.
pub const NAME_MAX: usize = 120;

/// Role of a doctor inside a clinic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClinicRole {
    /// Regular member.
    Member,
    /// May manage members.
    Admin,
    /// Full control, including granting ownership.
    Owner,
}

impl ClinicRole {
    /// Every role.
    pub const ALL: [Self; 3] = [Self::Member, Self::Admin, Self::Owner];

    /// Storage and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Member => "MEMBER",
            Self::Admin => "ADMIN",
            Self::Owner => "OWNER",
        }
    }

    /// Whether the role may add and remove members.
    #[must_use]
    pub const fn manages_members(self) -> bool {
        matches!(self, Self::Admin | Self::Owner)
    }
}

impl fmt::Display for ClinicRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClinicRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ValidationError::new("role", "unknown_role", format!("unknown role {s}")))
    }
}

/// A clinic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clinic {
    /// Identifier.
    pub id: ClinicId,
    /// Display name.
    pub name: String,
    /// Founding doctor.
    pub created_by: UserId,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

impl Clinic {
    /// Validate and create a clinic.
    ///
    /// # Errors
    /// Returns a validation error for blank or overlong names.
    pub fn create(name: &str, created_by: UserId, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: ClinicId::random(),
            name: bounded_text("name", name, NAME_MAX)?,
            created_by,
            created_at: now,
        })
    }
}

/// A doctor's membership in a clinic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClinicMembership {
    /// Clinic.
    pub clinic_id: ClinicId,
    /// Member doctor.
    pub doctor_id: UserId,
    /// Role within the clinic.
    pub role: ClinicRole,
    /// Join instant.
    pub joined_at: DateTime<Utc>,
}

/// A membership together with the member's account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClinicMember {
    /// Membership record.
    pub membership: ClinicMembership,
    /// Member account.
    pub user: User,
}

/// Membership rule violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MembershipRuleError {
    /// The actor's role cannot manage members.
    #[error("only clinic owners and admins may manage members")]
    NotManager,
    /// Only owners may grant or revoke ownership or change roles.
    #[error("only clinic owners may change ownership or roles")]
    OwnerRequired,
    /// The clinic would be left without an owner.
    #[error("a clinic must keep at least one owner")]
    LastOwner,
}

/// Check that `actor` may add a member with `role`.
///
/// # Errors
/// Returns the violated rule.
pub const fn check_add(actor: ClinicRole, role: ClinicRole) -> Result<(), MembershipRuleError> {
    if !actor.manages_members() {
        return Err(MembershipRuleError::NotManager);
    }
    if matches!(role, ClinicRole::Owner) && !matches!(actor, ClinicRole::Owner) {
        return Err(MembershipRuleError::OwnerRequired);
    }
    Ok(())
}

/// Check that `actor` may change `target`'s role to `role` given the number
/// of owners in the clinic.
///
/// # Errors
/// Returns the violated rule.
pub const fn check_role_change(
    actor: ClinicRole,
    target: ClinicRole,
    role: ClinicRole,
    owner_count: usize,
) -> Result<(), MembershipRuleError> {
    if !matches!(actor, ClinicRole::Owner) {
        return Err(MembershipRuleError::OwnerRequired);
    }
    if matches!(target, ClinicRole::Owner) && !matches!(role, ClinicRole::Owner) && owner_count <= 1
    {
        return Err(MembershipRuleError::LastOwner);
    }
    Ok(())
}

/// Check that `actor` may remove `target`; `is_self` marks a member leaving.
///
/// # Errors
/// Returns the violated rule.
pub const fn check_removal(
    actor: ClinicRole,
    target: ClinicRole,
    is_self: bool,
    owner_count: usize,
) -> Result<(), MembershipRuleError> {
    if matches!(target, ClinicRole::Owner) && owner_count <= 1 {
        return Err(MembershipRuleError::LastOwner);
    }
    if is_self {
        return Ok(());
    }
    if !actor.manages_members() {
        return Err(MembershipRuleError::NotManager);
    }
    if matches!(target, ClinicRole::Owner) && !matches!(actor, ClinicRole::Owner) {
        return Err(MembershipRuleError::OwnerRequired);
    }
    Ok(())
}
