//! Driving port for clinics.

use async_trait::async_trait;

use crate::domain::{
    Clinic, ClinicId, ClinicMember, ClinicRole, EmailAddress, Error, Principal, UserId,
};

/// A clinic seen from one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClinicSummary {
    /// Clinic.
    pub clinic: Clinic,
    /// The member's role.
    pub role: ClinicRole,
}

/// Clinic use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Clinics: Send + Sync {
    /// Found a clinic owned by the caller.
    async fn create(&self, principal: Principal, name: String) -> Result<ClinicSummary, Error>;

    /// Clinics the caller belongs to.
    async fn list_mine(&self, principal: Principal) -> Result<Vec<ClinicSummary>, Error>;

    /// Members of a clinic the caller belongs to.
    async fn members(&self, principal: Principal, clinic_id: ClinicId)
    -> Result<Vec<ClinicMember>, Error>;

    /// Add the doctor registered under `email`.
    async fn add_member(
        &self,
        principal: Principal,
        clinic_id: ClinicId,
        email: EmailAddress,
        role: ClinicRole,
    ) -> Result<ClinicMember, Error>;

    /// Change a member's role.
    async fn change_role(
        &self,
        principal: Principal,
        clinic_id: ClinicId,
        doctor_id: UserId,
        role: ClinicRole,
    ) -> Result<ClinicMember, Error>;

    /// Remove a member, or leave when `doctor_id` is the caller.
    async fn remove_member(
        &self,
        principal: Principal,
        clinic_id: ClinicId,
        doctor_id: UserId,
    ) -> Result<(), Error>;
}
