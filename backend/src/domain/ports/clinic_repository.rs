//! Port for clinics and their memberships.

use async_trait::async_trait;

use crate::domain::{Clinic, ClinicId, ClinicMember, ClinicMembership, ClinicRole, UserId};

use super::RepositoryError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClinicRepository: Send + Sync {
    /// Store a clinic together with its founding membership.
    async fn create(&self, clinic: &Clinic, owner: &ClinicMembership)
    -> Result<(), RepositoryError>;

    /// Fetch a clinic.
    async fn find(&self, id: ClinicId) -> Result<Option<Clinic>, RepositoryError>;

    /// A doctor's membership in a clinic.
    async fn membership(
        &self,
        clinic_id: ClinicId,
        doctor_id: UserId,
    ) -> Result<Option<ClinicMembership>, RepositoryError>;

    /// Members with their accounts, earliest joiner first.
    async fn members(&self, clinic_id: ClinicId) -> Result<Vec<ClinicMember>, RepositoryError>;

    /// Add a member; [`RepositoryError::Conflict`] when already present.
    async fn add_member(&self, membership: &ClinicMembership) -> Result<(), RepositoryError>;

    /// Change a member's role.
    async fn update_role(
        &self,
        clinic_id: ClinicId,
        doctor_id: UserId,
        role: ClinicRole,
    ) -> Result<(), RepositoryError>;

    /// Remove a member, reporting whether one existed.
    async fn remove_member(
        &self,
        clinic_id: ClinicId,
        doctor_id: UserId,
    ) -> Result<bool, RepositoryError>;

    /// Number of owners in a clinic.
    async fn count_owners(&self, clinic_id: ClinicId) -> Result<u64, RepositoryError>;

    /// Clinics a doctor belongs to with the doctor's role in each.
    async fn clinics_for(&self, doctor_id: UserId)
    -> Result<Vec<(Clinic, ClinicRole)>, RepositoryError>;
}
