//! Driving port for managing care links.

use async_trait::async_trait;

use crate::domain::{EmailAddress, Error, LinkedUser, Page, PageRequest, Principal, UserId};

/// Care team use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CareTeam: Send + Sync {
    /// Link the calling doctor to the patient registered under `email`.
    async fn link_patient(
        &self,
        principal: Principal,
        email: EmailAddress,
    ) -> Result<LinkedUser, Error>;

    /// Remove the link between the calling doctor and a patient.
    async fn unlink_patient(&self, principal: Principal, patient_id: UserId) -> Result<(), Error>;

    /// Patients of the calling doctor.
    async fn list_patients(
        &self,
        principal: Principal,
        page: PageRequest,
    ) -> Result<Page<LinkedUser>, Error>;

    /// Doctors of the calling patient.
    async fn list_doctors(&self, principal: Principal) -> Result<Vec<LinkedUser>, Error>;
}
