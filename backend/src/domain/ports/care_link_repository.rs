//! Port for doctor–patient care links.

use async_trait::async_trait;

use crate::domain::{CareLink, LinkedUser, Page, PageRequest, UserId};

use super::RepositoryError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CareLinkRepository: Send + Sync {
    /// Store a link; [`RepositoryError::Conflict`] when it already exists.
    async fn insert(&self, link: &CareLink) -> Result<(), RepositoryError>;

    /// Remove a link, reporting whether one existed.
    async fn delete(&self, doctor_id: UserId, patient_id: UserId) -> Result<bool, RepositoryError>;

    /// Whether the pair is linked.
    async fn exists(&self, doctor_id: UserId, patient_id: UserId) -> Result<bool, RepositoryError>;

    /// Number of patients linked to a doctor.
    async fn count_patients(&self, doctor_id: UserId) -> Result<u64, RepositoryError>;

    /// Patients of a doctor, most recently linked first.
    async fn list_patients(
        &self,
        doctor_id: UserId,
        page: PageRequest,
    ) -> Result<Page<LinkedUser>, RepositoryError>;

    /// Every doctor caring for a patient.
    async fn list_doctors(&self, patient_id: UserId) -> Result<Vec<LinkedUser>, RepositoryError>;
}
