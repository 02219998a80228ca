//! Port for prescriptions and their task completions.

use async_trait::async_trait;

use crate::domain::{
    Page, PageRequest, Prescription, PrescriptionFilter, PrescriptionId, ProtocolId, TaskCompletion,
    TaskId, UserId,
};

use super::RepositoryError;

/// How many prescriptions reference a protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProtocolUsage {
    /// Prescriptions in any status.
    pub total: u64,
    /// Prescriptions that are active or paused.
    pub running: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrescriptionRepository: Send + Sync {
    /// Store a new prescription.
    async fn insert(&self, prescription: &Prescription) -> Result<(), RepositoryError>;

    /// Persist a status change.
    ///
    /// Returns [`RepositoryError::Conflict`] when the patient already runs
    /// the same protocol.
    async fn update(&self, prescription: &Prescription) -> Result<(), RepositoryError>;

    /// Fetch a prescription.
    async fn find(&self, id: PrescriptionId) -> Result<Option<Prescription>, RepositoryError>;

    /// Prescriptions matching `filter`, most recently prescribed first.
    async fn list(
        &self,
        filter: &PrescriptionFilter,
        page: PageRequest,
    ) -> Result<Page<Prescription>, RepositoryError>;

    /// Whether the patient has an active or paused run of the protocol.
    async fn has_running(
        &self,
        patient_id: UserId,
        protocol_id: ProtocolId,
    ) -> Result<bool, RepositoryError>;

    /// Whether the patient holds any prescription of the protocol.
    async fn patient_holds(
        &self,
        patient_id: UserId,
        protocol_id: ProtocolId,
    ) -> Result<bool, RepositoryError>;

    /// Reference counts for a protocol.
    async fn protocol_usage(&self, protocol_id: ProtocolId)
    -> Result<ProtocolUsage, RepositoryError>;

    /// Record a completion, keeping the first timestamp on repeats.
    async fn upsert_completion(&self, completion: &TaskCompletion) -> Result<(), RepositoryError>;

    /// Remove a completion if present.
    async fn delete_completion(
        &self,
        prescription_id: PrescriptionId,
        day_number: u16,
        task_id: TaskId,
    ) -> Result<(), RepositoryError>;

    /// Every completion of a prescription ordered by day.
    async fn completions(
        &self,
        prescription_id: PrescriptionId,
    ) -> Result<Vec<TaskCompletion>, RepositoryError>;
}
