//! Port for check-in questions and submissions.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{CheckIn, CheckInQuestion, QuestionId, UserId};

use super::RepositoryError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CheckInRepository: Send + Sync {
    /// Store a new question.
    async fn insert_question(&self, question: &CheckInQuestion) -> Result<(), RepositoryError>;

    /// Fetch a question.
    async fn find_question(&self, id: QuestionId)
    -> Result<Option<CheckInQuestion>, RepositoryError>;

    /// Persist changes to a question.
    async fn save_question(&self, question: &CheckInQuestion) -> Result<(), RepositoryError>;

    /// Questions authored by a doctor, oldest first. With `patient_id`, only
    /// questions addressed to everyone or to that patient.
    async fn questions_by_doctor(
        &self,
        doctor_id: UserId,
        patient_id: Option<UserId>,
    ) -> Result<Vec<CheckInQuestion>, RepositoryError>;

    /// Active questions from any of `doctor_ids` that apply to the patient.
    async fn active_questions_for(
        &self,
        doctor_ids: &[UserId],
        patient_id: UserId,
    ) -> Result<Vec<CheckInQuestion>, RepositoryError>;

    /// Insert the check-in or replace the answers of the same date.
    ///
    /// Returns the stored record, which keeps the original id on replace.
    async fn upsert_check_in(&self, check_in: &CheckIn) -> Result<CheckIn, RepositoryError>;

    /// A patient's check-ins within the optional bounds, newest date first.
    async fn check_ins(
        &self,
        patient_id: UserId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<CheckIn>, RepositoryError>;
}
