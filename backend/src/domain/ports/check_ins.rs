//! Driving port for check-in questions and answers.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{
    Answer, CheckIn, CheckInQuestion, Error, Principal, QuestionId, QuestionKind, UserId,
};

/// A doctor's new question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuestion {
    /// Target patient, `None` for every linked patient.
    pub patient_id: Option<UserId>,
    /// Question text.
    pub prompt: String,
    /// Expected answer shape.
    pub kind: QuestionKind,
}

/// Bounds and subject of a history read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Patient whose history is read; defaults to the calling patient.
    pub patient_id: Option<UserId>,
    /// Earliest date, inclusive.
    pub from: Option<NaiveDate>,
    /// Latest date, inclusive.
    pub to: Option<NaiveDate>,
}

/// Check-in use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CheckIns: Send + Sync {
    /// Ask a new question.
    async fn create_question(
        &self,
        principal: Principal,
        question: NewQuestion,
    ) -> Result<CheckInQuestion, Error>;

    /// Stop asking a question.
    async fn deactivate_question(&self, principal: Principal, id: QuestionId)
    -> Result<(), Error>;

    /// The calling doctor's questions, optionally for one patient.
    async fn list_questions(
        &self,
        principal: Principal,
        patient_id: Option<UserId>,
    ) -> Result<Vec<CheckInQuestion>, Error>;

    /// Questions the calling patient should answer.
    async fn questions_for_me(&self, principal: Principal) -> Result<Vec<CheckInQuestion>, Error>;

    /// Submit or replace the answers for a date, today by default.
    async fn submit(
        &self,
        principal: Principal,
        date: Option<NaiveDate>,
        answers: Vec<Answer>,
    ) -> Result<CheckIn, Error>;

    /// Past check-ins, newest first.
    async fn history(&self, principal: Principal, query: HistoryQuery)
    -> Result<Vec<CheckIn>, Error>;
}
