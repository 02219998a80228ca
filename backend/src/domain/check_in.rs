//! Daily check-ins answered against doctor-defined questions.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{ValidationError, bounded_text};
use super::{CheckInId, QuestionId, UserId};

/// Maximum prompt length.
pub const PROMPT_MAX: usize = 300;
/// Upper bound for free-text answer limits.
pub const TEXT_ANSWER_MAX: u16 = 2000;

/// Expected answer shape of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionKind {
    /// Integer rating within an inclusive range.
    Scale {
        /// Lowest accepted value.
        min: i32,
        /// Highest accepted value.
        max: i32,
    },
    /// Boolean answer.
    YesNo,
    /// Free text up to `max_length` characters.
    Text {
        /// Maximum answer length.
        #[serde(rename = "maxLength")]
        max_length: u16,
    },
}

impl QuestionKind {
    /// Check the kind's own parameters.
    ///
    /// # Errors
    /// Returns a `kind` validation error for inverted scales or out of range
    /// text limits.
    pub fn validate(self) -> Result<Self, ValidationError> {
        match self {
            Self::Scale { min, max } if min >= max => Err(ValidationError::new(
                "kind",
                "invalid_scale",
                "scale minimum must be below its maximum",
            )),
            Self::Text { max_length } if max_length == 0 || max_length > TEXT_ANSWER_MAX => {
                Err(ValidationError::new(
                    "kind",
                    "invalid_text_limit",
                    format!("maxLength must be between 1 and {TEXT_ANSWER_MAX}"),
                ))
            }
            other => Ok(other),
        }
    }

    /// Check an answer against this kind.
    #[must_use]
    pub fn accepts(self, value: &AnswerValue) -> bool {
        match (self, value) {
            (Self::Scale { min, max }, AnswerValue::Number(n)) => (min..=max).contains(n),
            (Self::YesNo, AnswerValue::Bool(_)) => true,
            (Self::Text { max_length }, AnswerValue::Text(text)) => {
                let length = text.trim().chars().count();
                length > 0 && length <= usize::from(max_length)
            }
            _ => false,
        }
    }
}

/// A question a doctor asks in daily check-ins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInQuestion {
    /// Identifier.
    pub id: QuestionId,
    /// Authoring doctor.
    pub doctor_id: UserId,
    /// Targeted patient; `None` asks every linked patient.
    pub patient_id: Option<UserId>,
    /// Question text.
    pub prompt: String,
    /// Answer shape.
    pub kind: QuestionKind,
    /// Inactive questions are no longer asked.
    pub active: bool,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

impl CheckInQuestion {
    /// Validate a new question.
    ///
    /// # Errors
    /// Returns a validation error for a blank prompt or invalid kind.
    pub fn new(
        doctor_id: UserId,
        patient_id: Option<UserId>,
        prompt: &str,
        kind: QuestionKind,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: QuestionId::random(),
            doctor_id,
            patient_id,
            prompt: bounded_text("prompt", prompt, PROMPT_MAX)?,
            kind: kind.validate()?,
            active: true,
            created_at: now,
        })
    }

    /// Whether `patient_id` should answer this question.
    #[must_use]
    pub fn applies_to(&self, patient_id: UserId) -> bool {
        self.active && self.patient_id.is_none_or(|target| target == patient_id)
    }
}

/// An answer value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    /// Yes/no answer.
    Bool(bool),
    /// Scale rating.
    Number(i32),
    /// Free text.
    Text(String),
}

/// One answer inside a check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    /// Question being answered.
    pub question_id: QuestionId,
    /// Answer value.
    pub value: AnswerValue,
}

/// A patient's answers for one date.
///
/// ## Invariants
/// - At most one check-in per patient per date.
/// - Each question appears at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckIn {
    /// Identifier.
    pub id: CheckInId,
    /// Answering patient.
    pub patient_id: UserId,
    /// Date the answers refer to.
    pub date: NaiveDate,
    /// Answers.
    pub answers: Vec<Answer>,
    /// Last submission instant.
    pub submitted_at: DateTime<Utc>,
}

/// Validate `answers` against the questions that apply to the patient.
///
/// # Errors
/// Returns an `answers` validation error for empty submissions, duplicate or
/// unknown questions and values that do not match the question kind.
pub fn validate_answers(
    answers: Vec<Answer>,
    questions: &[CheckInQuestion],
) -> Result<Vec<Answer>, ValidationError> {
    if answers.is_empty() {
        return Err(ValidationError::new(
            "answers",
            "empty",
            "a check-in needs at least one answer",
        ));
    }
    let mut seen = HashSet::new();
    let mut normalised = Vec::with_capacity(answers.len());
    for answer in answers {
        if !seen.insert(answer.question_id) {
            return Err(ValidationError::new(
                "answers",
                "duplicate_question",
                format!("question {} answered more than once", answer.question_id),
            ));
        }
        let question = questions
            .iter()
            .find(|question| question.id == answer.question_id)
            .ok_or_else(|| {
                ValidationError::new(
                    "answers",
                    "unknown_question",
                    format!("question {} is not asked of this patient", answer.question_id),
                )
            })?;
        if !question.kind.accepts(&answer.value) {
            return Err(ValidationError::new(
                "answers",
                "invalid_answer",
                format!("answer to question {} does not match its kind", answer.question_id),
            ));
        }
        let value = match answer.value {
            AnswerValue::Text(text) => AnswerValue::Text(text.trim().to_owned()),
            other => other,
        };
        normalised.push(Answer {
            question_id: answer.question_id,
            value,
        });
    }
    Ok(normalised)
}
