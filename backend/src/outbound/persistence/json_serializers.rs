//! JSONB encoding for protocol plans, course outlines, question kinds and
//! check-in answers.
//!
//! Encoders serialise the domain structure directly. Decoders run the stored
//! document back through the domain constructors so a hand-edited row fails
//! loudly instead of producing an aggregate that breaks its invariants.

use serde_json::Value;

use crate::domain::ports::RepositoryError;
use crate::domain::{
    Answer, CourseModule, CourseOutline, ProtocolDay, ProtocolPlan, QuestionKind,
};

use super::diesel_helpers::corrupt_row;

fn encode<T: serde::Serialize + ?Sized>(what: &str, value: &T) -> Result<Value, RepositoryError> {
    serde_json::to_value(value)
        .map_err(|err| RepositoryError::query(format!("serialise {what}: {err}")))
}

pub(super) fn plan_to_json(plan: &ProtocolPlan) -> Result<Value, RepositoryError> {
    encode("protocol plan", plan.days())
}

pub(super) fn json_to_plan(value: Value, duration_days: u16) -> Result<ProtocolPlan, RepositoryError> {
    let days: Vec<ProtocolDay> =
        serde_json::from_value(value).map_err(|err| corrupt_row("protocol plan", err))?;
    ProtocolPlan::new(days, duration_days).map_err(|err| corrupt_row("protocol plan", err))
}

pub(super) fn outline_to_json(outline: &CourseOutline) -> Result<Value, RepositoryError> {
    encode("course outline", outline.modules())
}

pub(super) fn json_to_outline(value: Value) -> Result<CourseOutline, RepositoryError> {
    let modules: Vec<CourseModule> =
        serde_json::from_value(value).map_err(|err| corrupt_row("course outline", err))?;
    CourseOutline::new(modules).map_err(|err| corrupt_row("course outline", err))
}

pub(super) fn kind_to_json(kind: QuestionKind) -> Result<Value, RepositoryError> {
    encode("question kind", &kind)
}

pub(super) fn json_to_kind(value: Value) -> Result<QuestionKind, RepositoryError> {
    let kind: QuestionKind =
        serde_json::from_value(value).map_err(|err| corrupt_row("question kind", err))?;
    kind.validate().map_err(|err| corrupt_row("question kind", err))
}

pub(super) fn answers_to_json(answers: &[Answer]) -> Result<Value, RepositoryError> {
    encode("check-in answers", answers)
}

pub(super) fn json_to_answers(value: Value) -> Result<Vec<Answer>, RepositoryError> {
    serde_json::from_value(value).map_err(|err| corrupt_row("check-in answers", err))
}
