//! OpenAPI schema definitions for domain types.
//!
//! Domain types stay framework-agnostic by not deriving `ToSchema`. The
//! wrappers here mirror their wire shape and are referenced from DTO fields
//! with `#[schema(value_type = ...)]`.

#![expect(
    dead_code,
    reason = "Schema wrappers are only read by utoipa during document generation"
)]

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    #[schema(rename = "unauthorized")]
    Unauthorized,
    #[schema(rename = "forbidden")]
    Forbidden,
    #[schema(rename = "not_found")]
    NotFound,
    #[schema(rename = "conflict")]
    Conflict,
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`].
///
/// API error response payload with machine-readable code and human-readable
/// message.
#[derive(ToSchema)]
#[schema(as = crate::domain::Error)]
#[serde(rename_all = "camelCase")]
pub struct ErrorSchema {
    /// Stable machine-readable error code.
    #[schema(example = "invalid_request")]
    code: ErrorCodeSchema,
    /// Human-readable message returned to clients.
    #[schema(example = "durationDays must be between 1 and 365")]
    message: String,
    /// Correlation identifier echoed in the `trace-id` header.
    #[schema(example = "0190c8d4-5a1e-7c3b-9d2f-4b6e8a1c3d5f")]
    trace_id: Option<String>,
    /// Supplementary details such as `{ field, code }`.
    details: Option<serde_json::Value>,
}

/// Documentation shape of the `{ data, nextCursor }` list envelope.
#[derive(ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedSchema<T: ToSchema> {
    /// Items on this page.
    data: Vec<T>,
    /// Opaque token for the next page; absent on the last page.
    next_cursor: Option<String>,
}

#[derive(ToSchema)]
#[schema(as = crate::domain::Role)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleSchema {
    Doctor,
    Patient,
    SuperAdmin,
}

#[derive(ToSchema)]
#[schema(as = crate::domain::TimeOfDay)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeOfDaySchema {
    Morning,
    Afternoon,
    Evening,
    Anytime,
}

#[derive(ToSchema)]
#[schema(as = crate::domain::TaskKind)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKindSchema {
    Action,
    Exercise,
    Nutrition,
    Medication,
    Education,
    Reflection,
}

/// A task a patient ticks off.
#[derive(ToSchema)]
#[schema(as = crate::domain::ProtocolTask)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolTaskSchema {
    /// Author-chosen identifier, unique within the protocol.
    #[schema(format = "uuid")]
    id: String,
    title: String,
    kind: TaskKindSchema,
    instructions: Option<String>,
}

#[derive(ToSchema)]
#[schema(as = crate::domain::ProtocolSession)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolSessionSchema {
    title: String,
    time_of_day: TimeOfDaySchema,
    tasks: Vec<ProtocolTaskSchema>,
}

/// One scheduled day. Days without an entry are rest days.
#[derive(ToSchema)]
#[schema(as = crate::domain::ProtocolDay)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolDaySchema {
    #[schema(minimum = 1, example = 1)]
    day_number: u16,
    title: Option<String>,
    sessions: Vec<ProtocolSessionSchema>,
}

#[derive(ToSchema)]
#[schema(as = crate::domain::PrescriptionStatus)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrescriptionStatusSchema {
    Prescribed,
    Active,
    Paused,
    Completed,
    Abandoned,
}

/// Expected answer shape, tagged by `type`.
#[derive(ToSchema)]
#[schema(as = crate::domain::QuestionKind)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionKindSchema {
    Scale {
        min: i32,
        max: i32,
    },
    YesNo,
    Text {
        #[serde(rename = "maxLength")]
        max_length: u16,
    },
}

/// An answer: boolean, integer rating or text depending on the question.
#[derive(ToSchema)]
#[schema(as = crate::domain::Answer)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSchema {
    #[schema(format = "uuid")]
    question_id: String,
    #[schema(value_type = Object, example = 7)]
    value: serde_json::Value,
}

#[derive(ToSchema)]
#[schema(as = crate::domain::Lesson)]
#[serde(rename_all = "camelCase")]
pub struct LessonSchema {
    #[schema(format = "uuid")]
    id: String,
    title: String,
    body: String,
    duration_minutes: u16,
}

#[derive(ToSchema)]
#[schema(as = crate::domain::CourseModule)]
#[serde(rename_all = "camelCase")]
pub struct CourseModuleSchema {
    #[schema(format = "uuid")]
    id: String,
    title: String,
    lessons: Vec<LessonSchema>,
}

#[derive(ToSchema)]
#[schema(as = crate::domain::ReferralStatus)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferralStatusSchema {
    Pending,
    Contacted,
    Converted,
    Declined,
    Expired,
}

#[derive(ToSchema)]
#[schema(as = crate::domain::Plan)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanSchema {
    Free,
    Professional,
    Clinic,
}

#[derive(ToSchema)]
#[schema(as = crate::domain::SubscriptionStatus)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatusSchema {
    Trialing,
    Active,
    PastDue,
    Canceled,
}

#[derive(ToSchema)]
#[schema(as = crate::domain::ClinicRole)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClinicRoleSchema {
    Member,
    Admin,
    Owner,
}
