//! Prescription handlers: lifecycle, completions and progress.
//!
//! ```text
//! POST /api/v1/prescriptions
//! GET  /api/v1/prescriptions?patientId=…&status=ACTIVE
//! GET  /api/v1/prescriptions/{id}
//! POST /api/v1/prescriptions/{id}/transitions {"status":"ACTIVE"}
//! GET  /api/v1/prescriptions/{id}/progress
//! GET  /api/v1/prescriptions/{id}/today
//! GET  /api/v1/prescriptions/{id}/completions
//! PUT  /api/v1/prescriptions/{id}/completions {"dayNumber":1,"taskId":"…","completed":true}
//! ```

use actix_web::{HttpResponse, get, post, put, web};
use chrono::{DateTime, NaiveDate, Utc};
use pagination::{PageParams, Paginated};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{
    CompletionUpdate, PrescribeRequest, PrescriptionQuery, TodayPlan, TodaySession, TodayTask,
};
use crate::domain::{
    DayProgress, Error, Prescription, PrescriptionId, PrescriptionProgress, TaskCompletion,
    TaskKind, TimeOfDay,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::pagination::{page_request, paginated};
use crate::inbound::http::schemas::{
    ErrorSchema, PaginatedSchema, PrescriptionStatusSchema, TaskKindSchema, TimeOfDaySchema,
};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, parse_enum, parse_id, parse_optional_enum, required,
};

/// Request body for prescribing a protocol.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrescribeRequestBody {
    #[schema(format = "uuid")]
    pub protocol_id: Option<String>,
    #[schema(format = "uuid")]
    pub patient_id: Option<String>,
    pub notes: Option<String>,
}

impl TryFrom<PrescribeRequestBody> for PrescribeRequest {
    type Error = Error;

    fn try_from(value: PrescribeRequestBody) -> Result<Self, Self::Error> {
        let protocol_field = FieldName::new("protocolId");
        let patient_field = FieldName::new("patientId");
        let protocol_id = required(value.protocol_id, protocol_field)?;
        let patient_id = required(value.patient_id, patient_field)?;
        Ok(Self {
            protocol_id: parse_id(&protocol_id, protocol_field)?,
            patient_id: parse_id(&patient_id, patient_field)?,
            notes: value
                .notes
                .map(|notes| notes.trim().to_owned())
                .filter(|notes| !notes.is_empty()),
        })
    }
}

/// Filters for the prescription listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct PrescriptionFilterQuery {
    /// Restrict to one patient.
    pub patient_id: Option<String>,
    /// Restrict to one status.
    pub status: Option<String>,
}

impl TryFrom<&PrescriptionFilterQuery> for PrescriptionQuery {
    type Error = Error;

    fn try_from(value: &PrescriptionFilterQuery) -> Result<Self, Self::Error> {
        let patient_field = FieldName::new("patientId");
        Ok(Self {
            patient_id: value
                .patient_id
                .as_deref()
                .map(|raw| parse_id(raw, patient_field))
                .transpose()?,
            status: parse_optional_enum(value.status.as_deref(), FieldName::new("status"))?,
        })
    }
}

/// A prescription as returned by every endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionResponse {
    #[schema(format = "uuid")]
    pub id: String,
    #[schema(format = "uuid")]
    pub protocol_id: String,
    #[schema(format = "uuid")]
    pub doctor_id: String,
    #[schema(format = "uuid")]
    pub patient_id: String,
    #[schema(value_type = PrescriptionStatusSchema)]
    pub status: String,
    pub notes: Option<String>,
    pub prescribed_at: DateTime<Utc>,
    pub start_date: Option<NaiveDate>,
    pub paused_on: Option<NaiveDate>,
    pub paused_days: u32,
    pub ended_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<Prescription> for PrescriptionResponse {
    fn from(value: Prescription) -> Self {
        Self {
            id: value.id.to_string(),
            protocol_id: value.protocol_id.to_string(),
            doctor_id: value.doctor_id.to_string(),
            patient_id: value.patient_id.to_string(),
            status: value.status.as_str().to_owned(),
            notes: value.notes,
            prescribed_at: value.prescribed_at,
            start_date: value.start_date,
            paused_on: value.paused_on,
            paused_days: value.paused_days,
            ended_at: value.ended_at,
            updated_at: value.updated_at,
        }
    }
}

/// Requested lifecycle move.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    #[schema(value_type = PrescriptionStatusSchema)]
    pub status: String,
}

/// Scheduled and completed task counts for one day.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayProgressResponse {
    pub day_number: u16,
    pub scheduled: usize,
    pub completed: usize,
}

impl From<DayProgress> for DayProgressResponse {
    fn from(value: DayProgress) -> Self {
        Self {
            day_number: value.day_number,
            scheduled: value.scheduled,
            completed: value.completed,
        }
    }
}

/// Adherence and streak metrics.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    /// Current one-based day, `0` before activation.
    pub current_day: u16,
    pub duration_days: u16,
    pub days_remaining: u16,
    pub overdue: bool,
    pub expected_tasks: usize,
    pub completed_tasks: usize,
    #[schema(minimum = 0, maximum = 100)]
    pub adherence_percent: u8,
    pub current_streak: u16,
    pub longest_streak: u16,
    pub days: Vec<DayProgressResponse>,
}

impl From<PrescriptionProgress> for ProgressResponse {
    fn from(value: PrescriptionProgress) -> Self {
        Self {
            current_day: value.current_day,
            duration_days: value.duration_days,
            days_remaining: value.days_remaining,
            overdue: value.overdue,
            expected_tasks: value.expected_tasks,
            completed_tasks: value.completed_tasks,
            adherence_percent: value.adherence_percent,
            current_streak: value.current_streak,
            longest_streak: value.longest_streak,
            days: value.days.into_iter().map(Into::into).collect(),
        }
    }
}

/// A task on today's plan.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodayTaskResponse {
    #[schema(format = "uuid")]
    pub id: String,
    pub title: String,
    #[schema(value_type = TaskKindSchema)]
    pub kind: TaskKind,
    pub instructions: Option<String>,
    pub completed: bool,
}

impl From<TodayTask> for TodayTaskResponse {
    fn from(value: TodayTask) -> Self {
        Self {
            id: value.task.id.to_string(),
            title: value.task.title,
            kind: value.task.kind,
            instructions: value.task.instructions,
            completed: value.completed,
        }
    }
}

/// A session on today's plan.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodaySessionResponse {
    pub title: String,
    #[schema(value_type = TimeOfDaySchema)]
    pub time_of_day: TimeOfDay,
    pub tasks: Vec<TodayTaskResponse>,
}

impl From<TodaySession> for TodaySessionResponse {
    fn from(value: TodaySession) -> Self {
        Self {
            title: value.title,
            time_of_day: value.time_of_day,
            tasks: value.tasks.into_iter().map(Into::into).collect(),
        }
    }
}

/// What the patient should do today.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodayResponse {
    #[schema(format = "uuid")]
    pub prescription_id: String,
    /// Current day, `0` before activation.
    pub day_number: u16,
    pub title: Option<String>,
    pub rest_day: bool,
    pub sessions: Vec<TodaySessionResponse>,
}

impl From<TodayPlan> for TodayResponse {
    fn from(value: TodayPlan) -> Self {
        let rest_day = value.is_rest_day();
        Self {
            prescription_id: value.prescription_id.to_string(),
            day_number: value.day_number,
            title: value.title,
            rest_day,
            sessions: value.sessions.into_iter().map(Into::into).collect(),
        }
    }
}

/// A ticked-off task.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    pub day_number: u16,
    #[schema(format = "uuid")]
    pub task_id: String,
    pub completed_at: DateTime<Utc>,
}

impl From<TaskCompletion> for CompletionResponse {
    fn from(value: TaskCompletion) -> Self {
        Self {
            day_number: value.day_number,
            task_id: value.task_id.to_string(),
            completed_at: value.completed_at,
        }
    }
}

/// Tick a task on or off.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    #[schema(minimum = 1)]
    pub day_number: Option<u16>,
    #[schema(format = "uuid")]
    pub task_id: Option<String>,
    /// `true` records the completion, `false` clears it.
    pub completed: Option<bool>,
}

impl TryFrom<CompletionRequest> for CompletionUpdate {
    type Error = Error;

    fn try_from(value: CompletionRequest) -> Result<Self, Self::Error> {
        let task_field = FieldName::new("taskId");
        let task_id = required(value.task_id, task_field)?;
        Ok(Self {
            day_number: required(value.day_number, FieldName::new("dayNumber"))?,
            task_id: parse_id(&task_id, task_field)?,
            completed: required(value.completed, FieldName::new("completed"))?,
        })
    }
}

fn prescription_id(raw: &str) -> Result<PrescriptionId, Error> {
    parse_id(raw, FieldName::new("id"))
}

/// Prescribe a protocol to a linked patient.
#[utoipa::path(
    post,
    path = "/api/v1/prescriptions",
    request_body = PrescribeRequestBody,
    responses(
        (status = 201, description = "Prescription created", body = PrescriptionResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not the author or patient not linked", body = ErrorSchema),
        (status = 404, description = "Protocol not found", body = ErrorSchema)
    ),
    tags = ["prescriptions"],
    operation_id = "prescribe"
)]
#[post("/prescriptions")]
pub async fn prescribe(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<PrescribeRequestBody>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_principal()?;
    let request = PrescribeRequest::try_from(payload.into_inner())?;
    let prescription = state.prescriptions.prescribe(principal, request).await?;
    Ok(HttpResponse::Created().json(PrescriptionResponse::from(prescription)))
}

/// Prescriptions visible to the caller, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/prescriptions",
    params(
        PrescriptionFilterQuery,
        ("cursor" = Option<String>, Query, description = "Opaque cursor from a previous page"),
        ("limit" = Option<usize>, Query, description = "Page size, 1 to 100")
    ),
    responses(
        (status = 200, description = "Prescriptions", body = PaginatedSchema<PrescriptionResponse>),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["prescriptions"],
    operation_id = "listPrescriptions"
)]
#[get("/prescriptions")]
pub async fn list_prescriptions(
    state: web::Data<HttpState>,
    session: SessionContext,
    filter: web::Query<PrescriptionFilterQuery>,
    page: web::Query<PageParams>,
) -> ApiResult<web::Json<Paginated<PrescriptionResponse>>> {
    let principal = session.require_principal()?;
    let query = PrescriptionQuery::try_from(&*filter)?;
    let page = state
        .prescriptions
        .list(principal, query, page_request(&page)?)
        .await?;
    Ok(web::Json(paginated(page, PrescriptionResponse::from)?))
}

/// Read one prescription.
#[utoipa::path(
    get,
    path = "/api/v1/prescriptions/{id}",
    params(("id" = String, Path, description = "Prescription identifier")),
    responses(
        (status = 200, description = "Prescription", body = PrescriptionResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["prescriptions"],
    operation_id = "getPrescription"
)]
#[get("/prescriptions/{id}")]
pub async fn get_prescription(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<PrescriptionResponse>> {
    let principal = session.require_principal()?;
    let prescription = state
        .prescriptions
        .get(principal, prescription_id(&path)?)
        .await?;
    Ok(web::Json(prescription.into()))
}

/// Move a prescription through its lifecycle.
///
/// Moves outside the lifecycle are conflicts carrying `{ from, to }`.
#[utoipa::path(
    post,
    path = "/api/v1/prescriptions/{id}/transitions",
    params(("id" = String, Path, description = "Prescription identifier")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Prescription moved", body = PrescriptionResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Transition not allowed", body = ErrorSchema)
    ),
    tags = ["prescriptions"],
    operation_id = "transitionPrescription"
)]
#[post("/prescriptions/{id}/transitions")]
pub async fn transition_prescription(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<TransitionRequest>,
) -> ApiResult<web::Json<PrescriptionResponse>> {
    let principal = session.require_principal()?;
    let id = prescription_id(&path)?;
    let to = parse_enum(&payload.status, FieldName::new("status"))?;
    let prescription = state.prescriptions.transition(principal, id, to).await?;
    Ok(web::Json(prescription.into()))
}

/// Adherence and streak metrics.
#[utoipa::path(
    get,
    path = "/api/v1/prescriptions/{id}/progress",
    params(("id" = String, Path, description = "Prescription identifier")),
    responses(
        (status = 200, description = "Progress", body = ProgressResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["prescriptions"],
    operation_id = "prescriptionProgress"
)]
#[get("/prescriptions/{id}/progress")]
pub async fn prescription_progress(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ProgressResponse>> {
    let principal = session.require_principal()?;
    let progress = state
        .prescriptions
        .progress(principal, prescription_id(&path)?)
        .await?;
    Ok(web::Json(progress.into()))
}

/// Tasks of the current day with completion flags.
#[utoipa::path(
    get,
    path = "/api/v1/prescriptions/{id}/today",
    params(("id" = String, Path, description = "Prescription identifier")),
    responses(
        (status = 200, description = "Today's plan", body = TodayResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["prescriptions"],
    operation_id = "prescriptionToday"
)]
#[get("/prescriptions/{id}/today")]
pub async fn prescription_today(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<TodayResponse>> {
    let principal = session.require_principal()?;
    let plan = state
        .prescriptions
        .today(principal, prescription_id(&path)?)
        .await?;
    Ok(web::Json(plan.into()))
}

/// Every recorded completion.
#[utoipa::path(
    get,
    path = "/api/v1/prescriptions/{id}/completions",
    params(("id" = String, Path, description = "Prescription identifier")),
    responses(
        (status = 200, description = "Completions", body = [CompletionResponse]),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["prescriptions"],
    operation_id = "listCompletions"
)]
#[get("/prescriptions/{id}/completions")]
pub async fn list_completions(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<CompletionResponse>>> {
    let principal = session.require_principal()?;
    let completions = state
        .prescriptions
        .completions(principal, prescription_id(&path)?)
        .await?;
    Ok(web::Json(completions.into_iter().map(Into::into).collect()))
}

/// Tick a task on or off and return the refreshed progress.
///
/// Clearing a task that was never completed succeeds.
#[utoipa::path(
    put,
    path = "/api/v1/prescriptions/{id}/completions",
    params(("id" = String, Path, description = "Prescription identifier")),
    request_body = CompletionRequest,
    responses(
        (status = 200, description = "Refreshed progress", body = ProgressResponse),
        (status = 400, description = "Day or task not scheduled", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not the patient", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Prescription not active", body = ErrorSchema)
    ),
    tags = ["prescriptions"],
    operation_id = "recordCompletion"
)]
#[put("/prescriptions/{id}/completions")]
pub async fn record_completion(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<CompletionRequest>,
) -> ApiResult<web::Json<ProgressResponse>> {
    let principal = session.require_principal()?;
    let id = prescription_id(&path)?;
    let update = CompletionUpdate::try_from(payload.into_inner())?;
    let progress = state
        .prescriptions
        .record_completion(principal, id, update)
        .await?;
    Ok(web::Json(progress.into()))
}
