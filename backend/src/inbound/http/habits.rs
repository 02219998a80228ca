//! Habit tracking handlers.
//!
//! ```text
//! POST  /api/v1/habits
//! GET   /api/v1/habits?patientId=…&includeArchived=true
//! PATCH /api/v1/habits/{id}
//! POST  /api/v1/habits/{id}/archive
//! PUT   /api/v1/habits/{id}/progress/{date} {"done":true}
//! GET   /api/v1/habits/{id}/stats
//! ```

use actix_web::{HttpResponse, get, patch, post, put, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::HabitPatch;
use crate::domain::{Error, Habit, HabitDetails, HabitId, HabitStats};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_date, parse_id};

/// A new habit.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HabitRequest {
    #[schema(example = "Evening walk")]
    pub name: String,
    pub description: Option<String>,
    #[schema(minimum = 1, maximum = 7, example = 5)]
    pub target_per_week: u8,
}

impl TryFrom<HabitRequest> for HabitDetails {
    type Error = Error;

    fn try_from(value: HabitRequest) -> Result<Self, Self::Error> {
        Ok(Self::new(
            &value.name,
            value.description.as_deref(),
            value.target_per_week,
        )?)
    }
}

/// Fields to change; absent fields are kept.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HabitPatchRequest {
    pub name: Option<String>,
    /// A blank value clears the description.
    pub description: Option<String>,
    #[schema(minimum = 1, maximum = 7)]
    pub target_per_week: Option<u8>,
}

impl From<HabitPatchRequest> for HabitPatch {
    fn from(value: HabitPatchRequest) -> Self {
        Self {
            name: value.name,
            description: value.description,
            target_per_week: value.target_per_week,
        }
    }
}

/// A tracked habit.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HabitResponse {
    #[schema(format = "uuid")]
    pub id: String,
    #[schema(format = "uuid")]
    pub patient_id: String,
    pub name: String,
    pub description: Option<String>,
    pub target_per_week: u8,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Habit> for HabitResponse {
    fn from(value: Habit) -> Self {
        Self {
            id: value.id.to_string(),
            patient_id: value.patient_id.to_string(),
            name: value.name,
            description: value.description,
            target_per_week: value.target_per_week,
            archived: value.archived,
            created_at: value.created_at,
        }
    }
}

/// Streak and frequency figures.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HabitStatsResponse {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_7_days: u32,
    pub last_30_days: u32,
    pub this_week: u32,
    pub weekly_target_met: bool,
}

impl From<HabitStats> for HabitStatsResponse {
    fn from(value: HabitStats) -> Self {
        Self {
            current_streak: value.current_streak,
            longest_streak: value.longest_streak,
            last_7_days: value.last_7_days,
            last_30_days: value.last_30_days,
            this_week: value.this_week,
            weekly_target_met: value.weekly_target_met,
        }
    }
}

/// Body of a progress mark.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ProgressRequest {
    pub done: bool,
}

/// Whose habits to list.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct HabitFilter {
    /// Required for doctors.
    pub patient_id: Option<String>,
    #[serde(default)]
    pub include_archived: bool,
}

fn habit_id(raw: &str) -> Result<HabitId, Error> {
    parse_id(raw, FieldName::new("id"))
}

/// Start tracking a habit.
#[utoipa::path(
    post,
    path = "/api/v1/habits",
    request_body = HabitRequest,
    responses(
        (status = 201, description = "Habit created", body = HabitResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not a patient", body = ErrorSchema)
    ),
    tags = ["habits"],
    operation_id = "createHabit"
)]
#[post("/habits")]
pub async fn create_habit(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<HabitRequest>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_principal()?;
    let details = HabitDetails::try_from(payload.into_inner())?;
    let habit = state.habits.create(principal, details).await?;
    Ok(HttpResponse::Created().json(HabitResponse::from(habit)))
}

/// Habits of the caller, or of a linked patient.
#[utoipa::path(
    get,
    path = "/api/v1/habits",
    params(HabitFilter),
    responses(
        (status = 200, description = "Habits", body = [HabitResponse]),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "No access to this patient", body = ErrorSchema)
    ),
    tags = ["habits"],
    operation_id = "listHabits"
)]
#[get("/habits")]
pub async fn list_habits(
    state: web::Data<HttpState>,
    session: SessionContext,
    filter: web::Query<HabitFilter>,
) -> ApiResult<web::Json<Vec<HabitResponse>>> {
    let principal = session.require_principal()?;
    let patient_id = filter
        .patient_id
        .as_deref()
        .map(|raw| parse_id(raw, FieldName::new("patientId")))
        .transpose()?;
    let habits = state
        .habits
        .list(principal, patient_id, filter.include_archived)
        .await?;
    Ok(web::Json(habits.into_iter().map(Into::into).collect()))
}

/// Change a habit.
#[utoipa::path(
    patch,
    path = "/api/v1/habits/{id}",
    params(("id" = String, Path, description = "Habit identifier")),
    request_body = HabitPatchRequest,
    responses(
        (status = 200, description = "Habit updated", body = HabitResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not the owner", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["habits"],
    operation_id = "updateHabit"
)]
#[patch("/habits/{id}")]
pub async fn update_habit(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<HabitPatchRequest>,
) -> ApiResult<web::Json<HabitResponse>> {
    let principal = session.require_principal()?;
    let id = habit_id(&path)?;
    let habit = state
        .habits
        .update(principal, id, payload.into_inner().into())
        .await?;
    Ok(web::Json(habit.into()))
}

/// Stop tracking a habit. Logged history is kept.
#[utoipa::path(
    post,
    path = "/api/v1/habits/{id}/archive",
    params(("id" = String, Path, description = "Habit identifier")),
    responses(
        (status = 200, description = "Habit archived", body = HabitResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not the owner", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["habits"],
    operation_id = "archiveHabit"
)]
#[post("/habits/{id}/archive")]
pub async fn archive_habit(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<HabitResponse>> {
    let principal = session.require_principal()?;
    let habit = state.habits.archive(principal, habit_id(&path)?).await?;
    Ok(web::Json(habit.into()))
}

/// Mark a date done or not done.
#[utoipa::path(
    put,
    path = "/api/v1/habits/{id}/progress/{date}",
    params(
        ("id" = String, Path, description = "Habit identifier"),
        ("date" = String, Path, description = "Date formatted as YYYY-MM-DD")
    ),
    request_body = ProgressRequest,
    responses(
        (status = 200, description = "Refreshed statistics", body = HabitStatsResponse),
        (status = 400, description = "Invalid date", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not the owner", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Habit is archived", body = ErrorSchema)
    ),
    tags = ["habits"],
    operation_id = "setHabitProgress"
)]
#[put("/habits/{id}/progress/{date}")]
pub async fn set_habit_progress(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<(String, String)>,
    payload: web::Json<ProgressRequest>,
) -> ApiResult<web::Json<HabitStatsResponse>> {
    let principal = session.require_principal()?;
    let (raw_id, raw_date) = path.into_inner();
    let id = habit_id(&raw_id)?;
    let date = parse_date(&raw_date, FieldName::new("date"))?;
    let stats = state
        .habits
        .set_progress(principal, id, date, payload.done)
        .await?;
    Ok(web::Json(stats.into()))
}

/// Streak and frequency statistics.
#[utoipa::path(
    get,
    path = "/api/v1/habits/{id}/stats",
    params(("id" = String, Path, description = "Habit identifier")),
    responses(
        (status = 200, description = "Statistics", body = HabitStatsResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "No access to this habit", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["habits"],
    operation_id = "habitStats"
)]
#[get("/habits/{id}/stats")]
pub async fn habit_stats(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<HabitStatsResponse>> {
    let principal = session.require_principal()?;
    let stats = state.habits.stats(principal, habit_id(&path)?).await?;
    Ok(web::Json(stats.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::test_utils::{
        api_app, call_json, link_patient, memory_state, sign_up,
    };
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(0)]
    #[case(8)]
    fn weekly_target_is_bounded(#[case] target: u8) {
        let err = HabitDetails::try_from(HabitRequest {
            name: "Walk".into(),
            description: None,
            target_per_week: target,
        })
        .expect_err("out of range");
        assert_eq!(
            err.details().and_then(|d| d.get("field")),
            Some(&json!("targetPerWeek"))
        );
    }

    #[actix_web::test]
    async fn progress_builds_a_streak() {
        let (_, clock, state) = memory_state();
        let app = actix_test::init_service(api_app(state)).await;
        let (doctor, _) = sign_up(&app, "doc@example.com", "DOCTOR").await;
        let (patient, patient_id) = sign_up(&app, "pat@example.com", "PATIENT").await;
        link_patient(&app, &doctor, "pat@example.com").await;

        let (status, habit) = call_json(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/habits")
                .cookie(patient.clone())
                .set_json(json!({ "name": "Evening walk", "targetPerWeek": 2 }))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = habit["id"].as_str().expect("id").to_owned();

        let mark = |date: &str| {
            actix_test::TestRequest::put()
                .uri(&format!("/api/v1/habits/{id}/progress/{date}"))
                .cookie(patient.clone())
                .set_json(json!({ "done": true }))
                .to_request()
        };
        let (status, _) = call_json(&app, mark("2026-03-03")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "future date");
        let (status, stats) = call_json(&app, mark("2026-03-02")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["currentStreak"], 1);

        clock.advance_days(1);
        let (status, stats) = call_json(&app, mark("2026-03-03")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["currentStreak"], 2);
        assert_eq!(stats["weeklyTargetMet"], true);

        let (status, stats) = call_json(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/v1/habits/{id}/stats"))
                .cookie(doctor.clone())
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "linked doctor reads stats");
        assert_eq!(stats["longestStreak"], 2);

        let (status, listed) = call_json(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/v1/habits?patientId={patient_id}"))
                .cookie(doctor)
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed[0]["name"], "Evening walk");
    }

    #[actix_web::test]
    async fn archived_habits_stop_recording() {
        let (_, _, state) = memory_state();
        let app = actix_test::init_service(api_app(state)).await;
        let (patient, _) = sign_up(&app, "pat@example.com", "PATIENT").await;
        let (_, habit) = call_json(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/habits")
                .cookie(patient.clone())
                .set_json(json!({ "name": "Stretch", "targetPerWeek": 7 }))
                .to_request(),
        )
        .await;
        let id = habit["id"].as_str().expect("id").to_owned();

        let (status, patched) = call_json(
            &app,
            actix_test::TestRequest::patch()
                .uri(&format!("/api/v1/habits/{id}"))
                .cookie(patient.clone())
                .set_json(json!({ "targetPerWeek": 3 }))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["name"], "Stretch");
        assert_eq!(patched["targetPerWeek"], 3);

        let (status, archived) = call_json(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/habits/{id}/archive"))
                .cookie(patient.clone())
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(archived["archived"], true);

        let (status, _) = call_json(
            &app,
            actix_test::TestRequest::put()
                .uri(&format!("/api/v1/habits/{id}/progress/2026-03-02"))
                .cookie(patient.clone())
                .set_json(json!({ "done": true }))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, active) = call_json(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/habits")
                .cookie(patient.clone())
                .to_request(),
        )
        .await;
        assert_eq!(active, json!([]));
        let (_, all) = call_json(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/habits?includeArchived=true")
                .cookie(patient)
                .to_request(),
        )
        .await;
        assert_eq!(all.as_array().map(Vec::len), Some(1));
    }
}
