//! Check-in question and answer handlers.
//!
//! ```text
//! POST   /api/v1/check-in-questions
//! GET    /api/v1/check-in-questions?patientId=…
//! DELETE /api/v1/check-in-questions/{id}
//! GET    /api/v1/check-ins/questions
//! PUT    /api/v1/check-ins {"date":"2026-03-02","answers":[…]}
//! GET    /api/v1/check-ins?patientId=…&from=2026-03-01&to=2026-03-31
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{HistoryQuery, NewQuestion};
use crate::domain::{Answer, CheckIn, CheckInQuestion, Error, QuestionKind, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{AnswerSchema, ErrorSchema, QuestionKindSchema};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id, parse_optional_date};

/// A doctor's new question.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRequest {
    /// Target patient; omit to ask every linked patient.
    #[schema(format = "uuid")]
    pub patient_id: Option<String>,
    #[schema(example = "How did you sleep?")]
    pub prompt: String,
    #[schema(value_type = QuestionKindSchema)]
    pub kind: QuestionKind,
}

impl TryFrom<QuestionRequest> for NewQuestion {
    type Error = Error;

    fn try_from(value: QuestionRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            patient_id: optional_patient(value.patient_id.as_deref())?,
            prompt: value.prompt,
            kind: value.kind,
        })
    }
}

fn optional_patient(raw: Option<&str>) -> Result<Option<UserId>, Error> {
    raw.map(|raw| parse_id(raw, FieldName::new("patientId")))
        .transpose()
}

/// A stored question.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    #[schema(format = "uuid")]
    pub id: String,
    #[schema(format = "uuid")]
    pub doctor_id: String,
    #[schema(format = "uuid")]
    pub patient_id: Option<String>,
    pub prompt: String,
    #[schema(value_type = QuestionKindSchema)]
    pub kind: QuestionKind,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<CheckInQuestion> for QuestionResponse {
    fn from(value: CheckInQuestion) -> Self {
        Self {
            id: value.id.to_string(),
            doctor_id: value.doctor_id.to_string(),
            patient_id: value.patient_id.map(|id| id.to_string()),
            prompt: value.prompt,
            kind: value.kind,
            active: value.active,
            created_at: value.created_at,
        }
    }
}

/// Answers for one date.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    /// Defaults to today; future dates are rejected.
    #[schema(format = "date", example = "2026-03-02")]
    pub date: Option<String>,
    #[serde(default)]
    #[schema(value_type = Vec<AnswerSchema>)]
    pub answers: Vec<Answer>,
}

/// A submitted check-in.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResponse {
    #[schema(format = "uuid")]
    pub id: String,
    #[schema(format = "uuid")]
    pub patient_id: String,
    pub date: NaiveDate,
    #[schema(value_type = Vec<AnswerSchema>)]
    pub answers: Vec<Answer>,
    pub submitted_at: DateTime<Utc>,
}

impl From<CheckIn> for CheckInResponse {
    fn from(value: CheckIn) -> Self {
        Self {
            id: value.id.to_string(),
            patient_id: value.patient_id.to_string(),
            date: value.date,
            answers: value.answers,
            submitted_at: value.submitted_at,
        }
    }
}

/// Restrict questions to one patient.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct QuestionFilter {
    pub patient_id: Option<String>,
}

/// Subject and bounds of a history read.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct HistoryParams {
    /// Required for doctors; patients read their own history.
    pub patient_id: Option<String>,
    /// Earliest date, inclusive.
    pub from: Option<String>,
    /// Latest date, inclusive.
    pub to: Option<String>,
}

impl TryFrom<&HistoryParams> for HistoryQuery {
    type Error = Error;

    fn try_from(value: &HistoryParams) -> Result<Self, Self::Error> {
        Ok(Self {
            patient_id: optional_patient(value.patient_id.as_deref())?,
            from: parse_optional_date(value.from.as_deref(), FieldName::new("from"))?,
            to: parse_optional_date(value.to.as_deref(), FieldName::new("to"))?,
        })
    }
}

/// Ask a patient, or every linked patient, a recurring question.
#[utoipa::path(
    post,
    path = "/api/v1/check-in-questions",
    request_body = QuestionRequest,
    responses(
        (status = 201, description = "Question created", body = QuestionResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not a doctor or patient not linked", body = ErrorSchema)
    ),
    tags = ["check-ins"],
    operation_id = "createQuestion"
)]
#[post("/check-in-questions")]
pub async fn create_question(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<QuestionRequest>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_principal()?;
    let question = NewQuestion::try_from(payload.into_inner())?;
    let created = state.check_ins.create_question(principal, question).await?;
    Ok(HttpResponse::Created().json(QuestionResponse::from(created)))
}

/// The calling doctor's questions.
#[utoipa::path(
    get,
    path = "/api/v1/check-in-questions",
    params(QuestionFilter),
    responses(
        (status = 200, description = "Questions", body = [QuestionResponse]),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not a doctor", body = ErrorSchema)
    ),
    tags = ["check-ins"],
    operation_id = "listQuestions"
)]
#[get("/check-in-questions")]
pub async fn list_questions(
    state: web::Data<HttpState>,
    session: SessionContext,
    filter: web::Query<QuestionFilter>,
) -> ApiResult<web::Json<Vec<QuestionResponse>>> {
    let principal = session.require_principal()?;
    let patient_id = optional_patient(filter.patient_id.as_deref())?;
    let questions = state.check_ins.list_questions(principal, patient_id).await?;
    Ok(web::Json(questions.into_iter().map(Into::into).collect()))
}

/// Stop asking a question. Past answers are kept.
#[utoipa::path(
    delete,
    path = "/api/v1/check-in-questions/{id}",
    params(("id" = String, Path, description = "Question identifier")),
    responses(
        (status = 204, description = "Question deactivated"),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not the author", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["check-ins"],
    operation_id = "deactivateQuestion"
)]
#[delete("/check-in-questions/{id}")]
pub async fn deactivate_question(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_principal()?;
    let id = parse_id(&path, FieldName::new("id"))?;
    state.check_ins.deactivate_question(principal, id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Questions the calling patient should answer.
#[utoipa::path(
    get,
    path = "/api/v1/check-ins/questions",
    responses(
        (status = 200, description = "Questions", body = [QuestionResponse]),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not a patient", body = ErrorSchema)
    ),
    tags = ["check-ins"],
    operation_id = "myQuestions"
)]
#[get("/check-ins/questions")]
pub async fn my_questions(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<QuestionResponse>>> {
    let principal = session.require_principal()?;
    let questions = state.check_ins.questions_for_me(principal).await?;
    Ok(web::Json(questions.into_iter().map(Into::into).collect()))
}

/// Submit or replace the answers for a date.
#[utoipa::path(
    put,
    path = "/api/v1/check-ins",
    request_body = CheckInRequest,
    responses(
        (status = 200, description = "Check-in stored", body = CheckInResponse),
        (status = 400, description = "Invalid answers or date", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not a patient", body = ErrorSchema)
    ),
    tags = ["check-ins"],
    operation_id = "submitCheckIn"
)]
#[put("/check-ins")]
pub async fn submit_check_in(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CheckInRequest>,
) -> ApiResult<web::Json<CheckInResponse>> {
    let principal = session.require_principal()?;
    let CheckInRequest { date, answers } = payload.into_inner();
    let date = parse_optional_date(date.as_deref(), FieldName::new("date"))?;
    let check_in = state.check_ins.submit(principal, date, answers).await?;
    Ok(web::Json(check_in.into()))
}

/// Past check-ins, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/check-ins",
    params(HistoryParams),
    responses(
        (status = 200, description = "Check-ins", body = [CheckInResponse]),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "No access to this patient", body = ErrorSchema)
    ),
    tags = ["check-ins"],
    operation_id = "checkInHistory"
)]
#[get("/check-ins")]
pub async fn check_in_history(
    state: web::Data<HttpState>,
    session: SessionContext,
    params: web::Query<HistoryParams>,
) -> ApiResult<web::Json<Vec<CheckInResponse>>> {
    let principal = session.require_principal()?;
    let query = HistoryQuery::try_from(&*params)?;
    let history = state.check_ins.history(principal, query).await?;
    Ok(web::Json(history.into_iter().map(Into::into).collect()))
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
    #[case(Some("2026-03-01"), Some("2026-03-31"))]
    #[case(None, None)]
    fn history_params_parse_dates(#[case] from: Option<&str>, #[case] to: Option<&str>) {
        let query = HistoryQuery::try_from(&HistoryParams {
            patient_id: None,
            from: from.map(str::to_owned),
            to: to.map(str::to_owned),
        })
        .expect("valid params");
        assert_eq!(query.from.is_some(), from.is_some());
        assert_eq!(query.to.is_some(), to.is_some());
    }

    #[rstest]
    fn malformed_dates_name_the_field() {
        let err = HistoryQuery::try_from(&HistoryParams {
            patient_id: None,
            from: Some("03/01/2026".into()),
            to: None,
        })
        .expect_err("bad date");
        assert_eq!(
            err.details().and_then(|d| d.get("field")),
            Some(&json!("from"))
        );
    }

    #[rstest]
    fn question_kind_is_tagged() {
        let request: QuestionRequest = serde_json::from_value(json!({
            "prompt": "Pain today?",
            "kind": { "type": "SCALE", "min": 0, "max": 10 }
        }))
        .expect("shape");
        assert_eq!(request.kind, QuestionKind::Scale { min: 0, max: 10 });
    }

    #[actix_web::test]
    async fn patient_answers_and_doctor_reads_history() {
        let (_, _, state) = memory_state();
        let app = actix_test::init_service(api_app(state)).await;
        let (doctor, _) = sign_up(&app, "doc@example.com", "DOCTOR").await;
        let (patient, patient_id) = sign_up(&app, "pat@example.com", "PATIENT").await;
        link_patient(&app, &doctor, "pat@example.com").await;

        let (status, question) = call_json(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/check-in-questions")
                .cookie(doctor.clone())
                .set_json(json!({
                    "prompt": "Pain today?",
                    "kind": { "type": "SCALE", "min": 0, "max": 10 }
                }))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let question_id = question["id"].as_str().expect("id").to_owned();

        let (status, mine) = call_json(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/check-ins/questions")
                .cookie(patient.clone())
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(mine[0]["id"], question_id.as_str());

        let submit = |value: serde_json::Value| {
            actix_test::TestRequest::put()
                .uri("/api/v1/check-ins")
                .cookie(patient.clone())
                .set_json(json!({ "answers": [{ "questionId": question_id, "value": value }] }))
                .to_request()
        };
        let (status, _) = call_json(&app, submit(json!(11))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "outside the scale");
        let (status, _) = call_json(&app, submit(json!(true))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "wrong kind");
        let (status, stored) = call_json(&app, submit(json!(4))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stored["date"], "2026-03-02");
        let (status, _) = call_json(&app, submit(json!(6))).await;
        assert_eq!(status, StatusCode::OK, "same date replaces answers");

        let (status, history) = call_json(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!(
                    "/api/v1/check-ins?patientId={patient_id}&from=2026-03-01&to=2026-03-31"
                ))
                .cookie(doctor)
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let entries = history.as_array().expect("array");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["answers"][0]["value"], 6);
    }

    #[actix_web::test]
    async fn future_dates_are_rejected() {
        let (_, _, state) = memory_state();
        let app = actix_test::init_service(api_app(state)).await;
        let (patient, _) = sign_up(&app, "pat@example.com", "PATIENT").await;
        let (status, _) = call_json(
            &app,
            actix_test::TestRequest::put()
                .uri("/api/v1/check-ins")
                .cookie(patient)
                .set_json(json!({ "date": "2026-03-03", "answers": [] }))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
