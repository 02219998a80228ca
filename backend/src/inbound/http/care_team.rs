//! Care team handlers linking doctors and patients.
//!
//! ```text
//! POST   /api/v1/care-team/patients {"email":"pat@example.com"}
//! GET    /api/v1/care-team/patients
//! DELETE /api/v1/care-team/patients/{patientId}
//! GET    /api/v1/care-team/doctors
//! ```

use actix_web::{HttpResponse, delete, get, post, web};
use chrono::{DateTime, Utc};
use pagination::{PageParams, Paginated};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{EmailAddress, LinkedUser};
use crate::inbound::http::ApiResult;
use crate::inbound::http::pagination::{page_request, paginated};
use crate::inbound::http::schemas::{ErrorSchema, PaginatedSchema};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::users::UserResponse;
use crate::inbound::http::validation::{FieldName, parse_id};

/// Request body for linking a patient by address.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkPatientRequest {
    #[schema(example = "pat@example.com")]
    pub email: String,
}

/// A linked account and when the link was made.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkedUserResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub linked_at: DateTime<Utc>,
}

impl From<LinkedUser> for LinkedUserResponse {
    fn from(value: LinkedUser) -> Self {
        Self {
            user: value.user.into(),
            linked_at: value.linked_at,
        }
    }
}

/// Link the calling doctor to a registered patient.
///
/// Rejected with `patient_limit_reached` when the doctor's plan is full.
#[utoipa::path(
    post,
    path = "/api/v1/care-team/patients",
    request_body = LinkPatientRequest,
    responses(
        (status = 201, description = "Patient linked", body = LinkedUserResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not a doctor or plan limit reached", body = ErrorSchema),
        (status = 404, description = "No account with that address", body = ErrorSchema),
        (status = 409, description = "Already linked", body = ErrorSchema)
    ),
    tags = ["care-team"],
    operation_id = "linkPatient"
)]
#[post("/care-team/patients")]
pub async fn link_patient(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<LinkPatientRequest>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_principal()?;
    let email = EmailAddress::parse(&payload.email)?;
    let linked = state.care_team.link_patient(principal, email).await?;
    Ok(HttpResponse::Created().json(LinkedUserResponse::from(linked)))
}

/// Patients of the calling doctor, most recently linked first.
#[utoipa::path(
    get,
    path = "/api/v1/care-team/patients",
    params(
        ("cursor" = Option<String>, Query, description = "Opaque cursor from a previous page"),
        ("limit" = Option<usize>, Query, description = "Page size, 1 to 100")
    ),
    responses(
        (status = 200, description = "Linked patients", body = PaginatedSchema<LinkedUserResponse>),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["care-team"],
    operation_id = "listPatients"
)]
#[get("/care-team/patients")]
pub async fn list_patients(
    state: web::Data<HttpState>,
    session: SessionContext,
    page: web::Query<PageParams>,
) -> ApiResult<web::Json<Paginated<LinkedUserResponse>>> {
    let principal = session.require_principal()?;
    let page = state
        .care_team
        .list_patients(principal, page_request(&page)?)
        .await?;
    Ok(web::Json(paginated(page, LinkedUserResponse::from)?))
}

/// Remove a patient from the calling doctor's care team.
#[utoipa::path(
    delete,
    path = "/api/v1/care-team/patients/{patientId}",
    params(("patientId" = String, Path, description = "Patient identifier")),
    responses(
        (status = 204, description = "Link removed"),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not linked", body = ErrorSchema)
    ),
    tags = ["care-team"],
    operation_id = "unlinkPatient"
)]
#[delete("/care-team/patients/{patient_id}")]
pub async fn unlink_patient(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_principal()?;
    let patient_id = parse_id(&path, FieldName::new("patientId"))?;
    state.care_team.unlink_patient(principal, patient_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Doctors caring for the calling patient.
#[utoipa::path(
    get,
    path = "/api/v1/care-team/doctors",
    responses(
        (status = 200, description = "Linked doctors", body = [LinkedUserResponse]),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["care-team"],
    operation_id = "listDoctors"
)]
#[get("/care-team/doctors")]
pub async fn list_doctors(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<LinkedUserResponse>>> {
    let principal = session.require_principal()?;
    let doctors = state.care_team.list_doctors(principal).await?;
    Ok(web::Json(doctors.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::test_utils::{api_app, call_json, memory_state, sign_up};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use serde_json::json;

    #[actix_web::test]
    async fn free_plan_caps_linked_patients() {
        let (_, _, state) = memory_state();
        let app = actix_test::init_service(api_app(state)).await;
        let (doctor, _) = sign_up(&app, "doc@example.com", "DOCTOR").await;

        for n in 0..6 {
            let email = format!("pat{n}@example.com");
            sign_up(&app, &email, "PATIENT").await;
            let (status, body) = call_json(
                &app,
                actix_test::TestRequest::post()
                    .uri("/api/v1/care-team/patients")
                    .cookie(doctor.clone())
                    .set_json(json!({ "email": email }))
                    .to_request(),
            )
            .await;
            if n < 5 {
                assert_eq!(status, StatusCode::CREATED, "patient {n}");
                assert_eq!(body["role"], "PATIENT");
                assert!(body["linkedAt"].is_string());
            } else {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(body["details"]["code"], "patient_limit_reached");
            }
        }
    }

    #[actix_web::test]
    async fn patients_see_their_doctors() {
        let (_, _, state) = memory_state();
        let app = actix_test::init_service(api_app(state)).await;
        let (doctor, doctor_id) = sign_up(&app, "doc@example.com", "DOCTOR").await;
        let (patient, patient_id) = sign_up(&app, "pat@example.com", "PATIENT").await;
        call_json(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/care-team/patients")
                .cookie(doctor.clone())
                .set_json(json!({ "email": "pat@example.com" }))
                .to_request(),
        )
        .await;

        let (status, body) = call_json(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/care-team/doctors")
                .cookie(patient)
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], doctor_id.as_str());

        let (status, _) = call_json(
            &app,
            actix_test::TestRequest::delete()
                .uri(&format!("/api/v1/care-team/patients/{patient_id}"))
                .cookie(doctor.clone())
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = call_json(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/care-team/patients")
                .cookie(doctor)
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!([]));
    }

    #[actix_web::test]
    async fn malformed_patient_ids_are_rejected() {
        let (_, _, state) = memory_state();
        let app = actix_test::init_service(api_app(state)).await;
        let (doctor, _) = sign_up(&app, "doc@example.com", "DOCTOR").await;
        let (status, body) = call_json(
            &app,
            actix_test::TestRequest::delete()
                .uri("/api/v1/care-team/patients/not-a-uuid")
                .cookie(doctor)
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["code"], "invalid_uuid");
    }
}
