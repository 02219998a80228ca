//! Clinic and membership handlers.
//!
//! ```text
//! POST   /api/v1/clinics {"name":"Riverside Physio"}
//! GET    /api/v1/clinics
//! GET    /api/v1/clinics/{id}/members
//! POST   /api/v1/clinics/{id}/members {"email":"doc@example.com","role":"MEMBER"}
//! PUT    /api/v1/clinics/{id}/members/{doctorId} {"role":"ADMIN"}
//! DELETE /api/v1/clinics/{id}/members/{doctorId}
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::ClinicSummary;
use crate::domain::{ClinicId, ClinicMember, ClinicRole, EmailAddress, Error, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{ClinicRoleSchema, ErrorSchema};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::users::UserResponse;
use crate::inbound::http::validation::{FieldName, parse_enum, parse_id};

/// Request body for founding a clinic.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateClinicRequest {
    #[schema(example = "Riverside Physio")]
    pub name: String,
}

/// A clinic and the caller's role in it.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClinicResponse {
    #[schema(format = "uuid")]
    pub id: String,
    pub name: String,
    #[schema(format = "uuid")]
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[schema(value_type = ClinicRoleSchema)]
    pub role: String,
}

impl From<ClinicSummary> for ClinicResponse {
    fn from(value: ClinicSummary) -> Self {
        Self {
            id: value.clinic.id.to_string(),
            name: value.clinic.name,
            created_by: value.clinic.created_by.to_string(),
            created_at: value.clinic.created_at,
            role: value.role.as_str().to_owned(),
        }
    }
}

/// A member doctor.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClinicMemberResponse {
    #[schema(format = "uuid")]
    pub clinic_id: String,
    #[schema(value_type = ClinicRoleSchema)]
    pub role: String,
    pub joined_at: DateTime<Utc>,
    pub doctor: UserResponse,
}

impl From<ClinicMember> for ClinicMemberResponse {
    fn from(value: ClinicMember) -> Self {
        Self {
            clinic_id: value.membership.clinic_id.to_string(),
            role: value.membership.role.as_str().to_owned(),
            joined_at: value.membership.joined_at,
            doctor: value.user.into(),
        }
    }
}

/// Request body for adding a member.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AddMemberRequest {
    #[schema(example = "doc@example.com")]
    pub email: String,
    #[schema(value_type = ClinicRoleSchema)]
    pub role: String,
}

/// Request body for a role change.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ChangeRoleRequest {
    #[schema(value_type = ClinicRoleSchema)]
    pub role: String,
}

fn clinic_id(raw: &str) -> Result<ClinicId, Error> {
    parse_id(raw, FieldName::new("id"))
}

fn member_path(path: web::Path<(String, String)>) -> Result<(ClinicId, UserId), Error> {
    let (raw_clinic, raw_doctor) = path.into_inner();
    Ok((
        clinic_id(&raw_clinic)?,
        parse_id(&raw_doctor, FieldName::new("doctorId"))?,
    ))
}

fn clinic_role(raw: &str) -> Result<ClinicRole, Error> {
    parse_enum(raw, FieldName::new("role"))
}

/// Found a clinic owned by the calling doctor.
#[utoipa::path(
    post,
    path = "/api/v1/clinics",
    request_body = CreateClinicRequest,
    responses(
        (status = 201, description = "Clinic created", body = ClinicResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not a doctor", body = ErrorSchema)
    ),
    tags = ["clinics"],
    operation_id = "createClinic"
)]
#[post("/clinics")]
pub async fn create_clinic(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateClinicRequest>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_principal()?;
    let summary = state
        .clinics
        .create(principal, payload.into_inner().name)
        .await?;
    Ok(HttpResponse::Created().json(ClinicResponse::from(summary)))
}

/// Clinics the caller belongs to.
#[utoipa::path(
    get,
    path = "/api/v1/clinics",
    responses(
        (status = 200, description = "Clinics", body = [ClinicResponse]),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not a doctor", body = ErrorSchema)
    ),
    tags = ["clinics"],
    operation_id = "listClinics"
)]
#[get("/clinics")]
pub async fn list_clinics(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<ClinicResponse>>> {
    let principal = session.require_principal()?;
    let clinics = state.clinics.list_mine(principal).await?;
    Ok(web::Json(clinics.into_iter().map(Into::into).collect()))
}

/// Members of a clinic the caller belongs to.
#[utoipa::path(
    get,
    path = "/api/v1/clinics/{id}/members",
    params(("id" = String, Path, description = "Clinic identifier")),
    responses(
        (status = 200, description = "Members", body = [ClinicMemberResponse]),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not a member", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["clinics"],
    operation_id = "listClinicMembers"
)]
#[get("/clinics/{id}/members")]
pub async fn list_members(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<ClinicMemberResponse>>> {
    let principal = session.require_principal()?;
    let members = state.clinics.members(principal, clinic_id(&path)?).await?;
    Ok(web::Json(members.into_iter().map(Into::into).collect()))
}

/// Add a registered doctor. Only owners may add owners.
#[utoipa::path(
    post,
    path = "/api/v1/clinics/{id}/members",
    params(("id" = String, Path, description = "Clinic identifier")),
    request_body = AddMemberRequest,
    responses(
        (status = 201, description = "Member added", body = ClinicMemberResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Cannot manage members", body = ErrorSchema),
        (status = 404, description = "Clinic or account not found", body = ErrorSchema),
        (status = 409, description = "Already a member", body = ErrorSchema)
    ),
    tags = ["clinics"],
    operation_id = "addClinicMember"
)]
#[post("/clinics/{id}/members")]
pub async fn add_member(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<AddMemberRequest>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_principal()?;
    let id = clinic_id(&path)?;
    let email = EmailAddress::parse(&payload.email)?;
    let role = clinic_role(&payload.role)?;
    let member = state.clinics.add_member(principal, id, email, role).await?;
    Ok(HttpResponse::Created().json(ClinicMemberResponse::from(member)))
}

/// Change a member's role. Owners only; a clinic keeps at least one owner.
#[utoipa::path(
    put,
    path = "/api/v1/clinics/{id}/members/{doctorId}",
    params(
        ("id" = String, Path, description = "Clinic identifier"),
        ("doctorId" = String, Path, description = "Member identifier")
    ),
    request_body = ChangeRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = ClinicMemberResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Owner required", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Last owner", body = ErrorSchema)
    ),
    tags = ["clinics"],
    operation_id = "changeClinicRole"
)]
#[put("/clinics/{id}/members/{doctor_id}")]
pub async fn change_role(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<(String, String)>,
    payload: web::Json<ChangeRoleRequest>,
) -> ApiResult<web::Json<ClinicMemberResponse>> {
    let principal = session.require_principal()?;
    let (id, doctor_id) = member_path(path)?;
    let role = clinic_role(&payload.role)?;
    let member = state
        .clinics
        .change_role(principal, id, doctor_id, role)
        .await?;
    Ok(web::Json(member.into()))
}

/// Remove a member, or leave the clinic when `doctorId` is the caller.
#[utoipa::path(
    delete,
    path = "/api/v1/clinics/{id}/members/{doctorId}",
    params(
        ("id" = String, Path, description = "Clinic identifier"),
        ("doctorId" = String, Path, description = "Member identifier")
    ),
    responses(
        (status = 204, description = "Member removed"),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Cannot manage members", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Last owner", body = ErrorSchema)
    ),
    tags = ["clinics"],
    operation_id = "removeClinicMember"
)]
#[delete("/clinics/{id}/members/{doctor_id}")]
pub async fn remove_member(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_principal()?;
    let (id, doctor_id) = member_path(path)?;
    state.clinics.remove_member(principal, id, doctor_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use crate::inbound::http::test_utils::{api_app, call_json, memory_state, sign_up};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use serde_json::json;

    #[actix_web::test]
    async fn owners_manage_membership() {
        let (_, _, state) = memory_state();
        let app = actix_test::init_service(api_app(state)).await;
        let (owner, owner_id) = sign_up(&app, "owner@example.com", "DOCTOR").await;
        let (colleague, colleague_id) = sign_up(&app, "colleague@example.com", "DOCTOR").await;
        sign_up(&app, "pat@example.com", "PATIENT").await;

        let (status, clinic) = call_json(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/clinics")
                .cookie(owner.clone())
                .set_json(json!({ "name": "Riverside Physio" }))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(clinic["role"], "OWNER");
        let id = clinic["id"].as_str().expect("id").to_owned();

        let add = |email: &str| {
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/clinics/{id}/members"))
                .cookie(owner.clone())
                .set_json(json!({ "email": email, "role": "MEMBER" }))
                .to_request()
        };
        let (status, member) = call_json(&app, add("colleague@example.com")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(member["doctor"]["id"], colleague_id.as_str());
        let (status, _) = call_json(&app, add("pat@example.com")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "patients cannot join");
        let (status, _) = call_json(&app, add("colleague@example.com")).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = call_json(
            &app,
            actix_test::TestRequest::put()
                .uri(&format!("/api/v1/clinics/{id}/members/{owner_id}"))
                .cookie(colleague.clone())
                .set_json(json!({ "role": "MEMBER" }))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "members cannot change roles");

        let (status, body) = call_json(
            &app,
            actix_test::TestRequest::delete()
                .uri(&format!("/api/v1/clinics/{id}/members/{owner_id}"))
                .cookie(owner.clone())
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["details"]["code"], "last_owner");

        let (status, _) = call_json(
            &app,
            actix_test::TestRequest::delete()
                .uri(&format!("/api/v1/clinics/{id}/members/{colleague_id}"))
                .cookie(colleague.clone())
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT, "members may leave");

        let (status, _) = call_json(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/v1/clinics/{id}/members"))
                .cookie(colleague)
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (_, members) = call_json(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/v1/clinics/{id}/members"))
                .cookie(owner)
                .to_request(),
        )
        .await;
        assert_eq!(members.as_array().map(Vec::len), Some(1));
    }
}
