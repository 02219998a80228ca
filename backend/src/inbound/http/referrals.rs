//! Referral handlers for referrers and operators.
//!
//! ```text
//! POST /api/v1/referrals
//! GET  /api/v1/referrals
//! GET  /api/v1/admin/referrals?status=PENDING
//! PUT  /api/v1/admin/referrals/{id}/status {"status":"CONTACTED","notes":"…"}
//! ```

use actix_web::{HttpResponse, get, post, put, web};
use chrono::{DateTime, Utc};
use pagination::{PageParams, Paginated};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Error, Referral, ReferralDraft, ReferralStatus};
use crate::inbound::http::ApiResult;
use crate::inbound::http::pagination::{page_request, paginated};
use crate::inbound::http::schemas::{
    ErrorSchema, PaginatedSchema, ReferralStatusSchema, RoleSchema,
};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_enum, parse_id, parse_optional_enum};

/// Someone the caller would like to bring on board.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferralRequest {
    /// `DOCTOR` or `PATIENT`.
    #[schema(value_type = RoleSchema)]
    pub target_role: String,
    #[schema(example = "Grace Hopper")]
    pub referee_name: String,
    #[schema(example = "grace@example.com")]
    pub referee_email: String,
    pub referee_phone: Option<String>,
    pub notes: Option<String>,
}

impl TryFrom<ReferralRequest> for ReferralDraft {
    type Error = Error;

    fn try_from(value: ReferralRequest) -> Result<Self, Self::Error> {
        let target_role = parse_enum(&value.target_role, FieldName::new("targetRole"))?;
        Ok(Self::new(
            target_role,
            &value.referee_name,
            &value.referee_email,
            value.referee_phone.as_deref(),
            value.notes.as_deref(),
        )?)
    }
}

/// A stored referral.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferralResponse {
    #[schema(format = "uuid")]
    pub id: String,
    #[schema(format = "uuid")]
    pub referrer_id: String,
    #[schema(value_type = RoleSchema)]
    pub target_role: String,
    pub referee_name: String,
    pub referee_email: String,
    pub referee_phone: Option<String>,
    pub notes: Option<String>,
    #[schema(value_type = ReferralStatusSchema)]
    pub status: String,
    /// Account created by the referee, once converted.
    #[schema(format = "uuid")]
    pub converted_user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Referral> for ReferralResponse {
    fn from(value: Referral) -> Self {
        let ReferralDraft {
            target_role,
            referee_name,
            referee_email,
            referee_phone,
            notes,
        } = value.draft;
        Self {
            id: value.id.to_string(),
            referrer_id: value.referrer_id.to_string(),
            target_role: target_role.as_str().to_owned(),
            referee_name,
            referee_email: referee_email.to_string(),
            referee_phone,
            notes,
            status: value.status.as_str().to_owned(),
            converted_user_id: value.converted_user_id.map(|id| id.to_string()),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// Operator status change.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferralStatusRequest {
    #[schema(value_type = ReferralStatusSchema)]
    pub status: String,
    /// Replaces the stored notes when present.
    pub notes: Option<String>,
}

/// Restrict the operator listing to one status.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReferralStatusFilter {
    pub status: Option<String>,
}

/// Refer a prospective doctor or patient.
#[utoipa::path(
    post,
    path = "/api/v1/referrals",
    request_body = ReferralRequest,
    responses(
        (status = 201, description = "Referral recorded", body = ReferralResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Operators cannot refer", body = ErrorSchema),
        (status = 409, description = "Open referral already exists", body = ErrorSchema)
    ),
    tags = ["referrals"],
    operation_id = "createReferral"
)]
#[post("/referrals")]
pub async fn create_referral(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<ReferralRequest>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_principal()?;
    let draft = ReferralDraft::try_from(payload.into_inner())?;
    let referral = state.referrals.create(principal, draft).await?;
    Ok(HttpResponse::Created().json(ReferralResponse::from(referral)))
}

/// Referrals raised by the caller.
#[utoipa::path(
    get,
    path = "/api/v1/referrals",
    params(
        ("cursor" = Option<String>, Query, description = "Opaque cursor from a previous page"),
        ("limit" = Option<usize>, Query, description = "Page size, 1 to 100")
    ),
    responses(
        (status = 200, description = "Referrals", body = PaginatedSchema<ReferralResponse>),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["referrals"],
    operation_id = "listMyReferrals"
)]
#[get("/referrals")]
pub async fn list_my_referrals(
    state: web::Data<HttpState>,
    session: SessionContext,
    page: web::Query<PageParams>,
) -> ApiResult<web::Json<Paginated<ReferralResponse>>> {
    let principal = session.require_principal()?;
    let page = state
        .referrals
        .list_mine(principal, page_request(&page)?)
        .await?;
    Ok(web::Json(paginated(page, ReferralResponse::from)?))
}

/// Every referral, for operators.
#[utoipa::path(
    get,
    path = "/api/v1/admin/referrals",
    params(
        ReferralStatusFilter,
        ("cursor" = Option<String>, Query, description = "Opaque cursor from a previous page"),
        ("limit" = Option<usize>, Query, description = "Page size, 1 to 100")
    ),
    responses(
        (status = 200, description = "Referrals", body = PaginatedSchema<ReferralResponse>),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["admin"],
    operation_id = "listReferrals"
)]
#[get("/admin/referrals")]
pub async fn list_all_referrals(
    state: web::Data<HttpState>,
    session: SessionContext,
    filter: web::Query<ReferralStatusFilter>,
    page: web::Query<PageParams>,
) -> ApiResult<web::Json<Paginated<ReferralResponse>>> {
    let principal = session.require_principal()?;
    let status = parse_optional_enum(filter.status.as_deref(), FieldName::new("status"))?;
    let page = state
        .referrals
        .list_all(principal, status, page_request(&page)?)
        .await?;
    Ok(web::Json(paginated(page, ReferralResponse::from)?))
}

/// Move a referral through its lifecycle.
#[utoipa::path(
    put,
    path = "/api/v1/admin/referrals/{id}/status",
    params(("id" = String, Path, description = "Referral identifier")),
    request_body = ReferralStatusRequest,
    responses(
        (status = 200, description = "Referral updated", body = ReferralResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Transition not allowed", body = ErrorSchema)
    ),
    tags = ["admin"],
    operation_id = "updateReferralStatus"
)]
#[put("/admin/referrals/{id}/status")]
pub async fn update_referral_status(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<ReferralStatusRequest>,
) -> ApiResult<web::Json<ReferralResponse>> {
    let principal = session.require_principal()?;
    let id = parse_id(&path, FieldName::new("id"))?;
    let ReferralStatusRequest { status, notes } = payload.into_inner();
    let status: ReferralStatus = parse_enum(&status, FieldName::new("status"))?;
    let referral = state
        .referrals
        .update_status(principal, id, status, notes)
        .await?;
    Ok(web::Json(referral.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::inbound::http::test_utils::{api_app, call_json, memory_state, sign_in, sign_up};
    use crate::test_support::seed_user;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use mockable::Clock;
    use rstest::rstest;
    use serde_json::{Value, json};

    #[rstest]
    #[case(json!({ "targetRole": "SUPER_ADMIN", "refereeName": "Root", "refereeEmail": "r@example.com" }), "targetRole")]
    #[case(json!({ "targetRole": "NURSE", "refereeName": "Ann", "refereeEmail": "a@example.com" }), "targetRole")]
    #[case(json!({ "targetRole": "DOCTOR", "refereeName": "Ann", "refereeEmail": "nope" }), "refereeEmail")]
    fn invalid_drafts_name_the_field(#[case] body: Value, #[case] field: &str) {
        let request: ReferralRequest = serde_json::from_value(body).expect("shape");
        let err = ReferralDraft::try_from(request).expect_err("invalid");
        assert_eq!(
            err.details().and_then(|d| d.get("field")),
            Some(&json!(field))
        );
    }

    #[actix_web::test]
    async fn registration_converts_open_referrals() {
        let (store, clock, state) = memory_state();
        let app = actix_test::init_service(api_app(state)).await;
        let (doctor, _) = sign_up(&app, "doc@example.com", "DOCTOR").await;

        let refer = || {
            actix_test::TestRequest::post()
                .uri("/api/v1/referrals")
                .cookie(doctor.clone())
                .set_json(json!({
                    "targetRole": "DOCTOR",
                    "refereeName": "Grace",
                    "refereeEmail": "grace@example.com",
                }))
                .to_request()
        };
        let (status, referral) = call_json(&app, refer()).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(referral["status"], "PENDING");
        let (status, _) = call_json(&app, refer()).await;
        assert_eq!(status, StatusCode::CONFLICT, "one open referral per address");

        let (_, grace_id) = sign_up(&app, "grace@example.com", "DOCTOR").await;

        let (status, mine) = call_json(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/referrals")
                .cookie(doctor)
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(mine["data"][0]["status"], "CONVERTED");
        assert_eq!(mine["data"][0]["convertedUserId"], grace_id.as_str());

        seed_user(&store, "root@example.com", "operator pass", Role::SuperAdmin, clock.utc())
            .await
            .expect("seed operator");
        let admin = sign_in(&app, "root@example.com", "operator pass").await;
        let id = referral["id"].as_str().expect("id");
        let (status, body) = call_json(
            &app,
            actix_test::TestRequest::put()
                .uri(&format!("/api/v1/admin/referrals/{id}/status"))
                .cookie(admin)
                .set_json(json!({ "status": "CONTACTED" }))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["details"]["from"], "CONVERTED");
    }

    #[actix_web::test]
    async fn operators_filter_by_status() {
        let (store, clock, state) = memory_state();
        let app = actix_test::init_service(api_app(state)).await;
        let (patient, _) = sign_up(&app, "pat@example.com", "PATIENT").await;
        call_json(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/referrals")
                .cookie(patient.clone())
                .set_json(json!({
                    "targetRole": "PATIENT",
                    "refereeName": "Sam",
                    "refereeEmail": "sam@example.com",
                }))
                .to_request(),
        )
        .await;

        let (status, _) = call_json(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/admin/referrals")
                .cookie(patient)
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        seed_user(&store, "root@example.com", "operator pass", Role::SuperAdmin, clock.utc())
            .await
            .expect("seed operator");
        let admin = sign_in(&app, "root@example.com", "operator pass").await;
        let list = |status: &str| {
            actix_test::TestRequest::get()
                .uri(&format!("/api/v1/admin/referrals?status={status}"))
                .cookie(admin.clone())
                .to_request()
        };
        let (_, pending) = call_json(&app, list("PENDING")).await;
        assert_eq!(pending["data"].as_array().map(Vec::len), Some(1));
        let (_, declined) = call_json(&app, list("DECLINED")).await;
        assert_eq!(declined["data"], json!([]));
        let (status, _) = call_json(&app, list("LOST")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
