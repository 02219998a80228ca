//! Doctor subscription handlers.
//!
//! ```text
//! GET  /api/v1/subscriptions/me
//! PUT  /api/v1/subscriptions/me/plan {"plan":"PROFESSIONAL"}
//! POST /api/v1/subscriptions/me/cancel
//! PUT  /api/v1/admin/subscriptions/{doctorId}/status {"status":"PAST_DUE"}
//! ```

use actix_web::{get, post, put, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::SubscriptionView;
use crate::domain::{Plan, SubscriptionStatus};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{ErrorSchema, PlanSchema, SubscriptionStatusSchema};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_enum, parse_id};

/// A subscription and the entitlements it grants today.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    #[schema(format = "uuid")]
    pub doctor_id: String,
    #[schema(value_type = PlanSchema)]
    pub plan: String,
    #[schema(value_type = SubscriptionStatusSchema)]
    pub status: String,
    pub current_period_end: NaiveDate,
    pub cancel_at_period_end: bool,
    pub trial_used: bool,
    /// Plan whose limits apply today.
    #[schema(value_type = PlanSchema)]
    pub effective_plan: String,
    /// Absent for unlimited plans.
    pub patient_limit: Option<u32>,
    pub patients_linked: u64,
    pub updated_at: DateTime<Utc>,
}

impl From<SubscriptionView> for SubscriptionResponse {
    fn from(value: SubscriptionView) -> Self {
        let subscription = value.subscription;
        Self {
            doctor_id: subscription.doctor_id.to_string(),
            plan: subscription.plan.as_str().to_owned(),
            status: subscription.status.as_str().to_owned(),
            current_period_end: subscription.current_period_end,
            cancel_at_period_end: subscription.cancel_at_period_end,
            trial_used: subscription.trial_used,
            effective_plan: value.effective_plan.as_str().to_owned(),
            patient_limit: value.patient_limit,
            patients_linked: value.patients_linked,
            updated_at: subscription.updated_at,
        }
    }
}

/// Request body for a plan change.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct PlanRequest {
    #[schema(value_type = PlanSchema)]
    pub plan: String,
}

/// Request body for a billing status override.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SubscriptionStatusRequest {
    #[schema(value_type = SubscriptionStatusSchema)]
    pub status: String,
}

/// The calling doctor's subscription.
#[utoipa::path(
    get,
    path = "/api/v1/subscriptions/me",
    responses(
        (status = 200, description = "Subscription", body = SubscriptionResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not a doctor", body = ErrorSchema)
    ),
    tags = ["subscriptions"],
    operation_id = "mySubscription"
)]
#[get("/subscriptions/me")]
pub async fn my_subscription(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<SubscriptionResponse>> {
    let principal = session.require_principal()?;
    let view = state.subscriptions.get_mine(principal).await?;
    Ok(web::Json(view.into()))
}

/// Switch plans. The first paid plan starts a trial.
#[utoipa::path(
    put,
    path = "/api/v1/subscriptions/me/plan",
    request_body = PlanRequest,
    responses(
        (status = 200, description = "Plan changed", body = SubscriptionResponse),
        (status = 400, description = "Unknown plan", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not a doctor", body = ErrorSchema),
        (status = 409, description = "Plan already in effect", body = ErrorSchema)
    ),
    tags = ["subscriptions"],
    operation_id = "changePlan"
)]
#[put("/subscriptions/me/plan")]
pub async fn change_plan(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<PlanRequest>,
) -> ApiResult<web::Json<SubscriptionResponse>> {
    let principal = session.require_principal()?;
    let plan: Plan = parse_enum(&payload.plan, FieldName::new("plan"))?;
    let view = state.subscriptions.change_plan(principal, plan).await?;
    Ok(web::Json(view.into()))
}

/// Cancel at the end of the current period.
#[utoipa::path(
    post,
    path = "/api/v1/subscriptions/me/cancel",
    responses(
        (status = 200, description = "Cancellation scheduled", body = SubscriptionResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not a doctor", body = ErrorSchema),
        (status = 409, description = "Nothing to cancel", body = ErrorSchema)
    ),
    tags = ["subscriptions"],
    operation_id = "cancelSubscription"
)]
#[post("/subscriptions/me/cancel")]
pub async fn cancel_subscription(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<SubscriptionResponse>> {
    let principal = session.require_principal()?;
    let view = state.subscriptions.cancel(principal).await?;
    Ok(web::Json(view.into()))
}

/// Override a doctor's billing status.
#[utoipa::path(
    put,
    path = "/api/v1/admin/subscriptions/{doctorId}/status",
    params(("doctorId" = String, Path, description = "Doctor identifier")),
    request_body = SubscriptionStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = SubscriptionResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["admin"],
    operation_id = "setSubscriptionStatus"
)]
#[put("/admin/subscriptions/{doctor_id}/status")]
pub async fn set_subscription_status(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<SubscriptionStatusRequest>,
) -> ApiResult<web::Json<SubscriptionResponse>> {
    let principal = session.require_principal()?;
    let doctor_id = parse_id(&path, FieldName::new("doctorId"))?;
    let status: SubscriptionStatus = parse_enum(&payload.status, FieldName::new("status"))?;
    let view = state
        .subscriptions
        .set_status(principal, doctor_id, status)
        .await?;
    Ok(web::Json(view.into()))
}
