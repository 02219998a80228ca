//! Protocol authoring handlers.
//!
//! ```text
//! POST   /api/v1/protocols
//! GET    /api/v1/protocols
//! GET    /api/v1/protocols/{id}
//! PUT    /api/v1/protocols/{id}
//! DELETE /api/v1/protocols/{id}
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use chrono::{DateTime, Utc};
use pagination::{PageParams, Paginated};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Error, Protocol, ProtocolContent, ProtocolDay, ProtocolId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::pagination::{page_request, paginated};
use crate::inbound::http::schemas::{ErrorSchema, PaginatedSchema, ProtocolDaySchema};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id};

/// Authored protocol content, used for create and replace.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolRequest {
    #[schema(example = "Post-op knee rehab")]
    pub title: String,
    pub description: Option<String>,
    #[schema(minimum = 1, maximum = 365, example = 28)]
    pub duration_days: u16,
    /// Scheduled days; days without an entry are rest days.
    #[serde(default)]
    #[schema(value_type = Vec<ProtocolDaySchema>)]
    pub days: Vec<ProtocolDay>,
}

impl TryFrom<ProtocolRequest> for ProtocolContent {
    type Error = Error;

    fn try_from(value: ProtocolRequest) -> Result<Self, Self::Error> {
        Ok(Self::new(
            &value.title,
            value.description.as_deref(),
            value.duration_days,
            value.days,
        )?)
    }
}

/// A stored protocol.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolResponse {
    #[schema(format = "uuid")]
    pub id: String,
    #[schema(format = "uuid")]
    pub doctor_id: String,
    pub title: String,
    pub description: Option<String>,
    pub duration_days: u16,
    /// Number of tasks across every scheduled day.
    pub total_tasks: usize,
    #[schema(value_type = Vec<ProtocolDaySchema>)]
    pub days: Vec<ProtocolDay>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Protocol> for ProtocolResponse {
    fn from(protocol: Protocol) -> Self {
        let total_tasks = protocol.content.plan.total_tasks();
        let ProtocolContent {
            title,
            description,
            duration_days,
            plan,
        } = protocol.content;
        Self {
            id: protocol.id.to_string(),
            doctor_id: protocol.doctor_id.to_string(),
            title,
            description,
            duration_days,
            total_tasks,
            days: plan.into_days(),
            created_at: protocol.created_at,
            updated_at: protocol.updated_at,
        }
    }
}

fn protocol_id(raw: &str) -> Result<ProtocolId, Error> {
    parse_id(raw, FieldName::new("id"))
}

/// Author a protocol.
#[utoipa::path(
    post,
    path = "/api/v1/protocols",
    request_body = ProtocolRequest,
    responses(
        (status = 201, description = "Protocol created", body = ProtocolResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not a doctor", body = ErrorSchema)
    ),
    tags = ["protocols"],
    operation_id = "createProtocol"
)]
#[post("/protocols")]
pub async fn create_protocol(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<ProtocolRequest>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_principal()?;
    let content = ProtocolContent::try_from(payload.into_inner())?;
    let protocol = state.protocols.create(principal, content).await?;
    Ok(HttpResponse::Created().json(ProtocolResponse::from(protocol)))
}

/// The calling doctor's protocols, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/protocols",
    params(
        ("cursor" = Option<String>, Query, description = "Opaque cursor from a previous page"),
        ("limit" = Option<usize>, Query, description = "Page size, 1 to 100")
    ),
    responses(
        (status = 200, description = "Protocols", body = PaginatedSchema<ProtocolResponse>),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not a doctor", body = ErrorSchema)
    ),
    tags = ["protocols"],
    operation_id = "listProtocols"
)]
#[get("/protocols")]
pub async fn list_protocols(
    state: web::Data<HttpState>,
    session: SessionContext,
    page: web::Query<PageParams>,
) -> ApiResult<web::Json<Paginated<ProtocolResponse>>> {
    let principal = session.require_principal()?;
    let page = state
        .protocols
        .list_mine(principal, page_request(&page)?)
        .await?;
    Ok(web::Json(paginated(page, ProtocolResponse::from)?))
}

/// Read a protocol as its author, an operator or a patient running it.
#[utoipa::path(
    get,
    path = "/api/v1/protocols/{id}",
    params(("id" = String, Path, description = "Protocol identifier")),
    responses(
        (status = 200, description = "Protocol", body = ProtocolResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["protocols"],
    operation_id = "getProtocol"
)]
#[get("/protocols/{id}")]
pub async fn get_protocol(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ProtocolResponse>> {
    let principal = session.require_principal()?;
    let protocol = state.protocols.get(principal, protocol_id(&path)?).await?;
    Ok(web::Json(protocol.into()))
}

/// Replace a protocol's content.
///
/// Refused with a conflict while any prescription of it is active or paused.
#[utoipa::path(
    put,
    path = "/api/v1/protocols/{id}",
    params(("id" = String, Path, description = "Protocol identifier")),
    request_body = ProtocolRequest,
    responses(
        (status = 200, description = "Protocol updated", body = ProtocolResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Protocol is in use", body = ErrorSchema)
    ),
    tags = ["protocols"],
    operation_id = "updateProtocol"
)]
#[put("/protocols/{id}")]
pub async fn update_protocol(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<ProtocolRequest>,
) -> ApiResult<web::Json<ProtocolResponse>> {
    let principal = session.require_principal()?;
    let id = protocol_id(&path)?;
    let content = ProtocolContent::try_from(payload.into_inner())?;
    let protocol = state.protocols.update(principal, id, content).await?;
    Ok(web::Json(protocol.into()))
}

/// Delete a protocol that was never prescribed.
#[utoipa::path(
    delete,
    path = "/api/v1/protocols/{id}",
    params(("id" = String, Path, description = "Protocol identifier")),
    responses(
        (status = 204, description = "Protocol deleted"),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Protocol has prescriptions", body = ErrorSchema)
    ),
    tags = ["protocols"],
    operation_id = "deleteProtocol"
)]
#[delete("/protocols/{id}")]
pub async fn delete_protocol(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_principal()?;
    state.protocols.delete(principal, protocol_id(&path)?).await?;
    Ok(HttpResponse::NoContent().finish())
}
