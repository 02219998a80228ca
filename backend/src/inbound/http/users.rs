//! Account lookup handlers.
//!
//! ```text
//! GET /api/v1/users/me
//! GET /api/v1/admin/users?role=DOCTOR&limit=20
//! ```

use actix_web::{get, web};
use chrono::{DateTime, Utc};
use pagination::{PageParams, Paginated};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::User;
use crate::inbound::http::ApiResult;
use crate::inbound::http::pagination::{page_request, paginated};
use crate::inbound::http::schemas::{ErrorSchema, PaginatedSchema, RoleSchema};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_optional_enum};

/// Public view of an account.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[schema(format = "uuid")]
    pub id: String,
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "Ada Lovelace")]
    pub display_name: String,
    #[schema(value_type = RoleSchema)]
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.as_str().to_owned(),
            display_name: user.display_name.as_str().to_owned(),
            role: user.role.as_str().to_owned(),
            created_at: user.created_at,
        }
    }
}

/// Optional role filter for the operator listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RoleFilter {
    /// `DOCTOR`, `PATIENT` or `SUPER_ADMIN`.
    pub role: Option<String>,
}

/// The signed-in account.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current account", body = UserResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Account no longer exists", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "currentUser"
)]
#[get("/users/me")]
pub async fn current_user(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<UserResponse>> {
    let principal = session.require_principal()?;
    let user = state.accounts.current_user(principal).await?;
    Ok(web::Json(user.into()))
}

/// Every account, newest first. Operators only.
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    params(
        RoleFilter,
        ("cursor" = Option<String>, Query, description = "Opaque cursor from a previous page"),
        ("limit" = Option<usize>, Query, description = "Page size, 1 to 100")
    ),
    responses(
        (status = 200, description = "Accounts", body = PaginatedSchema<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["admin"],
    operation_id = "listUsers"
)]
#[get("/admin/users")]
pub async fn list_users(
    state: web::Data<HttpState>,
    session: SessionContext,
    filter: web::Query<RoleFilter>,
    page: web::Query<PageParams>,
) -> ApiResult<web::Json<Paginated<UserResponse>>> {
    let principal = session.require_principal()?;
    let role = parse_optional_enum(filter.role.as_deref(), FieldName::new("role"))?;
    let page = state
        .accounts
        .list_users(principal, role, page_request(&page)?)
        .await?;
    Ok(web::Json(paginated(page, UserResponse::from)?))
}
