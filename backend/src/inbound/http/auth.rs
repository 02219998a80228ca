//! Registration and session handlers.
//!
//! ```text
//! POST /api/v1/auth/register {"email":"ada@example.com","password":"…","displayName":"Ada","role":"DOCTOR"}
//! POST /api/v1/auth/login    {"email":"ada@example.com","password":"…"}
//! POST /api/v1/auth/logout
//! ```

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{DisplayName, EmailAddress, Error, LoginCredentials, Password, Registration};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{ErrorSchema, RoleSchema};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::users::UserResponse;
use crate::inbound::http::validation::{FieldName, parse_enum};

/// Request body for `POST /api/v1/auth/register`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "correct horse battery")]
    pub password: String,
    #[schema(example = "Ada Lovelace")]
    pub display_name: String,
    #[schema(value_type = RoleSchema)]
    pub role: String,
}

impl TryFrom<RegisterRequest> for Registration {
    type Error = Error;

    fn try_from(value: RegisterRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            email: EmailAddress::parse(&value.email)?,
            password: Password::new(&value.password)?,
            display_name: DisplayName::new(&value.display_name)?,
            role: parse_enum(&value.role, FieldName::new("role"))?,
        })
    }
}

/// Request body for `POST /api/v1/auth/login`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[schema(example = "ada@example.com")]
    pub email: String,
    pub password: String,
}

/// Create a doctor or patient account.
///
/// Open referrals for the same address are converted.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Role cannot self-register", body = ErrorSchema),
        (status = 409, description = "Address already registered", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["auth"],
    operation_id = "register",
    security([])
)]
#[post("/auth/register")]
pub async fn register(
    state: web::Data<HttpState>,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let registration = Registration::try_from(payload.into_inner())?;
    let user = state.accounts.register(registration).await?;
    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// Authenticate and establish a session.
///
/// Unknown addresses and wrong passwords get the same answer.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = UserResponse,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Invalid credentials", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["auth"],
    operation_id = "login",
    security([])
)]
#[post("/auth/login")]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<LoginRequest>,
) -> ApiResult<web::Json<UserResponse>> {
    let credentials = LoginCredentials::try_from_parts(&payload.email, &payload.password)?;
    let user = state.accounts.login(&credentials).await?;
    session.persist_principal(&user)?;
    Ok(web::Json(UserResponse::from(user)))
}

/// End the session.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses((status = 204, description = "Session cleared")),
    tags = ["auth"],
    operation_id = "logout"
)]
#[post("/auth/logout")]
pub async fn logout(session: SessionContext) -> HttpResponse {
    session.purge();
    HttpResponse::NoContent().finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::inbound::http::test_utils::{api_app, call_json, memory_state, sign_up};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::json;

    fn request(role: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: "correct horse".into(),
            display_name: "Ada".into(),
            role: role.into(),
        }
    }

    #[rstest]
    fn registration_maps_role_and_normalises_email() {
        let registration =
            Registration::try_from(request("PATIENT", " Ada@Example.com ")).expect("valid");
        assert_eq!(registration.role, Role::Patient);
        assert_eq!(registration.email.as_str(), "ada@example.com");
    }

    #[rstest]
    #[case(request("NURSE", "ada@example.com"), "role")]
    #[case(request("DOCTOR", "not-an-email"), "email")]
    fn registration_rejects_invalid_fields(#[case] body: RegisterRequest, #[case] field: &str) {
        let err = Registration::try_from(body).expect_err("invalid");
        assert_eq!(
            err.details().and_then(|d| d.get("field")),
            Some(&json!(field))
        );
    }

    #[actix_web::test]
    async fn login_failures_share_one_message() {
        let (_, _, state) = memory_state();
        let app = actix_test::init_service(api_app(state)).await;
        sign_up(&app, "doc@example.com", "DOCTOR").await;

        for (email, password) in [
            ("doc@example.com", "wrong password"),
            ("nobody@example.com", "correct horse"),
        ] {
            let req = actix_test::TestRequest::post()
                .uri("/api/v1/auth/login")
                .set_json(json!({ "email": email, "password": password }))
                .to_request();
            let (status, body) = call_json(&app, req).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["message"], "invalid credentials");
        }
    }

    #[actix_web::test]
    async fn logout_ends_the_session() {
        let (_, _, state) = memory_state();
        let app = actix_test::init_service(api_app(state)).await;
        let (cookie, _) = sign_up(&app, "pat@example.com", "PATIENT").await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/auth/logout")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        let cleared = res
            .response()
            .cookies()
            .find(|c| c.name() == "session")
            .expect("expired cookie")
            .into_owned();

        let (status, _) = call_json(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/users/me")
                .cookie(cleared)
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn operators_cannot_self_register() {
        let (_, _, state) = memory_state();
        let app = actix_test::init_service(api_app(state)).await;
        let req = actix_test::TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(request("SUPER_ADMIN", "root@example.com"))
            .to_request();
        let (status, body) = call_json(&app, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "forbidden");
    }
}
