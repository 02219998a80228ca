//! Who is calling: the signed-in principal carried in the session cookie.
//!
//! Handlers take a [`SessionContext`] and ask it for the [`Principal`]. The
//! cookie stores the user id and role as text; anything that fails to parse
//! is treated as an anonymous caller.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::domain::{Error, Principal, Role, User, UserId};

pub(crate) const USER_ID_KEY: &str = "user_id";
pub(crate) const ROLE_KEY: &str = "role";

/// Session access scoped to authentication.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    pub const fn new(session: Session) -> Self {
        Self(session)
    }

    /// Persist the authenticated account in the session cookie.
    ///
    /// The session is renewed first so a pre-login cookie is never promoted.
    pub fn persist_principal(&self, user: &User) -> Result<(), Error> {
        self.0.renew();
        self.insert(USER_ID_KEY, user.id.to_string())?;
        self.insert(ROLE_KEY, user.role.as_str().to_owned())
    }

    /// Drop every value held by the session and expire the cookie.
    pub fn purge(&self) {
        self.0.purge();
    }

    /// Fetch the current principal, if the session carries a valid one.
    pub fn principal(&self) -> Result<Option<Principal>, Error> {
        let (Some(raw_id), Some(raw_role)) = (self.get(USER_ID_KEY)?, self.get(ROLE_KEY)?) else {
            return Ok(None);
        };
        let Ok(user_id) = raw_id.parse::<UserId>() else {
            warn!("invalid user id in session cookie");
            return Ok(None);
        };
        let Ok(role) = raw_role.parse::<Role>() else {
            warn!(%user_id, "invalid role in session cookie");
            return Ok(None);
        };
        Ok(Some(Principal::new(user_id, role)))
    }

    /// Require an authenticated principal or return `401 Unauthorized`.
    pub fn require_principal(&self) -> Result<Principal, Error> {
        self.principal()?
            .ok_or_else(|| Error::unauthorized("login required"))
    }

    fn insert(&self, key: &str, value: String) -> Result<(), Error> {
        self.0
            .insert(key, value)
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.0
            .get::<String>(key)
            .map_err(|error| Error::internal(format!("failed to read session: {error}")))
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DisplayName, EmailAddress};
    use actix_web::cookie::Cookie;
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test as actix_test, web};
    use chrono::Utc;

    const DOCTOR_ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

    fn doctor() -> User {
        User {
            id: DOCTOR_ID.parse().expect("fixture id"),
            email: EmailAddress::parse("doc@example.com").expect("fixture email"),
            display_name: DisplayName::new("Dr Who").expect("fixture name"),
            role: Role::Doctor,
            created_at: Utc::now(),
        }
    }

    fn session_test_app() -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .wrap(crate::inbound::http::test_utils::test_session_middleware())
            .route(
                "/login",
                web::get().to(|session: SessionContext| async move {
                    session.persist_principal(&doctor())?;
                    Ok::<_, Error>(HttpResponse::Ok())
                }),
            )
            .route(
                "/whoami",
                web::get().to(|session: SessionContext| async move {
                    let principal = session.require_principal()?;
                    Ok::<_, Error>(
                        HttpResponse::Ok().body(format!("{} {}", principal.user_id, principal.role)),
                    )
                }),
            )
            .route(
                "/tamper",
                web::get().to(|session: Session| async move {
                    session.insert(USER_ID_KEY, "not-a-uuid").expect("set user id");
                    session.insert(ROLE_KEY, "DOCTOR").expect("set role");
                    HttpResponse::Ok()
                }),
            )
            .route(
                "/logout",
                web::get().to(|session: SessionContext| async move {
                    session.purge();
                    HttpResponse::Ok()
                }),
            )
    }

    fn session_cookie(res: &actix_web::dev::ServiceResponse) -> Cookie<'static> {
        res.response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .expect("session cookie set")
            .into_owned()
    }

    #[actix_web::test]
    async fn round_trips_principal() {
        let app = actix_test::init_service(session_test_app()).await;
        let login = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/login").to_request()).await;
        assert_eq!(login.status(), StatusCode::OK);

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/whoami")
                .cookie(session_cookie(&login))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = actix_test::read_body(res).await;
        assert_eq!(body, format!("{DOCTOR_ID} DOCTOR"));
    }

    #[actix_web::test]
    async fn missing_principal_is_unauthorised() {
        let app = actix_test::init_service(session_test_app()).await;
        let res = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/whoami").to_request()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn tampered_user_id_is_unauthorised() {
        let app = actix_test::init_service(session_test_app()).await;
        let set = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/tamper").to_request()).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/whoami")
                .cookie(session_cookie(&set))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn purge_expires_the_cookie() {
        let app = actix_test::init_service(session_test_app()).await;
        let login = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/login").to_request()).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/logout")
                .cookie(session_cookie(&login))
                .to_request(),
        )
        .await;
        let cleared = session_cookie(&res);
        assert_eq!(cleared.value(), "");
    }
}
