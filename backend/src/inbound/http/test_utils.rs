//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_http::Request;
use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::body::MessageBody;
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test, web};
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};

use crate::inbound::http::state::HttpState;
use crate::test_support::{MemoryStore, MutableClock, http_state};

/// Build a session middleware configured for tests.
///
/// Each call generates a fresh key. The cookie is named `session` and is not
/// marked `Secure`, so plain HTTP test clients send it back.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Handler state over a fresh in-memory store, frozen at 2026-03-02 09:00 UTC.
pub(crate) fn memory_state() -> (Arc<MemoryStore>, Arc<MutableClock>, HttpState) {
    let store = Arc::new(MemoryStore::new());
    let start = Utc
        .with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
        .single()
        .expect("valid fixture instant");
    let clock = Arc::new(MutableClock::new(start));
    let state = http_state(&store, clock.clone());
    (store, clock, state)
}

/// The full `/api/v1` surface over `state`.
pub(crate) fn api_app(
    state: HttpState,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new().app_data(web::Data::new(state)).service(
        web::scope("/api/v1")
            .wrap(test_session_middleware())
            .configure(super::configure),
    )
}

/// Register an account through the API, sign in and return the session
/// cookie together with the new user's id.
pub(crate) async fn sign_up<S, B>(app: &S, email: &str, role: &str) -> (Cookie<'static>, String)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let register = actix_test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({
            "email": email,
            "password": "correct horse",
            "displayName": email,
            "role": role,
        }))
        .to_request();
    let res = actix_test::call_service(app, register).await;
    assert_eq!(res.status(), StatusCode::CREATED, "register {email}");
    let user: Value = actix_test::read_body_json(res).await;
    let id = user["id"].as_str().expect("user id").to_owned();
    (sign_in(app, email, "correct horse").await, id)
}

/// Sign in and return the session cookie.
pub(crate) async fn sign_in<S, B>(app: &S, email: &str, password: &str) -> Cookie<'static>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let login = actix_test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": email, "password": password }))
        .to_request();
    let res = actix_test::call_service(app, login).await;
    assert_eq!(res.status(), StatusCode::OK, "login {email}");
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie")
        .into_owned()
}

/// Call the app and decode the JSON body along with the status.
pub(crate) async fn call_json<S, B>(app: &S, req: Request) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let res = actix_test::call_service(app, req).await;
    let status = res.status();
    let body = actix_test::read_body(res).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("JSON body")
    };
    (status, value)
}

/// A three-day protocol with tasks on days 1 and 3.
pub(crate) fn sample_protocol() -> Value {
    json!({
        "title": "Morning mobility",
        "durationDays": 3,
        "days": [
            {
                "dayNumber": 1,
                "sessions": [{
                    "title": "Warm up",
                    "timeOfDay": "MORNING",
                    "tasks": [{
                        "id": "7d1c5f0e-93a8-4b0e-8a53-4f3bb1a1f001",
                        "title": "Stretch",
                        "kind": "EXERCISE"
                    }]
                }]
            },
            {
                "dayNumber": 3,
                "sessions": [{
                    "title": "Reflect",
                    "timeOfDay": "EVENING",
                    "tasks": [{
                        "id": "7d1c5f0e-93a8-4b0e-8a53-4f3bb1a1f002",
                        "title": "Journal",
                        "kind": "REFLECTION"
                    }]
                }]
            }
        ]
    })
}

/// Link `patient_email` to the doctor signed in with `doctor`.
pub(crate) async fn link_patient<S, B>(app: &S, doctor: &Cookie<'static>, patient_email: &str)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = actix_test::TestRequest::post()
        .uri("/api/v1/care-team/patients")
        .cookie(doctor.clone())
        .set_json(json!({ "email": patient_email }))
        .to_request();
    let (status, _) = call_json(app, req).await;
    assert_eq!(status, StatusCode::CREATED, "link {patient_email}");
}

/// Author [`sample_protocol`] and prescribe it to `patient_id`, returning the
/// prescription id.
pub(crate) async fn prescribe_sample<S, B>(
    app: &S,
    doctor: &Cookie<'static>,
    patient_id: &str,
) -> String
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (status, protocol) = call_json(
        app,
        actix_test::TestRequest::post()
            .uri("/api/v1/protocols")
            .cookie(doctor.clone())
            .set_json(sample_protocol())
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create protocol");
    let (status, prescription) = call_json(
        app,
        actix_test::TestRequest::post()
            .uri("/api/v1/prescriptions")
            .cookie(doctor.clone())
            .set_json(json!({
                "protocolId": protocol["id"],
                "patientId": patient_id,
                "notes": "Start on Monday",
            }))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "prescribe");
    prescription["id"].as_str().expect("prescription id").to_owned()
}
