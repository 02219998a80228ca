//! Tests for HTTP error mapping.

use super::*;
use crate::domain::Error;
use actix_web::ResponseError;
use actix_web::body::to_bytes;
use actix_web::http::StatusCode;
use rstest::{fixture, rstest};
use serde_json::json;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn expected_trace_id() -> String {
    TRACE_ID.to_owned()
}

#[rstest]
#[case(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
#[case(Error::unauthorized("no session"), StatusCode::UNAUTHORIZED)]
#[case(Error::forbidden("doctors only"), StatusCode::FORBIDDEN)]
#[case(Error::not_found("missing"), StatusCode::NOT_FOUND)]
#[case(Error::conflict("already active"), StatusCode::CONFLICT)]
#[case(Error::service_unavailable("db down"), StatusCode::SERVICE_UNAVAILABLE)]
#[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error_code(#[case] err: Error, #[case] status: StatusCode) {
    assert_eq!(ResponseError::status_code(&err), status);
}

async fn render(error: Error) -> (StatusCode, Option<String>, Error) {
    let response = ResponseError::error_response(&error);
    let status = response.status();
    let header = response
        .headers()
        .get(TRACE_ID_HEADER)
        .map(|value| value.to_str().expect("ascii trace id").to_owned());
    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");
    let payload = serde_json::from_slice(&bytes).expect("error JSON deserialises");
    (status, header, payload)
}

#[rstest]
#[actix_web::test]
async fn internal_errors_are_redacted_but_keep_trace_id(expected_trace_id: String) {
    let error = Error::internal("connection string leaked")
        .with_trace_id(expected_trace_id.clone())
        .with_details(json!({"secret": "x"}));

    let (status, header, payload) = render(error).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header.as_deref(), Some(expected_trace_id.as_str()));
    assert_eq!(payload.code(), ErrorCode::InternalError);
    assert_eq!(payload.message(), INTERNAL_MESSAGE);
    assert!(payload.details().is_none());
    assert_eq!(payload.trace_id(), Some(expected_trace_id.as_str()));
}

#[rstest]
#[actix_web::test]
async fn client_errors_keep_their_details(expected_trace_id: String) {
    let error = Error::forbidden("patient limit reached")
        .with_trace_id(expected_trace_id.clone())
        .with_details(json!({"code": "patient_limit_reached", "limit": 5}));

    let (status, header, payload) = render(error).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(header.as_deref(), Some(expected_trace_id.as_str()));
    assert_eq!(payload.message(), "patient limit reached");
    assert_eq!(
        payload.details(),
        Some(&json!({"code": "patient_limit_reached", "limit": 5}))
    );
}

#[rstest]
#[actix_web::test]
async fn error_without_trace_id_omits_trace_header() {
    let error = Error::invalid_request("bad").with_details(json!({"field": "email"}));

    let (status, header, payload) = render(error).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(header.is_none());
    assert_eq!(payload.trace_id(), None);
}

#[rstest]
fn public_view_borrows_client_errors() {
    let error = Error::conflict("duplicate email").with_trace_id(TRACE_ID);
    let view = public_view(&error);
    assert!(matches!(view, Cow::Borrowed(_)));
    assert_eq!(view.as_ref(), &error);
}

#[rstest]
fn public_view_of_untraced_internal_error_has_no_trace() {
    let error = Error::internal("pool exhausted");
    let view = public_view(&error);
    assert_eq!(view.message(), INTERNAL_MESSAGE);
    assert_eq!(view.trace_id(), None);
}

#[rstest]
fn from_actix_error_is_redacted_internal_error() {
    let err: Error = actix_web::error::ErrorBadRequest("boom").into();

    assert_eq!(err.code(), ErrorCode::InternalError);
    assert_eq!(err.message(), INTERNAL_MESSAGE);
    assert_eq!(err.details(), None);
}
