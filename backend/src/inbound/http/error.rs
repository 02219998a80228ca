//! Rendering of domain errors as HTTP responses.
//!
//! Handlers return [`ApiResult`]; Actix calls [`ResponseError`] on the
//! domain [`Error`] to pick the status and write the JSON envelope. Internal
//! failures are logged in full and sent to clients as a bare message with the
//! trace id, so database text never leaves the process.

use std::borrow::Cow;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use tracing::{debug, error, warn};

use crate::domain::{Error, ErrorCode};
use crate::middleware::trace::TRACE_ID_HEADER;

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

const INTERNAL_MESSAGE: &str = "Internal server error";

const fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// The payload clients may see.
fn public_view(error: &Error) -> Cow<'_, Error> {
    if error.code() != ErrorCode::InternalError {
        return Cow::Borrowed(error);
    }
    let redacted = Error::internal(INTERNAL_MESSAGE);
    Cow::Owned(match error.trace_id() {
        Some(id) => redacted.with_trace_id(id),
        None => redacted,
    })
}

fn log(error: &Error, status: StatusCode) {
    let trace_id = error.trace_id();
    let message = error.message();
    match error.code() {
        _ if status.is_server_error() => {
            error!(code = ?error.code(), trace_id, message, details = ?error.details(), "request failed");
        }
        // Routine outcomes of normal client traffic.
        ErrorCode::Unauthorized | ErrorCode::NotFound => {
            debug!(code = ?error.code(), trace_id, message, "request rejected");
        }
        _ => warn!(code = ?error.code(), trace_id, message, "request rejected"),
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        log(self, status);

        let mut builder = HttpResponse::build(status);
        if let Some(id) = self.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }
        builder.json(public_view(self).as_ref())
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        error!(error = %err, "framework error promoted to domain error");
        Self::internal(INTERNAL_MESSAGE)
    }
}

#[cfg(test)]
mod tests;
