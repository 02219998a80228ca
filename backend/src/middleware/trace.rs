//! Per-request correlation.
//!
//! [`Trace`] runs each request inside a `request` span with a fresh
//! [`TraceId`] in task-local scope. Domain errors built while the handler runs
//! pick the id up on their own; the middleware then copies it into the
//! `trace-id` response header and logs one completion event.

use std::task::{Context, Poll};
use std::time::Instant;

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderName, HeaderValue};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::{Instrument, info, info_span, warn};

use crate::domain::TraceId;

/// Response header carrying the request's trace identifier.
pub const TRACE_ID_HEADER: &str = "trace-id";

/// Middleware factory attaching a [`TraceId`] to each request.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use careplan::Trace;
///
/// let _app = App::new().wrap(Trace);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

impl<S, B> Transform<S, ServiceRequest> for Trace
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TracedService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, inner: S) -> Self::Future {
        ready(Ok(TracedService { inner }))
    }
}

/// Service produced by [`Trace`].
pub struct TracedService<S> {
    inner: S,
}

fn stamp<B>(res: &mut ServiceResponse<B>, trace_id: TraceId) {
    // A hyphenated UUID is always a valid header value.
    if let Ok(value) = HeaderValue::from_str(&trace_id.to_string()) {
        res.headers_mut()
            .insert(HeaderName::from_static(TRACE_ID_HEADER), value);
    }
}

impl<S, B> Service<ServiceRequest> for TracedService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let trace_id = TraceId::generate();
        let span = info_span!(
            "request",
            %trace_id,
            method = %req.method(),
            path = req.path(),
        );
        let started = Instant::now();
        let fut = span.in_scope(|| self.inner.call(req));

        let handled = async move {
            let mut res = fut.await?;
            stamp(&mut res, trace_id);
            let status = res.status();
            let elapsed_ms = started.elapsed().as_millis();
            if status.is_server_error() {
                warn!(status = status.as_u16(), elapsed_ms, "request failed");
            } else {
                info!(status = status.as_u16(), elapsed_ms, "request handled");
            }
            Ok(res)
        };
        Box::pin(TraceId::scope(trace_id, handled.instrument(span)))
    }
}
