//! Liveness and readiness probes for orchestrators and load balancers.

use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::http::header::{CacheControl, CacheDirective};
use actix_web::{HttpResponse, get, web};

/// Probe state shared between the server and the health handlers.
///
/// Starts live but not ready. The server flips it to ready once the listener
/// is bound; a shutdown signal fails both probes while requests drain.
#[derive(Debug)]
pub struct HealthState {
    ready: AtomicBool,
    live: AtomicBool,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            ready: AtomicBool::new(false),
            live: AtomicBool::new(true),
        }
    }
}

impl HealthState {
    /// Live, not yet ready.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept traffic.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Report failure on both probes while draining.
    pub fn mark_unhealthy(&self) {
        self.ready.store(false, Ordering::Release);
        self.live.store(false, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn is_alive(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }
}

fn probe_response(ok: bool) -> HttpResponse {
    let mut response = if ok {
        HttpResponse::Ok()
    } else {
        HttpResponse::ServiceUnavailable()
    };
    response
        .insert_header(CacheControl(vec![CacheDirective::NoStore]))
        .finish()
}

/// Readiness probe.
#[utoipa::path(
    get,
    path = "/health/ready",
    tags = ["health"],
    security([]),
    responses(
        (status = 200, description = "Server is ready to handle traffic"),
        (status = 503, description = "Server is starting or draining")
    )
)]
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    probe_response(state.is_ready())
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health/live",
    tags = ["health"],
    security([]),
    responses(
        (status = 200, description = "Server is alive"),
        (status = 503, description = "Server is shutting down")
    )
)]
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    probe_response(state.is_alive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::http::header::CACHE_CONTROL;
    use actix_web::{App, test as actix_test};
    use rstest::rstest;

    async fn probe(state: web::Data<HealthState>, path: &str) -> (StatusCode, Option<String>) {
        let app = actix_test::init_service(App::new().app_data(state).service(ready).service(live)).await;
        let res = actix_test::call_service(&app, actix_test::TestRequest::get().uri(path).to_request()).await;
        let cache = res
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        (res.status(), cache)
    }

    #[rstest]
    #[case("/health/ready", StatusCode::SERVICE_UNAVAILABLE)]
    #[case("/health/live", StatusCode::OK)]
    #[actix_web::test]
    async fn fresh_state_is_live_but_not_ready(#[case] path: &str, #[case] expected: StatusCode) {
        let (status, cache) = probe(web::Data::new(HealthState::new()), path).await;
        assert_eq!(status, expected);
        assert_eq!(cache.as_deref(), Some("no-store"));
    }

    #[actix_web::test]
    async fn ready_after_marking() {
        let state = web::Data::new(HealthState::new());
        state.mark_ready();
        let (status, _) = probe(state, "/health/ready").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[rstest]
    #[case("/health/ready")]
    #[case("/health/live")]
    #[actix_web::test]
    async fn draining_fails_both_probes(#[case] path: &str) {
        let state = web::Data::new(HealthState::new());
        state.mark_ready();
        state.mark_unhealthy();
        let (status, _) = probe(state, path).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
