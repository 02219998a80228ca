//! HTTP server assembly: session cookies, API scope and probes.

mod config;
mod state_builders;

pub use config::{AppSettings, ServerConfig};

use state_builders::build_http_state;

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::header::{CacheControl, CacheDirective};
use actix_web::middleware::DefaultHeaders;
use actix_web::{App, HttpServer, Scope, web};

use careplan::Trace;
#[cfg(debug_assertions)]
use careplan::doc::ApiDoc;
use careplan::inbound::http::configure;
use careplan::inbound::http::health::{HealthState, live, ready};
use careplan::inbound::http::session_config::SessionSettings;
use careplan::inbound::http::state::HttpState;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

const SESSION_COOKIE: &str = "session";

/// Encrypted cookie sessions; nothing is stored server side.
fn session_middleware(session: &SessionSettings) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), session.key.clone())
        .cookie_name(SESSION_COOKIE.to_owned())
        .cookie_path("/".to_owned())
        .cookie_secure(session.cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(session.same_site)
        .session_lifecycle(PersistentSession::default().session_ttl(session.ttl))
        .build()
}

/// Per-user responses under `/api/v1`. Handlers may still override the
/// cache policy.
fn api_scope(session: &SessionSettings) -> Scope<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    > + use<>,
> {
    let no_cache = CacheControl(vec![
        CacheDirective::Private,
        CacheDirective::NoCache,
        CacheDirective::MustRevalidate,
    ]);
    web::scope("/api/v1")
        .wrap(DefaultHeaders::new().add(no_cache))
        .wrap(session_middleware(session))
        .configure(configure)
}

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    session: SessionSettings,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .service(api_scope(&session))
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Bind the listener over the configured database and start serving.
///
/// `health_state` turns ready once the socket is bound.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let ServerConfig {
        session,
        bind_addr,
        db_pool,
    } = config;
    let http_state = build_http_state(&db_pool);
    let probes = health_state.clone();

    let server = HttpServer::new(move || {
        build_app(probes.clone(), http_state.clone(), session.clone())
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::time::Duration;

    use actix_web::cookie::{Key, SameSite};
    use actix_web::http::StatusCode;
    use actix_web::http::header::CACHE_CONTROL;
    use careplan::test_support::{MemoryStore, http_state};
    use mockable::DefaultClock;
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn session() -> SessionSettings {
        SessionSettings {
            key: Key::generate(),
            cookie_secure: false,
            same_site: SameSite::Lax,
            ttl: actix_web::cookie::time::Duration::hours(2),
        }
    }

    /// Serve the assembled app on an ephemeral port, as `create_server` does.
    fn serve(health: web::Data<HealthState>, session: SessionSettings) -> (String, Server) {
        let store = Arc::new(MemoryStore::new());
        let state = web::Data::new(http_state(&store, Arc::new(DefaultClock)));
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local address");
        let server = HttpServer::new(move || {
            build_app(health.clone(), state.clone(), session.clone())
        })
        .listen(listener)
        .expect("listen")
        .disable_signals()
        .workers(1)
        .shutdown_timeout(1)
        .run();
        (format!("http://{addr}"), server)
    }

    #[rstest]
    #[actix_web::test]
    async fn api_responses_are_private_and_uncached(session: SessionSettings) {
        let health = web::Data::new(HealthState::new());
        health.mark_ready();
        let (base, server) = serve(health, session);
        let handle = server.handle();
        actix_web::rt::spawn(server);

        let client = awc::Client::builder().timeout(Duration::from_secs(5)).finish();
        let me = client
            .get(format!("{base}/api/v1/users/me"))
            .send()
            .await
            .expect("users/me request");
        assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            me.headers()
                .get(CACHE_CONTROL)
                .and_then(|value| value.to_str().ok()),
            Some("private, no-cache, must-revalidate")
        );

        let ready_response = client
            .get(format!("{base}/health/ready"))
            .send()
            .await
            .expect("readiness request");
        assert_eq!(ready_response.status(), StatusCode::OK);
        assert_eq!(
            ready_response
                .headers()
                .get(CACHE_CONTROL)
                .and_then(|value| value.to_str().ok()),
            Some("no-store")
        );

        handle.stop(true).await;
    }

    #[rstest]
    #[actix_web::test]
    async fn probes_follow_the_shared_health_state(session: SessionSettings) {
        let health = web::Data::new(HealthState::new());
        let (base, server) = serve(health.clone(), session);
        let handle = server.handle();
        actix_web::rt::spawn(server);
        let client = awc::Client::default();

        let status = |path: &'static str| {
            let request = client.get(format!("{base}{path}"));
            async move { request.send().await.expect("probe request").status() }
        };
        assert_eq!(status("/health/ready").await, StatusCode::SERVICE_UNAVAILABLE);
        health.mark_ready();
        assert_eq!(status("/health/ready").await, StatusCode::OK);
        health.mark_unhealthy();
        assert_eq!(status("/health/live").await, StatusCode::SERVICE_UNAVAILABLE);

        handle.stop(true).await;
    }
}
