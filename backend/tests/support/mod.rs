//! Live-server harness shared by the behaviour suites.
//!
//! The harness owns a single-threaded Tokio runtime plus a `LocalSet` because
//! Actix uses `spawn_local` internally. [`WorldFixture`] stops the server even
//! if a scenario panics. Accounts are addressed by a short alias (`alice`)
//! that expands to `alice@example.com`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::net::TcpListener;
use std::rc::Rc;
use std::sync::Arc;

use actix_session::SessionMiddleware;
use actix_session::config::{CookieContentSecurity, PersistentSession};
use actix_session::storage::CookieSessionStore;
use actix_web::cookie::{Key, SameSite, time::Duration as CookieDuration};
use actix_web::dev::ServerHandle;
use actix_web::http::{Method, header};
use actix_web::{App, HttpServer, web};
use awc::Client;
use careplan::Trace;
use careplan::domain::Role;
use careplan::inbound::http::configure;
use careplan::middleware::trace::TRACE_ID_HEADER;
use careplan::test_support::{MemoryStore, MutableClock, http_state, seed_user};
use chrono::{TimeZone, Utc};
use mockable::Clock;
use serde_json::{Value, json};
use tokio::runtime::Runtime;
use tokio::task::LocalSet;

pub mod steps;

pub const PASSWORD: &str = "correct horse";

pub struct CareWorld {
    runtime: Runtime,
    local: LocalSet,
    base_url: String,
    server: ServerHandle,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<MutableClock>,
    pub cookies: HashMap<String, String>,
    pub ids: HashMap<String, String>,
    pub last_status: Option<u16>,
    pub last_body: Option<Value>,
    pub last_trace_id: Option<String>,
}

pub type SharedWorld = Rc<RefCell<CareWorld>>;

pub struct WorldFixture {
    world: SharedWorld,
}

impl WorldFixture {
    pub fn world(&self) -> SharedWorld {
        self.world.clone()
    }
}

impl Drop for WorldFixture {
    fn drop(&mut self) {
        // The future must not borrow the world; `block_on` already holds it.
        let ctx = self.world.borrow();
        let server = ctx.server.clone();
        ctx.local.block_on(&ctx.runtime, async move {
            server.stop(true).await;
        });
    }
}

/// Start a server over a fresh in-memory store, frozen at 2026-03-02 09:00 UTC.
pub fn world() -> WorldFixture {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");
    let local = LocalSet::new();
    let store = Arc::new(MemoryStore::new());
    let start = Utc
        .with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
        .single()
        .expect("fixture instant");
    let clock = Arc::new(MutableClock::new(start));
    let state = http_state(&store, clock.clone());
    let (base_url, server) = local
        .block_on(&runtime, async move { spawn_server(state).await })
        .expect("spawn server");

    WorldFixture {
        world: Rc::new(RefCell::new(CareWorld {
            runtime,
            local,
            base_url,
            server,
            store,
            clock,
            cookies: HashMap::new(),
            ids: HashMap::new(),
            last_status: None,
            last_body: None,
            last_trace_id: None,
        })),
    }
}

fn session_middleware(key: Key) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".to_owned())
        .cookie_path("/".to_owned())
        .cookie_secure(false)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(SameSite::Lax)
        .session_lifecycle(PersistentSession::default().session_ttl(CookieDuration::hours(2)))
        .build()
}

async fn spawn_server(
    state: careplan::inbound::http::state::HttpState,
) -> Result<(String, ServerHandle), String> {
    let key = Key::generate();
    let listener = TcpListener::bind("127.0.0.1:0").map_err(|err| err.to_string())?;
    let addr = listener.local_addr().map_err(|err| err.to_string())?;
    let data = web::Data::new(state);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(Trace)
            .service(
                web::scope("/api/v1")
                    .wrap(session_middleware(key.clone()))
                    .configure(configure),
            )
    })
    .disable_signals()
    .workers(1)
    .listen(listener)
    .map_err(|err| err.to_string())?
    .run();

    let handle = server.handle();
    actix_web::rt::spawn(server);
    Ok((format!("http://{addr}"), handle))
}

pub fn email(alias: &str) -> String {
    format!("{alias}@example.com")
}

struct Reply {
    status: u16,
    trace_id: Option<String>,
    body: Value,
    cookie: Option<String>,
}

fn send(
    world: &SharedWorld,
    method: Method,
    path: &str,
    cookie: Option<String>,
    payload: Option<Value>,
) -> Reply {
    let ctx = world.borrow();
    let url = format!("{}{path}", ctx.base_url);
    ctx.local.block_on(&ctx.runtime, async move {
        let mut request = Client::default().request(method, url);
        if let Some(cookie) = cookie {
            request = request.insert_header((header::COOKIE, cookie));
        }
        let mut response = match payload {
            Some(payload) => request.send_json(&payload).await,
            None => request.send().await,
        }
        .expect("request should reach the server");
        let header_value = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
        };
        let trace_id = header_value(TRACE_ID_HEADER);
        let cookie = header_value(header::SET_COOKIE.as_str())
            .and_then(|value| value.split(';').next().map(str::to_owned));
        let status = response.status().as_u16();
        let bytes = response.body().await.expect("response body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON body")
        };
        Reply {
            status,
            trace_id,
            body,
            cookie,
        }
    })
}

/// Issue a request as `alias` (or anonymously) and record the outcome.
pub fn request(
    world: &SharedWorld,
    alias: Option<&str>,
    method: Method,
    path: &str,
    payload: Option<Value>,
) -> Value {
    let cookie = alias.map(|alias| {
        world
            .borrow()
            .cookies
            .get(alias)
            .cloned()
            .unwrap_or_else(|| panic!("{alias} has no session"))
    });
    let reply = send(world, method, path, cookie, payload);
    let mut ctx = world.borrow_mut();
    ctx.last_status = Some(reply.status);
    ctx.last_trace_id = reply.trace_id;
    ctx.last_body = Some(reply.body.clone());
    reply.body
}

/// Register `alias` with `role`, sign in and keep the session cookie.
pub fn register(world: &SharedWorld, alias: &str, role: &str) {
    let payload = json!({
        "email": email(alias),
        "password": PASSWORD,
        "displayName": email(alias),
        "role": role,
    });
    let reply = send(world, Method::POST, "/api/v1/auth/register", None, Some(payload));
    assert_eq!(reply.status, 201, "register {alias}: {}", reply.body);
    let id = reply.body["id"].as_str().expect("user id").to_owned();
    world.borrow_mut().ids.insert(alias.to_owned(), id);
    sign_in(world, alias);
}

/// Seed an operator account directly and sign in.
pub fn seed_operator(world: &SharedWorld, alias: &str) {
    let user = {
        let ctx = world.borrow();
        let store = ctx.store.clone();
        let now = ctx.clock.utc();
        let address = email(alias);
        ctx.local
            .block_on(&ctx.runtime, async move {
                seed_user(&store, &address, PASSWORD, Role::SuperAdmin, now).await
            })
            .expect("seed operator")
    };
    world
        .borrow_mut()
        .ids
        .insert(alias.to_owned(), user.id.to_string());
    sign_in(world, alias);
}

pub fn sign_in(world: &SharedWorld, alias: &str) {
    let payload = json!({ "email": email(alias), "password": PASSWORD });
    let reply = send(world, Method::POST, "/api/v1/auth/login", None, Some(payload));
    assert_eq!(reply.status, 200, "login {alias}");
    let cookie = reply.cookie.expect("session cookie");
    world.borrow_mut().cookies.insert(alias.to_owned(), cookie);
}

pub fn id_of(world: &SharedWorld, alias: &str) -> String {
    world
        .borrow()
        .ids
        .get(alias)
        .cloned()
        .unwrap_or_else(|| panic!("no id recorded for {alias}"))
}

pub fn last_status(world: &SharedWorld) -> u16 {
    world.borrow().last_status.expect("a request was made")
}

pub fn last_body(world: &SharedWorld) -> Value {
    world.borrow().last_body.clone().expect("a request was made")
}

/// A three-day protocol with a stretch on day 1 and journaling on day 3.
pub fn mobility_protocol() -> Value {
    json!({
        "title": "Morning mobility",
        "durationDays": 3,
        "days": [
            {
                "dayNumber": 1,
                "sessions": [{
                    "title": "Warm up",
                    "timeOfDay": "MORNING",
                    "tasks": [{ "id": STRETCH_TASK, "title": "Stretch", "kind": "EXERCISE" }]
                }]
            },
            {
                "dayNumber": 3,
                "sessions": [{
                    "title": "Reflect",
                    "timeOfDay": "EVENING",
                    "tasks": [{ "id": JOURNAL_TASK, "title": "Journal", "kind": "REFLECTION" }]
                }]
            }
        ]
    })
}

pub const STRETCH_TASK: &str = "7d1c5f0e-93a8-4b0e-8a53-4f3bb1a1f001";
pub const JOURNAL_TASK: &str = "7d1c5f0e-93a8-4b0e-8a53-4f3bb1a1f002";
