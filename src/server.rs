//!
//! thingamabob HTTP server
//! -----------------------
//! Axum-based HTTP API for the thingamabob collection.
//!
//! Responsibilities:
//! - Cookie-backed sessions over a pluggable backend (memory or Redis).
//! - App-wide CSRF guard: mint a per-session token on safe methods, require
//!   the double-submit header on mutating methods before any handler runs.
//! - Login/logout/status endpoints backed by the `identity` module.
//! - Role-gated CRUD over the shared `ThingamabobStore`.
//! - Demo row seeding on an empty store and startup logs.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use tracing::info;

use crate::config::{self, SessionStoreConfig};
use crate::error::{AppError, AppResult};
use crate::identity::{
    authorize, AuthService, AuthStatus, LoginRequest, MemoryBackend, RedisBackend, Session,
    SessionBackend, SessionManager,
};
use crate::security::UserDirectory;
use crate::store::{Thingamabob, ThingamabobStore};

const SESSION_COOKIE: &str = "thingamabob_session";
const CSRF_COOKIE: &str = "thingamabob_csrf";
const CSRF_HEADER: &str = "x-csrf-token";

/// Cookie attribute flags. The session cookie defaults to HttpOnly while the
/// CSRF cookie stays script-readable for the double-submit pattern; the two
/// are configured independently, not through a single toggle.
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    pub session_http_only: bool,
    pub csrf_http_only: bool,
    /// Set to true behind TLS.
    pub secure: bool,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            session_http_only: true,
            csrf_http_only: false,
            secure: false,
        }
    }
}

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: ThingamabobStore,
    pub sessions: SessionManager,
    pub auth: AuthService,
    pub cookies: CookiePolicy,
}

impl AppState {
    pub fn new(backend: Arc<dyn SessionBackend>, directory: UserDirectory) -> Self {
        let sessions = SessionManager::new(backend);
        Self {
            store: ThingamabobStore::new(),
            auth: AuthService::new(Arc::new(directory), sessions.clone()),
            sessions,
            cookies: CookiePolicy::default(),
        }
    }
}

/// Start the thingamabob server: resolve the session backend from the
/// environment (fatal on a malformed descriptor), seed demo rows, bind and
/// serve.
pub async fn run() -> anyhow::Result<()> {
    let backend_cfg = SessionStoreConfig::from_env()?;
    let backend = build_session_backend(&backend_cfg).await?;
    let directory = UserDirectory::with_default_users()?;
    let state = AppState::new(backend, directory);
    seed_demo_thingamabobs(&state.store);
    serve(state, config::http_port()).await
}

pub async fn build_session_backend(
    cfg: &SessionStoreConfig,
) -> anyhow::Result<Arc<dyn SessionBackend>> {
    match cfg {
        SessionStoreConfig::Memory => {
            info!("using in-memory session store");
            Ok(Arc::new(MemoryBackend::default()))
        }
        SessionStoreConfig::Redis(rc) => {
            info!(host = %rc.host, port = rc.port, database = rc.database, "using redis session store");
            Ok(Arc::new(RedisBackend::connect(rc).await?))
        }
    }
}

/// Two demo rows on an empty store, reproducing the original boot state
/// (ids 1 and 2, next id 3).
pub fn seed_demo_thingamabobs(store: &ThingamabobStore) {
    if !store.is_empty() {
        return;
    }
    store.create("Thingamabob 1");
    store.create("Thingamabob 2");
}

async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}

/// Build the full API router over the given state.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/", get(hello))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/status", get(auth_status))
        .route(
            "/api/thingamabob",
            get(list_thingamabobs).post(create_thingamabob),
        )
        .route(
            "/api/thingamabob/{id}",
            get(get_thingamabob)
                .put(update_thingamabob)
                .delete(delete_thingamabob),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_guard,
        ))
        .with_state(state)
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get(header::COOKIE)?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name {
                return Some(v[1..].to_string());
            }
        }
    }
    None
}

fn cookie_value(name: &str, value: &str, http_only: bool, secure: bool) -> HeaderValue {
    let mut cookie = format!("{name}={value}; SameSite=Lax; Path=/");
    if http_only {
        cookie.push_str("; HttpOnly");
    }
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).unwrap()
}

fn clear_cookie(name: &str, http_only: bool, secure: bool) -> HeaderValue {
    let mut cookie =
        format!("{name}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; SameSite=Lax; Path=/");
    if http_only {
        cookie.push_str("; HttpOnly");
    }
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).unwrap()
}

/// App-wide session + CSRF guard.
///
/// Every request gets its session loaded (or created) here and stashed as a
/// request extension. Mutating methods must present the double-submit header
/// matching the session's token and are rejected with 403 before any handler
/// logic; safe methods mint the token on first need and re-issue the CSRF
/// cookie. The store lock is never taken while this session I/O is in flight.
async fn session_guard(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let presented = parse_cookie(req.headers(), SESSION_COOKIE);
    let mut session = match state.sessions.get_or_create(presented.as_deref()).await {
        Ok(s) => s,
        Err(e) => return AppError::Backend(e).into_response(),
    };

    let mutating =
        [Method::POST, Method::PUT, Method::DELETE, Method::PATCH].contains(req.method());
    let mut minted = None;
    if mutating {
        let provided = req
            .headers()
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if !SessionManager::csrf_matches(&session, provided.as_deref()) {
            return AppError::Csrf("missing or invalid csrf token").into_response();
        }
    } else {
        match state.sessions.ensure_csrf(&mut session).await {
            Ok(token) => minted = Some(token),
            Err(e) => return AppError::Backend(e).into_response(),
        }
    }

    let fresh = session.fresh;
    let sid = session.id.clone();
    req.extensions_mut().insert(session);
    let mut res = next.run(req).await;

    let policy = state.cookies;
    if fresh {
        res.headers_mut().append(
            header::SET_COOKIE,
            cookie_value(SESSION_COOKIE, &sid, policy.session_http_only, policy.secure),
        );
    }
    if let Some(token) = minted {
        res.headers_mut().append(
            header::SET_COOKIE,
            cookie_value(CSRF_COOKIE, &token, policy.csrf_http_only, policy.secure),
        );
    }
    res
}

async fn hello() -> &'static str {
    "Hello, World 👋!"
}

async fn login(
    State(state): State<AppState>,
    Extension(mut session): Extension<Session>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(payload)) = payload else {
        return AppError::validation("malformed login body").into_response();
    };
    match state.auth.login(&mut session, &payload).await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        // Failed logins report only {"loggedIn": false}, never which check failed.
        Err(AppError::Auth) => {
            (StatusCode::UNAUTHORIZED, Json(AuthStatus::logged_out())).into_response()
        }
        Err(e) => e.into_response(),
    }
}

async fn logout(State(state): State<AppState>, Extension(session): Extension<Session>) -> Response {
    match state.auth.logout(&session).await {
        Ok(status) => {
            let mut res = (StatusCode::OK, Json(status)).into_response();
            res.headers_mut().append(
                header::SET_COOKIE,
                clear_cookie(
                    SESSION_COOKIE,
                    state.cookies.session_http_only,
                    state.cookies.secure,
                ),
            );
            res
        }
        Err(e) => e.into_response(),
    }
}

async fn auth_status(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Json<AuthStatus> {
    Json(state.auth.status(&session))
}

#[derive(Debug, Deserialize)]
struct NamePayload {
    name: String,
}

fn parse_id(raw: &str) -> AppResult<u64> {
    raw.parse()
        .map_err(|_| AppError::validation(format!("invalid thingamabob id: {raw}")))
}

async fn list_thingamabobs(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> AppResult<Json<Vec<Thingamabob>>> {
    authorize(&session.record, &[])?;
    Ok(Json(state.store.list()))
}

async fn get_thingamabob(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> AppResult<Json<Thingamabob>> {
    authorize(&session.record, &[])?;
    let id = parse_id(&id)?;
    state
        .store
        .get(id)
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("thingamabob {id} not found")))
}

async fn create_thingamabob(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    payload: Result<Json<NamePayload>, JsonRejection>,
) -> AppResult<Json<Thingamabob>> {
    // Role gate first: non-admins get 401 regardless of body validity.
    authorize(&session.record, &["admin"])?;
    let Json(payload) = payload.map_err(|_| AppError::validation("malformed thingamabob body"))?;
    Ok(Json(state.store.create(payload.name)))
}

async fn update_thingamabob(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    payload: Result<Json<NamePayload>, JsonRejection>,
) -> AppResult<Json<Thingamabob>> {
    authorize(&session.record, &["admin"])?;
    let id = parse_id(&id)?;
    let Json(payload) = payload.map_err(|_| AppError::validation("malformed thingamabob body"))?;
    state
        .store
        .update(id, payload.name)
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("thingamabob {id} not found")))
}

async fn delete_thingamabob(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    authorize(&session.record, &["admin"])?;
    let id = parse_id(&id)?;
    if state.store.delete(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(format!("thingamabob {id} not found")))
    }
}
