//! WebDAV/CardDAV protocol layer for Kith.
//!
//! Exposes an axum [`Router`] implementing the CardDAV protocol (RFC 6352)
//! backed by any [`ContactStore`].

pub mod auth;
pub mod diff;
pub mod error;
pub mod etag;
pub mod handlers;
pub mod xml;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  body::Body,
  extract::{Request, State},
  http::{Method, StatusCode},
  response::{IntoResponse, Response},
  routing::any,
};
use bytes::Bytes;
use kith_core::store::ContactStore;
use serde::Deserialize;

use auth::{AuthConfig, verify_auth};
use handlers::{delete, get, options, propfind, put};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub base_url:           String,
  pub addressbook:        String,
  pub store_path:         PathBuf,
  pub auth_username:      String,
  pub auth_password_hash: String,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: ContactStore> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  pub auth:   Arc<AuthConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build an axum [`Router`] for the CardDAV server.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ContactStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    .route("/dav/",                               any(dav_root_handler::<S>))
    .route("/dav/addressbooks/",                  any(dav_home_handler::<S>))
    .route("/dav/addressbooks/{ab}/",             any(dav_collection_handler::<S>))
    .route("/dav/addressbooks/{ab}/{uid_vcf}",    any(dav_resource_handler::<S>))
    .route("/dav/{*path}",                        any(dav_wildcard_handler::<S>))
    .with_state(state)
}

// ─── Dispatch helpers ────────────────────────────────────────────────────────

/// Return `Some(401 response)` if auth is required but fails.
/// OPTIONS skips auth.
fn check_auth<S>(
  method: &Method,
  req:    &Request<Body>,
  state:  &AppState<S>,
) -> Option<Response>
where
  S: ContactStore + Clone + Send + Sync + 'static,
{
  if method == Method::OPTIONS {
    return None;
  }
  match verify_auth(req.headers(), &state.auth) {
    Ok(_)  => None,
    Err(e) => Some(e.into_response()),
  }
}

async fn collect_body(req: Request<Body>) -> Result<Bytes, Response> {
  axum::body::to_bytes(req.into_body(), 8 * 1024 * 1024)
    .await
    .map_err(|_| {
      (StatusCode::PAYLOAD_TOO_LARGE, "request body too large")
        .into_response()
    })
}

/// GET handler helper: extract ab and uid_vcf from URI path.
fn path_segments_2(uri: &axum::http::Uri) -> Option<(String, String)> {
  let path = uri.path();
  // Expect: /dav/addressbooks/{ab}/{uid_vcf}
  let parts: Vec<&str> = path.trim_end_matches('/').splitn(6, '/').collect();
  if parts.len() >= 5 {
    Some((parts[3].to_string(), parts[4].to_string()))
  } else {
    None
  }
}

fn path_segment_ab(uri: &axum::http::Uri) -> Option<String> {
  let path = uri.path();
  let parts: Vec<&str> = path.trim_end_matches('/').splitn(5, '/').collect();
  if parts.len() >= 4 {
    Some(parts[3].to_string())
  } else {
    None
  }
}

fn depth_from_req(req: &Request<Body>) -> u8 {
  req.headers()
    .get("depth")
    .and_then(|v| v.to_str().ok())
    .and_then(|s| s.parse().ok())
    .unwrap_or(0)
}

// ─── Route handlers ──────────────────────────────────────────────────────────

async fn dav_root_handler<S>(
  State(state): State<AppState<S>>,
  req: Request<Body>,
) -> Response
where
  S: ContactStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let method = req.method().clone();
  if let Some(r) = check_auth(&method, &req, &state) { return r; }
  match method.as_str() {
    "OPTIONS"  => options::handler(),
    "PROPFIND" => {
      let body = match collect_body(req).await { Ok(b) => b, Err(e) => return e };
      propfind::principal(&state, &body).await.into_response_or_err()
    }
    _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
  }
}

async fn dav_home_handler<S>(
  State(state): State<AppState<S>>,
  req: Request<Body>,
) -> Response
where
  S: ContactStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let method = req.method().clone();
  if let Some(r) = check_auth(&method, &req, &state) { return r; }
  match method.as_str() {
    "OPTIONS"  => options::handler(),
    "PROPFIND" => {
      let body = match collect_body(req).await { Ok(b) => b, Err(e) => return e };
      propfind::home_set(&state, &body).await.into_response_or_err()
    }
    _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
  }
}

async fn dav_collection_handler<S>(
  State(state): State<AppState<S>>,
  req: Request<Body>,
) -> Response
where
  S: ContactStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let method = req.method().clone();
  if let Some(r) = check_auth(&method, &req, &state) { return r; }
  let depth = depth_from_req(&req);
  let ab    = match path_segment_ab(req.uri()) {
    Some(ab) => ab,
    None     => return (StatusCode::BAD_REQUEST, "cannot parse path").into_response(),
  };
  match method.as_str() {
    "OPTIONS"  => options::handler(),
    "PROPFIND" => {
      let body = match collect_body(req).await { Ok(b) => b, Err(e) => return e };
      propfind::collection(&state, &ab, depth, &body).await.into_response_or_err()
    }
    _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
  }
}

async fn dav_resource_handler<S>(
  State(state): State<AppState<S>>,
  req: Request<Body>,
) -> Response
where
  S: ContactStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let method = req.method().clone();
  if let Some(r) = check_auth(&method, &req, &state) { return r; }
  let (ab, uid_vcf) = match path_segments_2(req.uri()) {
    Some(p) => p,
    None    => return (StatusCode::BAD_REQUEST, "cannot parse path").into_response(),
  };
  let headers = req.headers().clone();
  match method.as_str() {
    "OPTIONS"  => options::handler(),
    "PROPFIND" => {
      let body = match collect_body(req).await { Ok(b) => b, Err(e) => return e };
      propfind::resource(&state, &ab, &uid_vcf, &body).await.into_response_or_err()
    }
    "GET"  => get::handler(&state, &method, &uid_vcf).await.into_response_or_err(),
    "HEAD" => get::handler(&state, &method, &uid_vcf).await.into_response_or_err(),
    "PUT"  => {
      let body_bytes = match collect_body(req).await { Ok(b) => b, Err(e) => return e };
      let body_str   = match std::str::from_utf8(&body_bytes) {
        Ok(s)  => s,
        Err(_) => return Error::BadRequest("body is not valid UTF-8".to_string()).into_response(),
      };
      put::handler(&state, &headers, &uid_vcf, body_str).await.into_response_or_err()
    }
    "DELETE" => delete::handler(&state, &uid_vcf).await.into_response_or_err(),
    _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
  }
}

async fn dav_wildcard_handler<S>(
  State(_state): State<AppState<S>>,
  req: Request<Body>,
) -> Response
where
  S: ContactStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if req.method() == Method::OPTIONS {
    options::handler()
  } else {
    StatusCode::NOT_FOUND.into_response()
  }
}

// ─── Helper trait ────────────────────────────────────────────────────────────

trait IntoResponseOrErr {
  fn into_response_or_err(self) -> Response;
}

impl IntoResponseOrErr for Result<Response, Error> {
  fn into_response_or_err(self) -> Response {
    match self {
      Ok(r)  => r,
      Err(e) => e.into_response(),
    }
  }
}

// ─── Integration tests ────────────────────────────────────────────────────────
