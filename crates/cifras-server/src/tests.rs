//! End-to-end routing tests: guards, sessions and the mounted API.

use std::{
  net::SocketAddr,
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{
  Router,
  body::Body,
  extract::connect_info::MockConnectInfo,
  http::{Request, StatusCode, header},
  response::Response,
};
use cifras_analytics::AnalyticsConfig;
use cifras_api::ApiState;
use cifras_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{AppState, ServerConfig, auth::hash_password, router};

const LAN: [u8; 4] = [192, 168, 1, 20];
const WAN: [u8; 4] = [203, 0, 113, 7];

fn config_from(toml: &str) -> ServerConfig {
  let source = config::File::from_str(toml, config::FileFormat::Toml);
  ServerConfig::from_builder(config::Config::builder().add_source(source)).unwrap()
}

async fn make_state(production: bool) -> AppState<SqliteStore> {
  let hash = hash_password("secret").unwrap();
  let cfg = config_from(&format!("admin_password_hash = {hash:?}\nproduction = {production}\n"));
  let store = SqliteStore::open_in_memory().await.unwrap();
  AppState {
    api:  ApiState::new(Arc::new(store), Arc::new(AnalyticsConfig::default())),
    gate: cfg.admin_gate(),
  }
}

fn app(state: &AppState<SqliteStore>, from: [u8; 4]) -> Router {
  router(state.clone()).layer(MockConnectInfo(SocketAddr::from((from, 40_000))))
}

async fn send(
  state: &AppState<SqliteStore>,
  from: [u8; 4],
  method: &str,
  uri: &str,
  headers: &[(header::HeaderName, &str)],
  body: Option<Value>,
) -> Response {
  let mut builder = Request::builder().method(method).uri(uri);
  for (k, v) in headers {
    builder = builder.header(k.clone(), *v);
  }
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  app(state, from).oneshot(builder.body(body).unwrap()).await.unwrap()
}

async fn json_of(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

async fn login(state: &AppState<SqliteStore>) -> String {
  let resp = send(
    state,
    LAN,
    "POST",
    "/api/admin/login",
    &[],
    Some(json!({ "username": "admin", "password": "secret" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  json_of(resp).await["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn public_endpoints_need_no_auth() {
  let state = make_state(false).await;
  let resp = send(&state, WAN, "GET", "/api/products", &[], None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_of(resp).await, json!([]));
}

#[tokio::test]
async fn admin_from_outside_the_lan_is_forbidden() {
  let state = make_state(false).await;
  let resp = send(
    &state,
    WAN,
    "POST",
    "/api/admin/login",
    &[],
    Some(json!({ "username": "admin", "password": "secret" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  assert!(json_of(resp).await["error"].is_string());
}

#[tokio::test]
async fn production_mode_closes_the_admin_surface() {
  let state = make_state(true).await;
  let resp = send(
    &state,
    [127, 0, 0, 1],
    "POST",
    "/api/admin/login",
    &[],
    Some(json!({ "username": "admin", "password": "secret" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  let resp = send(&state, LAN, "GET", "/api/ticker/ticker", &[], None).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn crud_requires_a_session() {
  let state = make_state(false).await;
  let resp = send(&state, LAN, "GET", "/api/admin/families", &[], None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let resp = send(
    &state,
    LAN,
    "GET",
    "/api/admin/families",
    &[(header::AUTHORIZATION, "Bearer made-up")],
    None,
  )
  .await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
  let state = make_state(false).await;
  let resp = send(
    &state,
    LAN,
    "POST",
    "/api/admin/login",
    &[],
    Some(json!({ "username": "admin", "password": "nope" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_sets_an_http_only_cookie() {
  let state = make_state(false).await;
  let resp = send(
    &state,
    LAN,
    "POST",
    "/api/admin/login",
    &[],
    Some(json!({ "username": "admin", "password": "secret" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let cookie = resp.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap().to_string();
  let token = json_of(resp).await["token"].as_str().unwrap().to_string();
  assert!(cookie.starts_with(&format!("cifras_session={token};")), "cookie: {cookie}");
  assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn session_lifecycle() {
  let state = make_state(false).await;
  let token = login(&state).await;
  let bearer = format!("Bearer {token}");
  let cookie = format!("cifras_session={token}");

  let resp = send(
    &state,
    LAN,
    "POST",
    "/api/admin/families",
    &[(header::AUTHORIZATION, bearer.as_str())],
    Some(json!({ "name": "Precios" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::CREATED);

  let resp =
    send(&state, LAN, "GET", "/api/admin/families", &[(header::COOKIE, cookie.as_str())], None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_of(resp).await[0]["name"], "Precios");

  let resp =
    send(&state, LAN, "GET", "/api/admin/check", &[(header::AUTHORIZATION, bearer.as_str())], None).await;
  assert_eq!(json_of(resp).await["authenticated"], true);

  let resp =
    send(&state, LAN, "POST", "/api/admin/logout", &[(header::COOKIE, cookie.as_str())], None).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);

  let resp =
    send(&state, LAN, "GET", "/api/admin/families", &[(header::AUTHORIZATION, bearer.as_str())], None)
      .await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let resp = send(&state, LAN, "GET", "/api/admin/check", &[(header::COOKIE, cookie.as_str())], None).await;
  assert_eq!(json_of(resp).await["authenticated"], false);
}

#[tokio::test]
async fn stale_bearer_is_not_rescued_by_cookie() {
  let state = make_state(false).await;
  let token = login(&state).await;
  let cookie = format!("cifras_session={token}");
  let resp = send(
    &state,
    LAN,
    "GET",
    "/api/admin/families",
    &[(header::AUTHORIZATION, "Bearer revoked"), (header::COOKIE, cookie.as_str())],
    None,
  )
  .await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// ─── Configuration ────────────────────────────────────────────────────────────

#[test]
fn empty_config_takes_defaults() {
  let cfg = config_from("");
  assert_eq!(cfg.address(), "127.0.0.1:8000");
  assert_eq!(cfg.store_path, PathBuf::from("cifras.db"));
  assert_eq!(cfg.admin_username, "admin");
  assert!(cfg.admin_password_hash.is_empty());
  assert!(!cfg.production);
}

#[test]
fn missing_config_file_is_not_an_error() {
  let cfg = ServerConfig::load(Path::new("/nonexistent/cifras.toml"));
  assert!(cfg.is_ok());
}

#[test]
fn store_path_expands_home() {
  let cfg = config_from("store_path = \"~/data/cifras.db\"\nport = 9100\n");
  assert_eq!(cfg.address(), "127.0.0.1:9100");
  match std::env::var("HOME") {
    Ok(home) => assert_eq!(cfg.resolved_store_path(), Path::new(&home).join("data/cifras.db")),
    Err(_) => assert_eq!(cfg.resolved_store_path(), PathBuf::from("~/data/cifras.db")),
  }
  assert_eq!(config_from("").resolved_store_path(), PathBuf::from("cifras.db"));
}
