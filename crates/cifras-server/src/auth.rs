//! Admin session auth and the local-network guard.
//!
//! An admin logs in once with the configured username and password; the
//! server answers with a random session token, also set as an `HttpOnly`
//! cookie. Later admin calls present the token either as
//! `Authorization: Bearer <token>` or through the cookie. When both are
//! present the bearer token is the one checked.

use std::{
  collections::HashSet,
  net::{IpAddr, SocketAddr},
  sync::Arc,
};

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  Json,
  extract::{ConnectInfo, FromRequestParts, Request, State},
  http::{HeaderMap, StatusCode, header, request::Parts},
  middleware::Next,
  response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand_core::{OsRng, RngCore};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::Error;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "cifras_session";

const TOKEN_BYTES: usize = 32;

/// Credentials accepted for the admin surface.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`. Empty disables
  /// login.
  pub password_hash: String,
}

impl AuthConfig {
  pub fn verify(&self, username: &str, password: &str) -> Result<(), Error> {
    if username != self.username {
      return Err(Error::Unauthorized);
    }
    let parsed = PasswordHash::new(&self.password_hash).map_err(|_| Error::Unauthorized)?;
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .map_err(|_| Error::Unauthorized)
  }
}

/// PHC string for `admin_password_hash`, with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

// ─── Sessions ─────────────────────────────────────────────────────────────────

/// Tokens issued by login and not yet revoked. Lives for the process only.
#[derive(Clone, Default)]
pub struct Sessions(Arc<Mutex<HashSet<String>>>);

impl Sessions {
  pub async fn issue(&self) -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let token = URL_SAFE_NO_PAD.encode(bytes);
    self.0.lock().await.insert(token.clone());
    token
  }

  pub async fn contains(&self, token: &str) -> bool { self.0.lock().await.contains(token) }

  /// Returns whether the token was live.
  pub async fn revoke(&self, token: &str) -> bool { self.0.lock().await.remove(token) }
}

/// Everything the admin guards need; the state of the auth routes and
/// middleware.
#[derive(Clone)]
pub struct AdminGate {
  /// When set, every admin endpoint answers 403.
  pub production:  bool,
  pub credentials: Arc<AuthConfig>,
  pub sessions:    Sessions,
}

impl AdminGate {
  pub fn new(credentials: AuthConfig, production: bool) -> Self {
    Self { production, credentials: Arc::new(credentials), sessions: Sessions::default() }
  }
}

// ─── Request inspection ───────────────────────────────────────────────────────

/// Loopback (v4 or v6) or an RFC 1918 IPv4 address.
pub fn is_local(ip: IpAddr) -> bool {
  match ip.to_canonical() {
    IpAddr::V4(v4) => v4.is_loopback() || v4.is_private(),
    IpAddr::V6(v6) => v6.is_loopback(),
  }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Bearer ")
    .map(str::trim)
}

fn cookie(headers: &HeaderMap) -> Option<&str> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(name, _)| *name == SESSION_COOKIE)
    .map(|(_, value)| value)
}

/// The token a request presents: bearer first, cookie otherwise.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
  bearer(headers).or_else(|| cookie(headers)).filter(|t| !t.is_empty())
}

fn session_cookie(token: &str, max_age: Option<u32>) -> String {
  let mut c = format!("{SESSION_COOKIE}={token}; Path=/api/admin; HttpOnly; SameSite=Strict");
  if let Some(age) = max_age {
    c.push_str(&format!("; Max-Age={age}"));
  }
  c
}

// ─── Extractors ───────────────────────────────────────────────────────────────

/// Present in a handler or middleware means the request came from the local
/// network and the server is not in production mode.
pub struct LocalNetwork;

impl FromRequestParts<AdminGate> for LocalNetwork {
  type Rejection = Error;

  async fn from_request_parts(parts: &mut Parts, gate: &AdminGate) -> Result<Self, Error> {
    if gate.production {
      return Err(Error::Forbidden("administración deshabilitada en producción"));
    }
    let ConnectInfo(addr) = ConnectInfo::<SocketAddr>::from_request_parts(parts, gate)
      .await
      .map_err(|_| Error::Forbidden("dirección remota desconocida"))?;
    if !is_local(addr.ip()) {
      warn!(remote = %addr, "admin request from outside the local network");
      return Err(Error::Forbidden("administración solo desde la red local"));
    }
    Ok(LocalNetwork)
  }
}

/// Present means the request carries a live session token.
pub struct AdminSession;

impl FromRequestParts<AdminGate> for AdminSession {
  type Rejection = Error;

  async fn from_request_parts(parts: &mut Parts, gate: &AdminGate) -> Result<Self, Error> {
    let token = session_token(&parts.headers).ok_or(Error::Unauthorized)?;
    if gate.sessions.contains(token).await {
      Ok(AdminSession)
    } else {
      Err(Error::Unauthorized)
    }
  }
}

// ─── Middleware ───────────────────────────────────────────────────────────────

pub async fn require_local(_: LocalNetwork, req: Request, next: Next) -> Response {
  next.run(req).await
}

pub async fn require_session(_: AdminSession, req: Request, next: Next) -> Response {
  next.run(req).await
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct Login {
  pub username: String,
  pub password: String,
}

/// `POST /api/admin/login`, body: `{"username":"..","password":".."}`
pub async fn login(
  State(gate): State<AdminGate>,
  Json(body): Json<Login>,
) -> Result<Response, Error> {
  if let Err(e) = gate.credentials.verify(&body.username, &body.password) {
    warn!(username = %body.username, "admin login rejected");
    return Err(e);
  }
  let token = gate.sessions.issue().await;
  info!(username = %body.username, "admin session opened");
  Ok(
    (
      [(header::SET_COOKIE, session_cookie(&token, None))],
      Json(json!({ "token": token })),
    )
      .into_response(),
  )
}

/// `POST /api/admin/logout`: revokes the presented token, if any.
pub async fn logout(State(gate): State<AdminGate>, headers: HeaderMap) -> Response {
  if let Some(token) = session_token(&headers)
    && gate.sessions.revoke(token).await
  {
    info!("admin session closed");
  }
  (StatusCode::NO_CONTENT, [(header::SET_COOKIE, session_cookie("", Some(0)))]).into_response()
}

/// `GET /api/admin/check`
pub async fn check(State(gate): State<AdminGate>, headers: HeaderMap) -> Json<serde_json::Value> {
  let authenticated = match session_token(&headers) {
    Some(token) => gate.sessions.contains(token).await,
    None => false,
  };
  Json(json!({ "authenticated": authenticated }))
}

#[cfg(test)]
mod tests {
  use std::net::{Ipv4Addr, Ipv6Addr};

  use axum::http::HeaderValue;

  use super::*;

  fn hashed(password: &str) -> AuthConfig {
    AuthConfig { username: "admin".to_string(), password_hash: hash_password(password).unwrap() }
  }

  fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
    let mut h = HeaderMap::new();
    for (k, v) in pairs {
      h.append(k.clone(), HeaderValue::from_str(v).unwrap());
    }
    h
  }

  #[test]
  fn verifies_username_and_password() {
    let auth = hashed("secret");
    assert!(auth.verify("admin", "secret").is_ok());
    assert!(matches!(auth.verify("admin", "wrong"), Err(Error::Unauthorized)));
    assert!(matches!(auth.verify("root", "secret"), Err(Error::Unauthorized)));
  }

  #[test]
  fn empty_hash_disables_login() {
    let auth = AuthConfig { username: "admin".into(), password_hash: String::new() };
    assert!(matches!(auth.verify("admin", ""), Err(Error::Unauthorized)));
  }

  #[test]
  fn local_addresses() {
    assert!(is_local(IpAddr::V4(Ipv4Addr::LOCALHOST)));
    assert!(is_local(IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3))));
    assert!(is_local(IpAddr::V4(Ipv4Addr::new(172, 20, 0, 1))));
    assert!(is_local(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 40))));
    assert!(is_local(IpAddr::V6(Ipv6Addr::LOCALHOST)));
    assert!(is_local(IpAddr::V6(Ipv4Addr::new(192, 168, 0, 9).to_ipv6_mapped())));

    assert!(!is_local(IpAddr::V4(Ipv4Addr::new(172, 32, 0, 1))));
    assert!(!is_local(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))));
    assert!(!is_local(IpAddr::V6("2001:db8::1".parse().unwrap())));
  }

  #[test]
  fn bearer_wins_over_cookie() {
    let h = headers(&[
      (header::AUTHORIZATION, "Bearer from-header"),
      (header::COOKIE, "theme=dark; cifras_session=from-cookie"),
    ]);
    assert_eq!(session_token(&h), Some("from-header"));

    let h = headers(&[(header::COOKIE, "theme=dark; cifras_session=from-cookie")]);
    assert_eq!(session_token(&h), Some("from-cookie"));

    let h = headers(&[(header::AUTHORIZATION, "Basic abc"), (header::COOKIE, "theme=dark")]);
    assert_eq!(session_token(&h), None);
  }

  #[tokio::test]
  async fn sessions_issue_and_revoke() {
    let sessions = Sessions::default();
    let a = sessions.issue().await;
    let b = sessions.issue().await;
    assert_ne!(a, b);
    assert_eq!(a.len(), 43);
    assert!(sessions.contains(&a).await);
    assert!(sessions.revoke(&a).await);
    assert!(!sessions.contains(&a).await);
    assert!(!sessions.revoke(&a).await);
    assert!(sessions.contains(&b).await);
  }
}
