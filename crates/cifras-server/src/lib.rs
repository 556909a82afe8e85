//! HTTP server assembly for Cifras.
//!
//! Wires the public and admin routers of `cifras-api` together with the
//! session auth and local-network guard from [`auth`], and adds request
//! tracing.

pub mod auth;
pub mod error;

pub use error::Error;

use std::path::{Path, PathBuf};

use axum::{
  Router,
  middleware,
  routing::{get, post},
};
use cifras_analytics::AnalyticsConfig;
use cifras_api::ApiState;
use cifras_core::store::SeriesStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::{AdminGate, AuthConfig};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `CIFRAS_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  #[serde(default = "default_admin_username")]
  pub admin_username:      String,
  #[serde(default)]
  pub admin_password_hash: String,
  #[serde(default)]
  pub production:          bool,
  #[serde(default)]
  pub analytics:           AnalyticsConfig,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8000 }

fn default_store_path() -> PathBuf { PathBuf::from("cifras.db") }

fn default_admin_username() -> String { "admin".to_string() }

impl ServerConfig {
  /// Read `path` if it exists, then let `CIFRAS_*` variables override it.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    Self::from_builder(
      config::Config::builder().add_source(config::File::from(path).required(false)),
    )
  }

  fn from_builder(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
  ) -> Result<Self, config::ConfigError> {
    builder
      .add_source(config::Environment::with_prefix("CIFRAS"))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  /// `store_path` with a leading `~/` replaced by `$HOME`.
  pub fn resolved_store_path(&self) -> PathBuf {
    let s = self.store_path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/")
      && let Ok(home) = std::env::var("HOME")
    {
      return PathBuf::from(home).join(rest);
    }
    self.store_path.clone()
  }

  pub fn admin_gate(&self) -> AdminGate {
    AdminGate::new(
      AuthConfig {
        username:      self.admin_username.clone(),
        password_hash: self.admin_password_hash.clone(),
      },
      self.production,
    )
  }
}

// ─── Application state ────────────────────────────────────────────────────────

pub struct AppState<S> {
  pub api:  ApiState<S>,
  pub gate: AdminGate,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self { Self { api: self.api.clone(), gate: self.gate.clone() } }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
///
/// Layout under `/api`:
/// - public read endpoints, no auth;
/// - `/admin/login`, `/admin/logout`, `/admin/check` behind the network guard;
/// - every other `/admin/*` route behind the network guard and a live session.
///
/// The network guard reads the peer address, so serve the router with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: SeriesStore + 'static,
{
  let crud = cifras_api::admin_router(state.api.clone())
    .route_layer(middleware::from_fn_with_state(state.gate.clone(), auth::require_session));

  let admin = Router::new()
    .route("/login", post(auth::login))
    .route("/logout", post(auth::logout))
    .route("/check", get(auth::check))
    .with_state(state.gate.clone())
    .merge(crud)
    .route_layer(middleware::from_fn_with_state(state.gate.clone(), auth::require_local));

  let api = cifras_api::api_router(state.api).nest("/admin", admin);

  Router::new().nest("/api", api).layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests;
