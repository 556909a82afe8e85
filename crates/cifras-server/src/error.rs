//! Admin-gate errors and their JSON responses.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("autenticación requerida")]
  Unauthorized,
  #[error("{0}")]
  Forbidden(&'static str),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = match self {
      Error::Unauthorized => StatusCode::UNAUTHORIZED,
      Error::Forbidden(_) => StatusCode::FORBIDDEN,
    };
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
