//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// A reference series has no data in the requested window.
  #[error("unavailable: {0}")]
  Unavailable(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("spreadsheet error: {0}")]
  Export(#[from] cifras_xlsx::Error),
}

impl From<cifras_core::Error> for ApiError {
  fn from(e: cifras_core::Error) -> Self {
    use cifras_core::Error as E;
    match e {
      E::BadRequest(m) => Self::BadRequest(m),
      E::NotFound(m) => Self::NotFound(m),
      E::Conflict(m) => Self::Conflict(m),
      E::Unavailable(m) => Self::Unavailable(m),
      E::Store(e) => Self::Store(e),
    }
  }
}

/// Lift a backend error through the core error kinds.
pub fn lift<E: Into<cifras_core::Error>>(e: E) -> ApiError { ApiError::from(e.into()) }

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::NotFound(m) | ApiError::Unavailable(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, "database error".to_owned())
      }
      ApiError::Export(e) => {
        tracing::error!(error = %e, "spreadsheet failure");
        (StatusCode::INTERNAL_SERVER_ERROR, "could not build spreadsheet".to_owned())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn core_kinds_map_to_status_codes() {
    let status = |e: cifras_core::Error| ApiError::from(e).into_response().status();
    assert_eq!(status(cifras_core::Error::bad_request("x")), StatusCode::BAD_REQUEST);
    assert_eq!(status(cifras_core::Error::not_found("x")), StatusCode::NOT_FOUND);
    assert_eq!(status(cifras_core::Error::conflict("x")), StatusCode::CONFLICT);
    assert_eq!(status(cifras_core::Error::Unavailable("x".into())), StatusCode::NOT_FOUND);
    assert_eq!(
      status(cifras_core::Error::Store("disk".into())),
      StatusCode::INTERNAL_SERVER_ERROR
    );
  }
}
