//! Error kinds shared by every layer of the backend.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Unparseable input, missing parameter, inverted window, unknown enum.
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("not found: {0}")]
  NotFound(String),

  /// Duplicate name or a deletion blocked by live dependents.
  #[error("conflict: {0}")]
  Conflict(String),

  /// A reference series the whole request depends on has no data in the
  /// requested window.
  #[error("unavailable: {0}")]
  Unavailable(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn bad_request(msg: impl Into<String>) -> Self { Self::BadRequest(msg.into()) }

  pub fn not_found(msg: impl Into<String>) -> Self { Self::NotFound(msg.into()) }

  pub fn conflict(msg: impl Into<String>) -> Self { Self::Conflict(msg.into()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
