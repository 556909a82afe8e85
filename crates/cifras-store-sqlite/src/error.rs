//! Error type for `cifras-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date parse error: {0}")]
  DateParse(String),

  /// A column held a value outside its enumeration.
  #[error("invalid stored value: {0}")]
  Decode(String),

  #[error("invalid input: {0}")]
  Invalid(String),

  #[error("not found: {0}")]
  NotFound(String),

  /// An integrity precondition failed; the message names the blocking row.
  #[error("{0}")]
  Conflict(String),
}

impl From<Error> for cifras_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::NotFound(m) => Self::NotFound(m),
      Error::Conflict(m) => Self::Conflict(m),
      Error::Invalid(m) => Self::BadRequest(m),
      other => Self::Store(Box::new(other)),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
