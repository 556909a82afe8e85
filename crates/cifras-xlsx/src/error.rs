//! Error types for the workbook writer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("workbook has no sheets")]
  Empty,

  #[error("row {row} has {got} cells, header has {expected}")]
  RowWidth { row: usize, got: usize, expected: usize },

  #[error("xlsx error: {0}")]
  Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
