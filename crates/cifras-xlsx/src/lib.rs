//! Spreadsheet export for Cifras.
//!
//! Builds `.xlsx` workbooks from [`WideTable`]s and other tabular data. Pure
//! synchronous; the result is an in-memory buffer the HTTP layer hands back
//! as an attachment.
//!
//! Every sheet gets a bold header row. Dates are written as real spreadsheet
//! dates and numbers keep two decimals.

pub mod error;

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use cifras_core::table::WideTable;
pub use error::{Error, Result};
use rust_xlsxwriter::{Color, ExcelDateTime, Format, FormatAlign, Workbook, Worksheet};

/// MIME type of the generated workbooks.
pub const CONTENT_TYPE: &str =
  "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Longest sheet name a workbook accepts.
pub const MAX_SHEET_NAME: usize = 31;

const HEADER_BG: u32 = 0x1F_38_64;
const DATE_WIDTH: f64 = 12.0;
const VALUE_WIDTH: f64 = 16.0;

// ─── Model ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
  Empty,
  Text(String),
  Number(f64),
  Date(NaiveDate),
}

impl From<Option<f64>> for Cell {
  fn from(v: Option<f64>) -> Self {
    match v {
      Some(n) if n.is_finite() => Self::Number(n),
      _ => Self::Empty,
    }
  }
}

impl From<f64> for Cell {
  fn from(v: f64) -> Self { Some(v).into() }
}

impl From<NaiveDate> for Cell {
  fn from(d: NaiveDate) -> Self { Self::Date(d) }
}

impl From<&str> for Cell {
  fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<String> for Cell {
  fn from(s: String) -> Self { Self::Text(s) }
}

impl From<i64> for Cell {
  fn from(v: i64) -> Self { Self::Number(v as f64) }
}

/// One worksheet: a header row followed by data rows of the same width.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
  pub name:   String,
  pub header: Vec<String>,
  pub rows:   Vec<Vec<Cell>>,
}

impl Sheet {
  pub fn new(name: impl Into<String>, header: Vec<String>) -> Self {
    Self { name: name.into(), header, rows: Vec::new() }
  }

  pub fn push_row(&mut self, row: Vec<Cell>) { self.rows.push(row); }

  /// `Fecha` followed by one column per series.
  pub fn from_wide(table: &WideTable) -> Self {
    let mut header = Vec::with_capacity(table.columns.len() + 1);
    header.push("Fecha".to_owned());
    header.extend(table.columns.iter().cloned());

    let rows = table
      .rows
      .iter()
      .map(|r| {
        std::iter::once(Cell::Date(r.date))
          .chain(r.values.iter().map(|&v| Cell::from(v)))
          .collect()
      })
      .collect();

    Self { name: table.name.clone(), header, rows }
  }
}

// ─── Sheet names ─────────────────────────────────────────────────────────────

/// A valid, unique sheet name derived from `raw`. Forbidden characters become
/// spaces, long names are cut and repeats get a ` (n)` suffix.
pub fn sheet_name(raw: &str, used: &mut HashSet<String>) -> String {
  let cleaned: String = raw
    .chars()
    .map(|c| if matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') { ' ' } else { c })
    .collect();
  let trimmed = cleaned.trim().trim_matches('\'');
  let base = if trimmed.is_empty() { "Hoja" } else { trimmed };

  let mut n = 1;
  loop {
    let suffix = if n == 1 { String::new() } else { format!(" ({n})") };
    let room = MAX_SHEET_NAME - suffix.chars().count();
    let head: String = base.chars().take(room).collect();
    let candidate = format!("{}{suffix}", head.trim_end());
    if used.insert(candidate.to_lowercase()) {
      return candidate;
    }
    n += 1;
  }
}

// ─── Writer ──────────────────────────────────────────────────────────────────

struct Formats {
  header: Format,
  number: Format,
  date:   Format,
}

impl Formats {
  fn new() -> Self {
    Self {
      header: Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_BG))
        .set_align(FormatAlign::Center),
      number: Format::new().set_num_format("0.00"),
      date:   Format::new().set_num_format("yyyy-mm-dd"),
    }
  }
}

fn write_sheet(ws: &mut Worksheet, sheet: &Sheet, formats: &Formats) -> Result<()> {
  for (col, title) in sheet.header.iter().enumerate() {
    ws.write_string_with_format(0, col as u16, title, &formats.header)?;
    let width = if col == 0 { DATE_WIDTH } else { VALUE_WIDTH };
    ws.set_column_width(col as u16, width)?;
  }

  for (i, row) in sheet.rows.iter().enumerate() {
    if row.len() != sheet.header.len() {
      return Err(Error::RowWidth { row: i, got: row.len(), expected: sheet.header.len() });
    }
    let r = (i + 1) as u32;
    for (col, cell) in row.iter().enumerate() {
      let c = col as u16;
      match cell {
        Cell::Empty => {}
        Cell::Text(s) => {
          ws.write_string(r, c, s)?;
        }
        Cell::Number(n) => {
          ws.write_number_with_format(r, c, *n, &formats.number)?;
        }
        Cell::Date(d) => {
          let dt = ExcelDateTime::from_ymd(d.year() as u16, d.month() as u8, d.day() as u8)?;
          ws.write_datetime_with_format(r, c, &dt, &formats.date)?;
        }
      }
    }
  }
  Ok(())
}

/// Serialize `sheets` into an `.xlsx` buffer.
pub fn write_workbook(sheets: &[Sheet]) -> Result<Vec<u8>> {
  if sheets.is_empty() {
    return Err(Error::Empty);
  }
  let formats = Formats::new();
  let mut used = HashSet::new();
  let mut workbook = Workbook::new();

  for sheet in sheets {
    let name = sheet_name(&sheet.name, &mut used);
    let ws = workbook.add_worksheet();
    ws.set_name(&name)?;
    write_sheet(ws, sheet, &formats)?;
  }

  Ok(workbook.save_to_buffer()?)
}

/// [`write_workbook`] over wide tables, one sheet each.
pub fn write_tables(tables: &[WideTable]) -> Result<Vec<u8>> {
  let sheets: Vec<Sheet> = tables.iter().map(Sheet::from_wide).collect();
  write_workbook(&sheets)
}
