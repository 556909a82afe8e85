//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Dates are stored as `YYYY-MM-DD` text so lexicographic order is calendar
//! order. Enumerations are stored as their short codes.

use chrono::NaiveDate;
use cifras_core::{
  catalog::{Currency, Maestro, MaestroFields, Product, Valuation, Variable},
  series::{Periodicity, Pid, SeriesKey, parse_date},
};

use crate::{Error, Result};

// ─── Dates ───────────────────────────────────────────────────────────────────

/// Sorts below every stored date.
pub const DATE_FLOOR: &str = "0000-00-00";
/// Sorts above every stored date, including datetime-formatted ones.
pub const DATE_CEILING: &str = "9999-99-99";

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

/// Decode a stored date. Datetime strings are truncated to their date part.
pub fn decode_date(s: &str) -> Result<NaiveDate> {
  parse_date(s).map_err(|_| Error::DateParse(s.to_owned()))
}

/// Inclusive lower bound as a column comparand.
pub fn lower_bound(from: Option<NaiveDate>) -> String {
  from.map(encode_date).unwrap_or_else(|| DATE_FLOOR.to_owned())
}

/// Exclusive upper bound: the day after `to`, so rows stored as
/// `YYYY-MM-DD hh:mm:ss` on the last day still match.
pub fn upper_bound(to: Option<NaiveDate>) -> String {
  to.and_then(|t| t.succ_opt())
    .map(encode_date)
    .unwrap_or_else(|| DATE_CEILING.to_owned())
}

// ─── Enumerations ────────────────────────────────────────────────────────────

pub fn decode_periodicity(s: &str) -> Result<Periodicity> {
  Periodicity::from_code(s).ok_or_else(|| Error::Decode(format!("periodicity {s:?}")))
}

pub fn decode_valuation(s: Option<String>) -> Result<Option<Valuation>> {
  match s.as_deref().map(str::trim) {
    None | Some("") => Ok(None),
    Some(code) => Valuation::from_code(code)
      .map(Some)
      .ok_or_else(|| Error::Decode(format!("nominal_or_real {code:?}"))),
  }
}

pub fn decode_currency(s: Option<String>) -> Result<Option<Currency>> {
  match s.as_deref().map(str::trim) {
    None | Some("") => Ok(None),
    Some(code) => Currency::from_code(code)
      .map(Some)
      .ok_or_else(|| Error::Decode(format!("currency {code:?}"))),
  }
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// Column list matching [`RawVariable::from_row`].
pub const VARIABLE_COLUMNS: &str =
  "id, name, subfamily_id, nominal_or_real, currency, series_type_id";

pub struct RawVariable {
  pub id:              i64,
  pub name:            String,
  pub subfamily_id:    i64,
  pub nominal_or_real: Option<String>,
  pub currency:        Option<String>,
  pub series_type_id:  Option<i64>,
}

impl RawVariable {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      name:            row.get(1)?,
      subfamily_id:    row.get(2)?,
      nominal_or_real: row.get(3)?,
      currency:        row.get(4)?,
      series_type_id:  row.get(5)?,
    })
  }

  pub fn into_variable(self) -> Result<Variable> {
    Ok(Variable {
      id:              self.id,
      name:            self.name,
      subfamily_id:    self.subfamily_id,
      nominal_or_real: decode_valuation(self.nominal_or_real)?,
      currency:        decode_currency(self.currency)?,
      series_type_id:  self.series_type_id,
    })
  }
}

/// Column list matching [`RawMaestro::from_row`].
pub const MAESTRO_COLUMNS: &str = "variable_id, country_id, periodicity, source, \
  active, link, script, notes, category, kind";

pub struct RawMaestro {
  pub variable_id: i64,
  pub country_id:  i64,
  pub periodicity: String,
  pub source:      Option<String>,
  pub active:      bool,
  pub link:        Option<String>,
  pub script:      Option<String>,
  pub notes:       Option<String>,
  pub category:    Option<String>,
  pub kind:        Option<String>,
}

impl RawMaestro {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      variable_id: row.get(0)?,
      country_id:  row.get(1)?,
      periodicity: row.get(2)?,
      source:      row.get(3)?,
      active:      row.get(4)?,
      link:        row.get(5)?,
      script:      row.get(6)?,
      notes:       row.get(7)?,
      category:    row.get(8)?,
      kind:        row.get(9)?,
    })
  }

  pub fn into_maestro(self) -> Result<Maestro> {
    Ok(Maestro::new(
      SeriesKey::new(self.variable_id, self.country_id),
      MaestroFields {
        periodicity: decode_periodicity(&self.periodicity)?,
        source:      self.source,
        active:      self.active,
        link:        self.link,
        script:      self.script,
        notes:       self.notes,
        category:    self.category,
        kind:        self.kind,
      },
    ))
  }
}

/// Select list (with its joins) matching [`RawProduct::from_row`].
pub const PRODUCT_SELECT: &str = "
  SELECT m.variable_id, m.country_id, v.name, c.name, f.name, s.name,
         m.periodicity, v.currency, v.nominal_or_real, m.active, m.source
  FROM maestros m
  JOIN variables   v ON v.id = m.variable_id
  JOIN countries   c ON c.id = m.country_id
  JOIN subfamilies s ON s.id = v.subfamily_id
  JOIN families    f ON f.id = s.family_id";

pub struct RawProduct {
  pub variable_id:     i64,
  pub country_id:      i64,
  pub name:            String,
  pub country:         String,
  pub family:          String,
  pub subfamily:       String,
  pub periodicity:     String,
  pub currency:        Option<String>,
  pub nominal_or_real: Option<String>,
  pub active:          bool,
  pub source:          Option<String>,
}

impl RawProduct {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      variable_id:     row.get(0)?,
      country_id:      row.get(1)?,
      name:            row.get(2)?,
      country:         row.get(3)?,
      family:          row.get(4)?,
      subfamily:       row.get(5)?,
      periodicity:     row.get(6)?,
      currency:        row.get(7)?,
      nominal_or_real: row.get(8)?,
      active:          row.get(9)?,
      source:          row.get(10)?,
    })
  }

  pub fn into_product(self) -> Result<Product> {
    let key = SeriesKey::new(self.variable_id, self.country_id);
    Ok(Product {
      pid:             Pid::encode(key),
      variable_id:     self.variable_id,
      country_id:      self.country_id,
      name:            self.name,
      country:         self.country,
      family:          self.family,
      subfamily:       self.subfamily,
      periodicity:     decode_periodicity(&self.periodicity)?,
      currency:        decode_currency(self.currency)?,
      nominal_or_real: decode_valuation(self.nominal_or_real)?,
      active:          self.active,
      source:          self.source,
    })
  }
}
