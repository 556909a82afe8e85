//! Observation primitives: series keys, the synthetic product id, dated
//! points and date windows.
//!
//! An observation is a single `(variable, country, date) → value` fact. The
//! store never holds nulls: a missing month is simply an absent row.

use std::{fmt, str::FromStr};

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Series key ──────────────────────────────────────────────────────────────

/// Identifies one tracked series: a variable measured for a country.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SeriesKey {
  pub variable_id: i64,
  pub country_id:  i64,
}

impl SeriesKey {
  pub const fn new(variable_id: i64, country_id: i64) -> Self {
    Self { variable_id, country_id }
  }

  pub fn pid(self) -> Pid { Pid::encode(self) }
}

impl fmt::Display for SeriesKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "variable {} / país {}", self.variable_id, self.country_id)
  }
}

// ─── Synthetic product id ────────────────────────────────────────────────────

/// Multiplier of the `variable · 10000 + country` encoding.
pub const PID_FACTOR: i64 = 10_000;

/// Single-integer handle for a [`SeriesKey`], used wherever the client API
/// prefers one number over a pair. A presentation concern only; storage keys
/// on the pair.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Pid(pub i64);

impl Pid {
  pub fn encode(key: SeriesKey) -> Self {
    Self(key.variable_id * PID_FACTOR + key.country_id)
  }

  pub fn decode(self) -> SeriesKey {
    SeriesKey {
      variable_id: self.0 / PID_FACTOR,
      country_id:  self.0 % PID_FACTOR,
    }
  }
}

impl From<SeriesKey> for Pid {
  fn from(key: SeriesKey) -> Self { Self::encode(key) }
}

impl From<Pid> for SeriesKey {
  fn from(pid: Pid) -> Self { pid.decode() }
}

impl fmt::Display for Pid {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl FromStr for Pid {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().parse::<i64>() {
      Ok(n) if n >= 0 => Ok(Self(n)),
      _ => Err(Error::bad_request(format!("invalid product id {s:?}"))),
    }
  }
}

// ─── Periodicity ─────────────────────────────────────────────────────────────

/// Sampling frequency declared by a Maestro row. Individual observations carry
/// no periodicity of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Periodicity {
  #[serde(rename = "D")]
  Daily,
  #[serde(rename = "W")]
  Weekly,
  #[serde(rename = "M")]
  Monthly,
}

impl Periodicity {
  pub fn code(self) -> &'static str {
    match self {
      Self::Daily => "D",
      Self::Weekly => "W",
      Self::Monthly => "M",
    }
  }

  pub fn from_code(code: &str) -> Option<Self> {
    match code.trim() {
      "D" | "d" => Some(Self::Daily),
      "W" | "w" => Some(Self::Weekly),
      "M" | "m" => Some(Self::Monthly),
      _ => None,
    }
  }
}

// ─── Points and observations ─────────────────────────────────────────────────

/// One dated value of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
  pub date:  NaiveDate,
  pub value: f64,
}

impl Point {
  pub const fn new(date: NaiveDate, value: f64) -> Self { Self { date, value } }
}

/// A row of the dense observation table, in long form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
  pub variable_id: i64,
  pub country_id:  i64,
  pub date:        NaiveDate,
  pub value:       f64,
}

impl Observation {
  pub fn new(key: SeriesKey, date: NaiveDate, value: f64) -> Self {
    Self {
      variable_id: key.variable_id,
      country_id: key.country_id,
      date,
      value,
    }
  }

  pub fn key(&self) -> SeriesKey { SeriesKey::new(self.variable_id, self.country_id) }

  pub fn point(&self) -> Point { Point::new(self.date, self.value) }
}

// ─── Date handling ───────────────────────────────────────────────────────────

/// Parse an ISO `YYYY-MM-DD` date. A trailing time component (`T…` or a
/// space-separated clock) is truncated, since the store may hand back
/// datetime strings.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
  let s = s.trim();
  let head = match s.get(10..) {
    Some(rest) if rest.is_empty() || rest.starts_with(['T', ' ']) => &s[..10],
    _ => s,
  };
  NaiveDate::parse_from_str(head, "%Y-%m-%d")
    .map_err(|_| Error::bad_request(format!("invalid date {s:?}; expected YYYY-MM-DD")))
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate { date.with_day(1).unwrap_or(date) }

/// `date` shifted back by `days` calendar days (saturating at the epoch of
/// `NaiveDate`).
pub fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
  date.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

/// An inclusive `[from, to]` window. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
  pub from: Option<NaiveDate>,
  pub to:   Option<NaiveDate>,
}

impl DateRange {
  /// The unbounded window.
  pub const ALL: Self = Self { from: None, to: None };

  /// Build a window, rejecting `from > to`.
  pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self> {
    if let (Some(f), Some(t)) = (from, to)
      && f > t
    {
      return Err(Error::bad_request(format!(
        "date_from {f} is after date_to {t}"
      )));
    }
    Ok(Self { from, to })
  }

  pub fn between(from: NaiveDate, to: NaiveDate) -> Result<Self> {
    Self::new(Some(from), Some(to))
  }

  /// Parse optional ISO strings into a window.
  pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self> {
    let from = from.filter(|s| !s.trim().is_empty()).map(parse_date).transpose()?;
    let to = to.filter(|s| !s.trim().is_empty()).map(parse_date).transpose()?;
    Self::new(from, to)
  }

  pub fn contains(&self, date: NaiveDate) -> bool {
    self.from.is_none_or(|f| date >= f) && self.to.is_none_or(|t| date <= t)
  }

  /// The same window with its lower bound pulled back to the first of its
  /// month, so month averages over the window are complete.
  pub fn widen_to_month_start(&self) -> Self {
    Self { from: self.from.map(month_start), to: self.to }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, day).unwrap() }

  #[test]
  fn pid_encodes_variable_and_country() {
    let key = SeriesKey::new(22, 858);
    assert_eq!(Pid::encode(key), Pid(220858));
    assert_eq!(Pid(220858).decode(), key);
  }

  #[test]
  fn pid_round_trips() {
    for pid in [10032, 200858, 9_990_152, 10_000] {
      assert_eq!(Pid::encode(Pid(pid).decode()).0, pid);
    }
    for (v, c) in [(1, 1), (37, 858), (95, 9999)] {
      assert_eq!(Pid::encode(SeriesKey::new(v, c)).decode(), SeriesKey::new(v, c));
    }
  }

  #[test]
  fn pid_rejects_garbage() {
    assert!("abc".parse::<Pid>().is_err());
    assert!("-5".parse::<Pid>().is_err());
    assert_eq!("220858".parse::<Pid>().unwrap(), Pid(220858));
  }

  #[test]
  fn parse_date_truncates_time_component() {
    assert_eq!(parse_date("2023-01-15").unwrap(), d(2023, 1, 15));
    assert_eq!(parse_date("2023-01-15 00:00:00").unwrap(), d(2023, 1, 15));
    assert_eq!(parse_date("2023-01-15T12:30:00").unwrap(), d(2023, 1, 15));
    assert!(parse_date("2023-13-01").is_err());
    assert!(parse_date("15/01/2023").is_err());
    assert!(parse_date("2023-01-15xyz").is_err());
  }

  #[test]
  fn range_rejects_inverted_bounds() {
    assert!(matches!(
      DateRange::between(d(2023, 3, 1), d(2023, 1, 1)),
      Err(Error::BadRequest(_))
    ));
  }

  #[test]
  fn range_is_inclusive() {
    let r = DateRange::between(d(2023, 1, 1), d(2023, 3, 1)).unwrap();
    assert!(r.contains(d(2023, 1, 1)));
    assert!(r.contains(d(2023, 3, 1)));
    assert!(!r.contains(d(2023, 3, 2)));
    assert!(DateRange::ALL.contains(d(1900, 1, 1)));
  }

  #[test]
  fn periodicity_serialises_as_single_letter() {
    assert_eq!(serde_json::to_string(&Periodicity::Daily).unwrap(), "\"D\"");
    assert_eq!(Periodicity::from_code("M"), Some(Periodicity::Monthly));
    assert_eq!(Periodicity::from_code("X"), None);
  }
}
