//! Sovereign yield curves for Uruguay: nominal and inflation-linked tenors.
//!
//! Variations here are signed differences in percentage points, never ratios.

use std::{collections::HashMap, fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use cifras_core::{
  Error, Result,
  series::{DateRange, Point, SeriesKey, days_before},
  store::SeriesStore,
};
use serde::Serialize;

use crate::{index::pp_change, reader::Reader};

// ─── Tenor mapping ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveKind {
  Nominal,
  Real,
}

impl CurveKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Nominal => "nominal",
      Self::Real => "real",
    }
  }
}

impl fmt::Display for CurveKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for CurveKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "nominal" | "n" => Ok(Self::Nominal),
      "real" | "r" => Ok(Self::Real),
      other => Err(Error::bad_request(format!("unknown curve type {other:?}"))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tenor {
  pub code:        &'static str,
  pub months:      u32,
  pub variable_id: i64,
  pub kind:        CurveKind,
}

impl Tenor {
  const fn nominal(code: &'static str, months: u32, variable_id: i64) -> Self {
    Self { code, months, variable_id, kind: CurveKind::Nominal }
  }

  const fn real(code: &'static str, months: u32, variable_id: i64) -> Self {
    Self { code, months, variable_id, kind: CurveKind::Real }
  }

  /// Human-readable tenor, e.g. `"3 meses"`, `"1 año"`.
  pub fn label(&self) -> String {
    match self.months {
      1 => "1 mes".to_owned(),
      m if m < 12 => format!("{m} meses"),
      12 => "1 año".to_owned(),
      m => format!("{} años", m / 12),
    }
  }
}

pub const NOMINAL_TENORS: [Tenor; 15] = [
  Tenor::nominal("1m", 1, 37),
  Tenor::nominal("2m", 2, 38),
  Tenor::nominal("3m", 3, 39),
  Tenor::nominal("6m", 6, 40),
  Tenor::nominal("9m", 9, 41),
  Tenor::nominal("1y", 12, 42),
  Tenor::nominal("2y", 24, 43),
  Tenor::nominal("3y", 36, 44),
  Tenor::nominal("4y", 48, 45),
  Tenor::nominal("5y", 60, 46),
  Tenor::nominal("6y", 72, 47),
  Tenor::nominal("7y", 84, 48),
  Tenor::nominal("8y", 96, 49),
  Tenor::nominal("9y", 108, 50),
  Tenor::nominal("10y", 120, 51),
];

pub const REAL_TENORS: [Tenor; 16] = [
  Tenor::real("3m", 3, 73),
  Tenor::real("6m", 6, 74),
  Tenor::real("1y", 12, 75),
  Tenor::real("2y", 24, 76),
  Tenor::real("3y", 36, 77),
  Tenor::real("4y", 48, 78),
  Tenor::real("5y", 60, 79),
  Tenor::real("6y", 72, 80),
  Tenor::real("7y", 84, 81),
  Tenor::real("8y", 96, 82),
  Tenor::real("9y", 108, 83),
  Tenor::real("10y", 120, 84),
  Tenor::real("15y", 180, 69),
  Tenor::real("20y", 240, 70),
  Tenor::real("25y", 300, 71),
  Tenor::real("30y", 360, 72),
];

pub fn tenors(kind: CurveKind) -> &'static [Tenor] {
  match kind {
    CurveKind::Nominal => &NOMINAL_TENORS,
    CurveKind::Real => &REAL_TENORS,
  }
}

/// Tenors of `kind`, or of both curves when `None`.
pub fn tenors_of(kind: Option<CurveKind>) -> Vec<Tenor> {
  match kind {
    Some(k) => tenors(k).to_vec(),
    None => NOMINAL_TENORS.iter().chain(&REAL_TENORS).copied().collect(),
  }
}

pub fn tenor_for_variable(variable_id: i64) -> Option<Tenor> {
  NOMINAL_TENORS
    .iter()
    .chain(&REAL_TENORS)
    .find(|t| t.variable_id == variable_id)
    .copied()
}

fn variable_ids(tenors: &[Tenor]) -> Vec<i64> { tenors.iter().map(|t| t.variable_id).collect() }

// ─── Dates and snapshots ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableDates {
  pub latest: Option<NaiveDate>,
  /// Newest first.
  pub dates:  Vec<NaiveDate>,
}

pub async fn available_dates<S: SeriesStore>(
  reader: Reader<'_, S>,
  country_id: i64,
  kind: Option<CurveKind>,
) -> Result<AvailableDates> {
  let ids = variable_ids(&tenors_of(kind));
  let dates = reader.dates(&ids, country_id).await?;
  Ok(AvailableDates { latest: dates.first().copied(), dates })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurvePoint {
  #[serde(flatten)]
  pub tenor: Tenor,
  pub label: String,
  pub value: Option<f64>,
}

/// Every tenor of `kind` on exactly `date`; `null` where a tenor did not trade.
pub async fn snapshot<S: SeriesStore>(
  reader: Reader<'_, S>,
  country_id: i64,
  kind: CurveKind,
  date: NaiveDate,
) -> Result<Vec<CurvePoint>> {
  let tenors = tenors(kind);
  let values: HashMap<i64, f64> =
    reader.values_on(&variable_ids(tenors), country_id, date).await?.into_iter().collect();
  Ok(
    tenors
      .iter()
      .map(|t| CurvePoint {
        tenor: *t,
        label: t.label(),
        value: values.get(&t.variable_id).copied(),
      })
      .collect(),
  )
}

// ─── Variations table ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HorizonDates {
  pub d5:   NaiveDate,
  pub d30:  NaiveDate,
  pub d360: NaiveDate,
  pub ytd:  NaiveDate,
}

impl HorizonDates {
  pub fn from_reference(reference: NaiveDate) -> Self {
    Self {
      d5:   days_before(reference, 5),
      d30:  days_before(reference, 30),
      d360: days_before(reference, 360),
      ytd:  NaiveDate::from_ymd_opt(reference.year(), 1, 1).unwrap_or(reference),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
  #[serde(flatten)]
  pub tenor:       Tenor,
  pub label:       String,
  pub value:       Option<f64>,
  pub value_5d:    Option<f64>,
  pub value_30d:   Option<f64>,
  pub value_360d:  Option<f64>,
  pub value_ytd:   Option<f64>,
  pub change_5d:   Option<f64>,
  pub change_30d:  Option<f64>,
  pub change_360d: Option<f64>,
  pub change_ytd:  Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveTable {
  pub kind:           CurveKind,
  pub reference_date: NaiveDate,
  pub horizons:       HorizonDates,
  pub rows:           Vec<TableRow>,
}

/// Each tenor on the reference date with its change against 5, 30 and 360
/// calendar days earlier and against January 1.
///
/// The reference value must fall exactly on the reference date. A horizon
/// value is the observation on that date or the most recent one before it.
/// Missing endpoints give `null` changes.
pub async fn table<S: SeriesStore>(
  reader: Reader<'_, S>,
  country_id: i64,
  kind: CurveKind,
  reference: Option<NaiveDate>,
) -> Result<CurveTable> {
  let reference_date = match reference {
    Some(d) => d,
    None => available_dates(reader, country_id, Some(kind))
      .await?
      .latest
      .ok_or_else(|| Error::Unavailable(format!("no hay datos de la curva {kind}")))?,
  };
  let horizons = HorizonDates::from_reference(reference_date);
  let tenors = tenors(kind);
  let on_ref: HashMap<i64, f64> = reader
    .values_on(&variable_ids(tenors), country_id, reference_date)
    .await?
    .into_iter()
    .collect();

  let mut rows = Vec::with_capacity(tenors.len());
  for t in tenors {
    let key = SeriesKey::new(t.variable_id, country_id);
    let at = |p: Option<Point>| p.map(|p| p.value);
    let value = on_ref.get(&t.variable_id).copied();
    let value_5d = at(reader.latest_at(key, Some(horizons.d5)).await?);
    let value_30d = at(reader.latest_at(key, Some(horizons.d30)).await?);
    let value_360d = at(reader.latest_at(key, Some(horizons.d360)).await?);
    let value_ytd = at(reader.latest_at(key, Some(horizons.ytd)).await?);
    rows.push(TableRow {
      tenor: *t,
      label: t.label(),
      value,
      value_5d,
      value_30d,
      value_360d,
      value_ytd,
      change_5d: pp_change(value, value_5d),
      change_30d: pp_change(value, value_30d),
      change_360d: pp_change(value, value_360d),
      change_ytd: pp_change(value, value_ytd),
    });
  }
  Ok(CurveTable { kind, reference_date, horizons, rows })
}

// ─── History ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenorSeries {
  pub variable_id: i64,
  pub tenor:       &'static str,
  pub kind:        CurveKind,
  /// e.g. `"1 año (nominal)"`.
  pub name:        String,
  pub points:      Vec<Point>,
}

/// Ordered history of each requested tenor variable; nominal and real ids
/// may be mixed.
pub async fn timeseries<S: SeriesStore>(
  reader: Reader<'_, S>,
  country_id: i64,
  variable_ids: &[i64],
  window: DateRange,
) -> Result<Vec<TenorSeries>> {
  if variable_ids.is_empty() {
    return Err(Error::bad_request("at least one tenor variable is required"));
  }
  let mut out = Vec::with_capacity(variable_ids.len());
  for &id in variable_ids {
    let tenor = tenor_for_variable(id)
      .ok_or_else(|| Error::bad_request(format!("variable {id} is not a curve tenor")))?;
    let points = reader.series(SeriesKey::new(id, country_id), window).await?;
    out.push(TenorSeries {
      variable_id: id,
      tenor: tenor.code,
      kind: tenor.kind,
      name: format!("{} ({})", tenor.label(), tenor.kind),
      points,
    });
  }
  Ok(out)
}
