//! Implicit (breakeven) inflation from the nominal and real curves.
//!
//! Tenor `k` years pairs nominal variable `41 + k` with real variable
//! `74 + k`; the result is stored under variable `85 + k`.

use std::collections::HashMap;

use chrono::NaiveDate;
use cifras_core::{
  Error, Result,
  series::{DateRange, Observation, Point, SeriesKey},
  store::SeriesStore,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::{index::align, reader::Reader};

pub const MIN_YEARS: i64 = 1;
pub const MAX_YEARS: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImplicitTenor {
  pub years:       i64,
  pub nominal:     i64,
  pub real:        i64,
  pub variable_id: i64,
}

impl ImplicitTenor {
  pub fn new(years: i64) -> Option<Self> {
    (MIN_YEARS..=MAX_YEARS).contains(&years).then_some(Self {
      years,
      nominal: 41 + years,
      real: 74 + years,
      variable_id: 85 + years,
    })
  }

  pub fn for_variable(variable_id: i64) -> Option<Self> {
    variable_id.checked_sub(85).and_then(Self::new)
  }

  pub fn label(&self) -> String {
    if self.years == 1 { "1 año".to_owned() } else { format!("{} años", self.years) }
  }
}

pub fn all_tenors() -> Vec<ImplicitTenor> {
  (MIN_YEARS..=MAX_YEARS).filter_map(ImplicitTenor::new).collect()
}

/// `((1 + nominal/100) / (1 + real/100) − 1) · 100`, all in percent.
pub fn implicit_rate(nominal: f64, real: f64) -> f64 {
  ((1.0 + nominal / 100.0) / (1.0 + real / 100.0) - 1.0) * 100.0
}

/// Implicit inflation on every date both curves share.
pub fn derive(nominal: &[Point], real: &[Point]) -> Vec<Point> {
  align(nominal, real)
    .into_iter()
    .map(|(date, n, r)| Point::new(date, implicit_rate(n, r)))
    .filter(|p| p.value.is_finite())
    .collect()
}

// ─── Batch recompute ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenorWritten {
  pub years:       i64,
  pub variable_id: i64,
  pub rows:        usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenorSkipped {
  pub years:       i64,
  pub variable_id: i64,
  pub reason:      String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecomputeReport {
  pub written: Vec<TenorWritten>,
  pub skipped: Vec<TenorSkipped>,
}

/// Recompute and upsert the implicit-inflation series for every tenor.
/// Tenors whose output pair is not declared in Maestro are skipped.
pub async fn recompute<S: SeriesStore>(
  reader: Reader<'_, S>,
  country_id: i64,
) -> Result<RecomputeReport> {
  let mut report = RecomputeReport::default();
  for tenor in all_tenors() {
    let out_key = SeriesKey::new(tenor.variable_id, country_id);
    if reader.maestro(out_key).await?.is_none() {
      warn!(years = tenor.years, variable_id = tenor.variable_id, "implicit tenor not declared");
      report.skipped.push(TenorSkipped {
        years:       tenor.years,
        variable_id: tenor.variable_id,
        reason:      format!("sin fila de maestro para {out_key}"),
      });
      continue;
    }

    let nominal = reader.series(SeriesKey::new(tenor.nominal, country_id), DateRange::ALL).await?;
    let real = reader.series(SeriesKey::new(tenor.real, country_id), DateRange::ALL).await?;
    let rows: Vec<Observation> = derive(&nominal, &real)
      .into_iter()
      .map(|p| Observation::new(out_key, p.date, p.value))
      .collect();
    let written = reader.store_observations(rows).await?;
    report.written.push(TenorWritten {
      years:       tenor.years,
      variable_id: tenor.variable_id,
      rows:        written,
    });
  }
  info!(
    written = report.written.len(),
    skipped = report.skipped.len(),
    "implicit inflation recomputed"
  );
  Ok(report)
}

// ─── Reads ───────────────────────────────────────────────────────────────────

fn output_ids() -> Vec<i64> { all_tenors().iter().map(|t| t.variable_id).collect() }

/// Dates with stored implicit inflation, newest first.
pub async fn dates<S: SeriesStore>(reader: Reader<'_, S>, country_id: i64) -> Result<Vec<NaiveDate>> {
  reader.dates(&output_ids(), country_id).await
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImplicitPoint {
  #[serde(flatten)]
  pub tenor: ImplicitTenor,
  pub label: String,
  pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImplicitCurve {
  pub date:   NaiveDate,
  pub points: Vec<ImplicitPoint>,
}

/// The implicit curve on `date`, defaulting to the latest stored date.
pub async fn curve<S: SeriesStore>(
  reader: Reader<'_, S>,
  country_id: i64,
  date: Option<NaiveDate>,
) -> Result<ImplicitCurve> {
  let date = match date {
    Some(d) => d,
    None => dates(reader, country_id)
      .await?
      .first()
      .copied()
      .ok_or_else(|| Error::Unavailable("no hay inflación implícita calculada".to_owned()))?,
  };
  let values: HashMap<i64, f64> =
    reader.values_on(&output_ids(), country_id, date).await?.into_iter().collect();
  let points = all_tenors()
    .into_iter()
    .map(|t| ImplicitPoint { tenor: t, label: t.label(), value: values.get(&t.variable_id).copied() })
    .collect();
  Ok(ImplicitCurve { date, points })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImplicitSeries {
  #[serde(flatten)]
  pub tenor:  ImplicitTenor,
  pub label:  String,
  pub points: Vec<Point>,
}

/// Stored history of each requested tenor, given in years.
pub async fn evolution<S: SeriesStore>(
  reader: Reader<'_, S>,
  country_id: i64,
  years: &[i64],
  window: DateRange,
) -> Result<Vec<ImplicitSeries>> {
  let tenors: Vec<ImplicitTenor> = if years.is_empty() {
    all_tenors()
  } else {
    years
      .iter()
      .map(|&y| {
        ImplicitTenor::new(y)
          .ok_or_else(|| Error::bad_request(format!("tenor {y} must be between 1 and 10 years")))
      })
      .collect::<Result<_>>()?
  };
  let mut out = Vec::with_capacity(tenors.len());
  for t in tenors {
    let points = reader.series(SeriesKey::new(t.variable_id, country_id), window).await?;
    out.push(ImplicitSeries { tenor: t, label: t.label(), points });
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;

  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, day).unwrap() }

  #[test]
  fn tenor_variable_mapping() {
    let t = ImplicitTenor::new(5).unwrap();
    assert_eq!((t.nominal, t.real, t.variable_id), (46, 79, 90));
    assert_eq!(ImplicitTenor::for_variable(95).unwrap().years, 10);
    assert!(ImplicitTenor::new(11).is_none());
    assert_eq!(all_tenors().len(), 10);
  }

  #[test]
  fn out_of_range_variables_have_no_tenor() {
    assert!(ImplicitTenor::for_variable(85).is_none());
    assert!(ImplicitTenor::for_variable(96).is_none());
    assert!(ImplicitTenor::for_variable(i64::MIN).is_none());
    assert!(ImplicitTenor::for_variable(i64::MAX).is_none());
  }

  #[test]
  fn breakeven_formula() {
    assert_relative_eq!(implicit_rate(9.0, 3.0), 5.825_242_718, epsilon = 1e-6);
    assert_relative_eq!(implicit_rate(4.0, 4.0), 0.0);
  }

  #[test]
  fn derive_inner_joins_on_date() {
    let nominal = [Point::new(d(2024, 1, 2), 9.0), Point::new(d(2024, 1, 3), 9.1)];
    let real = [Point::new(d(2024, 1, 3), 3.0), Point::new(d(2024, 1, 4), 3.1)];
    let out = derive(&nominal, &real);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].date, d(2024, 1, 3));
  }
}
