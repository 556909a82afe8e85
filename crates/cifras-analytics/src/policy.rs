//! Monetary-policy dashboard for the configured Latin-American countries.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use cifras_core::{
  Error, Result,
  series::{DateRange, Point, SeriesKey},
  store::SeriesStore,
};
use serde::Serialize;

use crate::{
  config::{AnalyticsConfig, PolicyCountry, Target},
  index::{normalize, round_to},
  monthly::latest_per_month,
  reader::Reader,
};

/// Observations scanned backwards when looking for the last rate change.
const RATE_SCAN: usize = 500;

// ─── Pure helpers ────────────────────────────────────────────────────────────

fn same(a: f64, b: f64) -> bool { (a - b).abs() < 1e-9 }

/// Year-on-year inflation from an ascending CPI series. Months keep their
/// latest value; when the month a year back is missing, the nearest earlier
/// month stands in.
pub fn yoy_inflation(cpi: &[Point]) -> Option<(NaiveDate, f64)> {
  let mut months: BTreeMap<(i32, u32), (NaiveDate, f64)> = BTreeMap::new();
  for p in cpi {
    months.insert((p.date.year(), p.date.month()), (p.date, p.value));
  }
  let (&(year, month), &(date, current)) = months.iter().next_back()?;
  let (_, &(_, base)) = months.range(..=(year - 1, month)).next_back()?;
  (base != 0.0).then(|| (date, (current / base - 1.0) * 100.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateChange {
  pub rate:   f64,
  /// Earliest date of the run of observations equal to the current rate.
  pub since:  NaiveDate,
  /// Signed difference to the previous distinct rate, in percentage points.
  pub change: Option<f64>,
}

/// Detect the last change in a newest-first rate series.
pub fn last_change(newest_first: &[Point]) -> Option<RateChange> {
  let current = newest_first.first()?;
  let mut since = current.date;
  let mut change = None;
  for p in &newest_first[1..] {
    if same(p.value, current.value) {
      since = p.date;
    } else {
      change = Some(round_to(current.value - p.value, 4));
      break;
    }
  }
  Some(RateChange { rate: current.value, since, change })
}

/// `((1 + rate/100) / (1 + expectation/100) − 1) · 100`.
pub fn real_rate(rate: f64, expectation: f64) -> f64 {
  ((1.0 + rate / 100.0) / (1.0 + expectation / 100.0) - 1.0) * 100.0
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryPolicy {
  pub country_id:           i64,
  pub code:                 String,
  pub name:                 String,
  pub inflation:            Option<f64>,
  pub inflation_date:       Option<NaiveDate>,
  pub expectation:          Option<f64>,
  pub expectation_date:     Option<NaiveDate>,
  pub expectation_horizon:  u32,
  pub policy_rate:          Option<RateChange>,
  /// Basis points.
  pub embi:                 Option<f64>,
  pub embi_date:            Option<NaiveDate>,
  pub real_rate:            Option<f64>,
  pub target:               Target,
  pub inflation_in_range:   Option<bool>,
  pub expectation_in_range: Option<bool>,
}

pub async fn dashboard<S: SeriesStore>(
  reader: Reader<'_, S>,
  config: &AnalyticsConfig,
) -> Result<Vec<CountryPolicy>> {
  let mut out = Vec::with_capacity(config.policy.countries.len());
  for country in &config.policy.countries {
    out.push(country_row(reader, config, country).await?);
  }
  Ok(out)
}

async fn country_row<S: SeriesStore>(
  reader: Reader<'_, S>,
  config: &AnalyticsConfig,
  country: &PolicyCountry,
) -> Result<CountryPolicy> {
  let p = &config.policy;
  let c = country.id;

  let cpi = reader.series(SeriesKey::new(config.cpi_variable, c), DateRange::ALL).await?;
  let inflation = yoy_inflation(&cpi);

  let expectation = reader
    .latest_at(SeriesKey::new(p.expectations_variable(country), c), None)
    .await?;
  let rates = reader
    .recent(SeriesKey::new(p.policy_rate_variable, c), None, RATE_SCAN)
    .await?;
  let policy_rate = last_change(&rates);
  let embi = reader.latest_at(SeriesKey::new(p.embi_variable, c), None).await?;

  let real = policy_rate
    .zip(expectation)
    .map(|(r, e)| real_rate(r.rate, e.value));

  Ok(CountryPolicy {
    country_id: c,
    code: country.code.clone(),
    name: reader.country_name(c).await?,
    inflation: inflation.map(|(_, v)| v),
    inflation_date: inflation.map(|(d, _)| d),
    expectation: expectation.map(|e| e.value),
    expectation_date: expectation.map(|e| e.date),
    expectation_horizon: country.expectation_horizon_months,
    policy_rate,
    embi: embi.map(|e| e.value * 100.0),
    embi_date: embi.map(|e| e.date),
    real_rate: real,
    target: country.target,
    inflation_in_range: inflation.map(|(_, v)| country.target.contains(v)),
    expectation_in_range: expectation.map(|e| country.target.contains(e.value)),
  })
}

// ─── Per-country series ──────────────────────────────────────────────────────

fn country<'c>(config: &'c AnalyticsConfig, country_id: i64) -> Result<&'c PolicyCountry> {
  config
    .policy
    .country(country_id)
    .ok_or_else(|| Error::not_found(format!("país {country_id} fuera del tablero de política monetaria")))
}

/// Daily policy rate.
pub async fn tpm_series<S: SeriesStore>(
  reader: Reader<'_, S>,
  config: &AnalyticsConfig,
  country_id: i64,
  window: DateRange,
) -> Result<Vec<Point>> {
  country(config, country_id)?;
  reader
    .series(SeriesKey::new(config.policy.policy_rate_variable, country_id), window)
    .await
}

/// Expectations deduplicated to the latest survey per month, dated on day 1.
pub async fn expectations_series<S: SeriesStore>(
  reader: Reader<'_, S>,
  config: &AnalyticsConfig,
  country_id: i64,
  window: DateRange,
) -> Result<Vec<Point>> {
  let c = country(config, country_id)?;
  let key = SeriesKey::new(config.policy.expectations_variable(c), country_id);
  Ok(latest_per_month(&reader.series(key, window).await?))
}

/// Daily EMBI in basis points.
pub async fn embi_series<S: SeriesStore>(
  reader: Reader<'_, S>,
  config: &AnalyticsConfig,
  country_id: i64,
  window: DateRange,
) -> Result<Vec<Point>> {
  country(config, country_id)?;
  let raw = reader
    .series(SeriesKey::new(config.policy.embi_variable, country_id), window)
    .await?;
  Ok(raw.into_iter().map(|p| Point::new(p.date, p.value * 100.0)).collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrencySeries {
  pub country_id: i64,
  pub code:       String,
  pub name:       String,
  pub points:     Vec<Point>,
}

/// Each dashboard country's USD rate rebased to 100 at the window start.
/// Countries with an empty or zero-based series come back with no points.
pub async fn currency_series<S: SeriesStore>(
  reader: Reader<'_, S>,
  config: &AnalyticsConfig,
  window: DateRange,
) -> Result<Vec<CurrencySeries>> {
  let mut out = Vec::with_capacity(config.policy.countries.len());
  for c in &config.policy.countries {
    let raw = reader.series(SeriesKey::new(config.fx_variable, c.id), window).await?;
    out.push(CurrencySeries {
      country_id: c.id,
      code:       c.code.clone(),
      name:       reader.country_name(c.id).await?,
      points:     normalize(&raw).unwrap_or_default(),
    });
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;

  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, day).unwrap() }

  #[test]
  fn yoy_uses_same_month_a_year_back() {
    let cpi = [
      Point::new(d(2023, 5, 1), 200.0),
      Point::new(d(2023, 6, 1), 201.0),
      Point::new(d(2024, 5, 1), 208.0),
      Point::new(d(2024, 6, 1), 210.0),
    ];
    let (date, yoy) = yoy_inflation(&cpi).unwrap();
    assert_eq!(date, d(2024, 6, 1));
    assert_relative_eq!(yoy, 4.477_611_940, epsilon = 1e-6);
  }

  #[test]
  fn yoy_falls_back_to_nearest_earlier_month() {
    let cpi = [Point::new(d(2023, 4, 1), 100.0), Point::new(d(2024, 6, 1), 105.0)];
    let (_, yoy) = yoy_inflation(&cpi).unwrap();
    assert_relative_eq!(yoy, 5.0, epsilon = 1e-9);
    assert!(yoy_inflation(&[Point::new(d(2024, 6, 1), 105.0)]).is_none());
  }

  #[test]
  fn last_change_finds_start_of_current_run() {
    let newest_first = [
      Point::new(d(2024, 6, 3), 9.0),
      Point::new(d(2024, 6, 2), 9.0),
      Point::new(d(2024, 5, 20), 9.0),
      Point::new(d(2024, 5, 19), 9.5),
      Point::new(d(2024, 5, 1), 9.5),
    ];
    let rc = last_change(&newest_first).unwrap();
    assert_eq!(rc.rate, 9.0);
    assert_eq!(rc.since, d(2024, 5, 20));
    assert_eq!(rc.change, Some(-0.5));
  }

  #[test]
  fn unchanged_rate_has_no_change() {
    let rc = last_change(&[Point::new(d(2024, 1, 2), 4.0), Point::new(d(2024, 1, 1), 4.0)]).unwrap();
    assert_eq!(rc.since, d(2024, 1, 1));
    assert_eq!(rc.change, None);
    assert!(last_change(&[]).is_none());
  }

  #[test]
  fn real_rate_formula() {
    assert_relative_eq!(real_rate(9.0, 5.0), 3.809_523_809, epsilon = 1e-6);
  }
}
