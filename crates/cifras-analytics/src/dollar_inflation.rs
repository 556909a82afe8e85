//! Inflation in dollars per country: the monthly CPI / FX quotient rebased to
//! 100, with the relative change of the index and both components.

use std::collections::HashSet;

use chrono::NaiveDate;
use cifras_core::{
  Error, Result,
  series::{DateRange, Pid, Point, SeriesKey},
  store::SeriesStore,
  table::WideTable,
};
use serde::Serialize;
use tracing::debug;

use crate::{
  config::AnalyticsConfig,
  index::{align, normalize, variation_percent},
  omit::{OmitReason, Omitted, only_reference_gaps},
  reader::Reader,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DollarPoint {
  pub date:  NaiveDate,
  /// Base-100 index.
  pub index: f64,
  /// `cpi / fx` before rebasing.
  pub raw:   f64,
  pub cpi:   f64,
  pub fx:    f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountryInflation {
  pub pid:         Pid,
  pub country_id:  i64,
  pub country:     String,
  pub points:      Vec<DollarPoint>,
  pub first_date:  NaiveDate,
  pub last_date:   NaiveDate,
  pub delta_index: Option<f64>,
  pub delta_fx:    Option<f64>,
  pub delta_cpi:   Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DollarInflationResult {
  pub countries: Vec<CountryInflation>,
  pub omitted:   Vec<Omitted>,
}

/// Compute the index for every country named by `pids`. Only the country half
/// of each id matters; duplicates are computed once.
pub async fn compute<S: SeriesStore>(
  reader: Reader<'_, S>,
  config: &AnalyticsConfig,
  pids: &[Pid],
  window: DateRange,
) -> Result<DollarInflationResult> {
  if pids.is_empty() {
    return Err(Error::bad_request("at least one country is required"));
  }

  let mut seen = HashSet::new();
  let mut countries = Vec::new();
  let mut omitted = Vec::new();
  for pid in pids {
    let country_id = pid.decode().country_id;
    if !seen.insert(country_id) {
      continue;
    }
    match country(reader, config, country_id, window).await? {
      Ok(c) => countries.push(c),
      Err(o) => {
        debug!(country_id, reason = ?o.reason, "dollar inflation country omitted");
        omitted.push(o);
      }
    }
  }

  if only_reference_gaps(countries.len(), &omitted) {
    return Err(Error::Unavailable(
      "ningún país seleccionado tiene IPC y tipo de cambio en el rango".to_owned(),
    ));
  }
  Ok(DollarInflationResult { countries, omitted })
}

async fn country<S: SeriesStore>(
  reader: Reader<'_, S>,
  config: &AnalyticsConfig,
  country_id: i64,
  window: DateRange,
) -> Result<Result<CountryInflation, Omitted>> {
  let fx_key = SeriesKey::new(config.fx_variable, country_id);
  let cpi_key = SeriesKey::new(config.cpi_variable, country_id);
  let pid = fx_key.pid();
  let name = reader.country_name(country_id).await?;
  let omit = |reason| Omitted::new(pid, Some(name.clone()), reason);
  // Whole first month, so the FX mean and the CPI reading line up.
  let fetch = window.widen_to_month_start();

  if reader.maestro(fx_key).await?.is_none() {
    return Ok(Err(omit(OmitReason::NoFx)));
  }
  let fx = reader.monthly(fx_key, fetch).await?;
  if fx.is_empty() {
    let last = reader.latest_at(fx_key, None).await?.map(|p| p.date);
    return Ok(Err(omit(OmitReason::NoFx).with_last_date(last)));
  }
  let cpi = reader.monthly(cpi_key, fetch).await?;
  if cpi.is_empty() {
    let last = reader.latest_at(cpi_key, None).await?.map(|p| p.date);
    return Ok(Err(omit(OmitReason::NoCpi).with_last_date(last)));
  }

  let joined: Vec<(NaiveDate, f64, f64)> =
    align(&cpi, &fx).into_iter().filter(|&(_, _, fx)| fx > 0.0).collect();
  if joined.len() < 2 {
    return Ok(Err(omit(OmitReason::FewerThanTwoPoints)));
  }
  let raw: Vec<Point> = joined.iter().map(|&(d, c, f)| Point::new(d, c / f)).collect();
  let Some(normalized) = normalize(&raw) else {
    return Ok(Err(omit(OmitReason::FirstPointZero)));
  };

  let points: Vec<DollarPoint> = joined
    .iter()
    .zip(raw.iter().zip(&normalized))
    .map(|(&(date, cpi, fx), (r, n))| DollarPoint { date, index: n.value, raw: r.value, cpi, fx })
    .collect();

  let (first, last) = (points[0], points[points.len() - 1]);
  Ok(Ok(CountryInflation {
    pid,
    country_id,
    country: name,
    first_date: first.date,
    last_date: last.date,
    delta_index: variation_percent(first.index, last.index),
    delta_fx: variation_percent(first.fx, last.fx),
    delta_cpi: variation_percent(first.cpi, last.cpi),
    points,
  }))
}

/// The three export sheets: normalized index, raw quotient and the CPI / FX
/// components, each in wide form with one column per country.
pub fn export_tables(result: &DollarInflationResult) -> Vec<WideTable> {
  let column = |f: fn(&DollarPoint) -> f64| -> Vec<(String, Vec<Point>)> {
    result
      .countries
      .iter()
      .map(|c| {
        let pts = c.points.iter().map(|p| Point::new(p.date, f(p))).collect();
        (c.country.clone(), pts)
      })
      .collect()
  };

  let mut components: Vec<(String, Vec<Point>)> = Vec::new();
  for c in &result.countries {
    components.push((
      format!("{} IPC", c.country),
      c.points.iter().map(|p| Point::new(p.date, p.cpi)).collect(),
    ));
    components.push((
      format!("{} TC", c.country),
      c.points.iter().map(|p| Point::new(p.date, p.fx)).collect(),
    ));
  }

  vec![
    WideTable::pivot("Índice base 100", &column(|p| p.index)),
    WideTable::pivot("Índice bruto", &column(|p| p.raw)),
    WideTable::pivot("IPC y tipo de cambio", &components),
  ]
}
