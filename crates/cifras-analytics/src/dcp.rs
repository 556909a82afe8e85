//! DCP real-price index.
//!
//! Each product's local price is converted with the FX series matching its
//! declared currency, deflated by CPI when nominal, clipped to the window and
//! rebased to 100:
//!
//! ```text
//! index(m) = price(m) · fx(m) / cpi(m)      (nominal)
//! index(m) = price(m) · fx(m)               (real)
//! ```
//!
//! The three reference series (USD/UYU, EUR/UYU, CPI) are fetched at most once
//! per [`DcpEngine`], which lives for a single request.

use std::{
  collections::{BTreeMap, HashMap},
  str::FromStr,
};

use chrono::NaiveDate;
use cifras_core::{
  Error, Result,
  catalog::{Currency, Valuation},
  series::{DateRange, Pid, Point, SeriesKey},
  store::SeriesStore,
};
use serde::Serialize;
use tracing::debug;

use crate::{
  config::{AnalyticsConfig, DcpReferences},
  index::{Summary, normalize},
  monthly::to_monthly,
  omit::{OmitReason, Omitted, only_reference_gaps},
  reader::Reader,
};

// ─── Output types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct DcpSeries {
  pub pid:             Pid,
  pub name:            String,
  pub country:         String,
  pub label:           String,
  pub currency:        Option<Currency>,
  pub nominal_or_real: Option<Valuation>,
  pub points:          Vec<Point>,
  #[serde(flatten)]
  pub summary:         Summary,
}

#[derive(Debug, Clone, Serialize)]
pub struct DcpResult {
  pub series:  Vec<DcpSeries>,
  pub omitted: Vec<Omitted>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Variation {
  pub pid:               Pid,
  pub name:              String,
  pub first_index:       f64,
  pub last_index:        f64,
  pub variation_percent: f64,
  pub first_date:        NaiveDate,
  pub last_date:         NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariationsResult {
  pub items:   Vec<Variation>,
  pub omitted: Vec<Omitted>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
  Asc,
  #[default]
  Desc,
}

impl FromStr for SortOrder {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "asc" => Ok(Self::Asc),
      "desc" => Ok(Self::Desc),
      other => Err(Error::bad_request(format!("unknown sort order {other:?}"))),
    }
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct DcpEngine<'s, S> {
  reader: Reader<'s, S>,
  refs:   &'s DcpReferences,
  window: DateRange,
  /// Widened to whole months so the first month's average is complete.
  fetch:  DateRange,
  cache:  HashMap<SeriesKey, BTreeMap<NaiveDate, f64>>,
}

impl<'s, S: SeriesStore> DcpEngine<'s, S> {
  pub fn new(reader: Reader<'s, S>, config: &'s AnalyticsConfig, window: DateRange) -> Self {
    Self {
      reader,
      refs: &config.dcp,
      window,
      fetch: window.widen_to_month_start(),
      cache: HashMap::new(),
    }
  }

  async fn load_reference(&mut self, key: SeriesKey) -> Result<()> {
    if !self.cache.contains_key(&key) {
      let monthly = self.reader.monthly(key, self.fetch).await?;
      self.cache.insert(key, monthly.into_iter().map(|p| (p.date, p.value)).collect());
    }
    Ok(())
  }

  fn reference(&self, key: SeriesKey) -> Option<&BTreeMap<NaiveDate, f64>> {
    self.cache.get(&key).filter(|m| !m.is_empty())
  }

  /// Compute one product's normalized index. The outer `Result` carries
  /// storage failures; the inner one an exclusion for the `omitted` list.
  pub async fn compute(&mut self, key: SeriesKey) -> Result<Result<DcpSeries, Omitted>> {
    let pid = key.pid();
    let Some(product) = self.reader.product(key).await? else {
      return Ok(Err(Omitted::new(pid, None, OmitReason::NotFound)));
    };
    let label = product.label();
    let omit = |reason| Omitted::new(pid, Some(label.clone()), reason);

    let raw = self.reader.series(key, self.fetch).await?;
    let last_data_date = match raw.last() {
      Some(p) => Some(p.date),
      None => self.reader.latest_at(key, None).await?.map(|p| p.date),
    };
    let prices: Vec<Point> = to_monthly(&raw, product.periodicity)
      .into_iter()
      .filter(|p| self.window.contains(p.date))
      .collect();
    if prices.is_empty() {
      return Ok(Err(omit(OmitReason::NoPricesInRange).with_last_date(last_data_date)));
    }

    let fx_key = match product.currency {
      Some(Currency::Usd) => Some(self.refs.usd),
      Some(Currency::Eur) => Some(self.refs.eur),
      Some(Currency::Uyu) | None => None,
    };
    let deflate = product.nominal_or_real != Some(Valuation::Real);
    let cpi_key = self.refs.cpi;

    if let Some(k) = fx_key {
      self.load_reference(k).await?;
      if self.reference(k).is_none() {
        return Ok(Err(omit(OmitReason::NoFx).with_last_date(last_data_date)));
      }
    }
    if deflate {
      self.load_reference(cpi_key).await?;
      if self.reference(cpi_key).is_none() {
        return Ok(Err(omit(OmitReason::NoCpi).with_last_date(last_data_date)));
      }
    }

    let fx = fx_key.and_then(|k| self.reference(k));
    let cpi = if deflate { self.reference(cpi_key) } else { None };
    let index: Vec<Point> = prices
      .iter()
      .filter_map(|p| {
        let rate = match fx {
          Some(series) => *series.get(&p.date)?,
          None => 1.0,
        };
        let base = p.value * rate;
        if !deflate {
          return Some(Point::new(p.date, base));
        }
        let deflator = *cpi?.get(&p.date)?;
        (deflator > 0.0).then(|| Point::new(p.date, base / deflator))
      })
      .collect();

    if index.len() < 2 {
      return Ok(Err(omit(OmitReason::FewerThanTwoPoints).with_last_date(last_data_date)));
    }
    let Some(points) = normalize(&index) else {
      return Ok(Err(omit(OmitReason::FirstPointZero).with_last_date(last_data_date)));
    };
    let Some(summary) = Summary::of(&points) else {
      return Ok(Err(omit(OmitReason::FirstPointZero).with_last_date(last_data_date)));
    };

    Ok(Ok(DcpSeries {
      pid,
      name: product.name,
      country: product.country,
      label,
      currency: product.currency,
      nominal_or_real: product.nominal_or_real,
      points,
      summary,
    }))
  }

  async fn compute_all(
    &mut self,
    keys: Vec<SeriesKey>,
  ) -> Result<(Vec<DcpSeries>, Vec<Omitted>)> {
    let mut series = Vec::new();
    let mut omitted = Vec::new();
    for key in keys {
      match self.compute(key).await? {
        Ok(s) => series.push(s),
        Err(o) => {
          debug!(pid = %o.pid, reason = ?o.reason, "dcp product omitted");
          omitted.push(o);
        }
      }
    }
    if only_reference_gaps(series.len(), &omitted) {
      return Err(Error::Unavailable(
        "no hay datos de IPC o tipo de cambio en el rango".to_owned(),
      ));
    }
    Ok((series, omitted))
  }
}

// ─── Entry points ────────────────────────────────────────────────────────────

/// Normalized DCP series for the requested products.
pub async fn indices<S: SeriesStore>(
  reader: Reader<'_, S>,
  config: &AnalyticsConfig,
  pids: &[Pid],
  window: DateRange,
) -> Result<DcpResult> {
  if pids.is_empty() {
    return Err(Error::bad_request("at least one product id is required"));
  }
  let mut engine = DcpEngine::new(reader, config, window);
  let keys: Vec<SeriesKey> = pids.iter().map(|p| p.decode()).collect();
  let (series, omitted) = engine.compute_all(keys).await?;
  Ok(DcpResult { series, omitted })
}

/// Ranked variation of every active product over the window.
pub async fn variations<S: SeriesStore>(
  reader: Reader<'_, S>,
  config: &AnalyticsConfig,
  window: DateRange,
  order: SortOrder,
) -> Result<VariationsResult> {
  let keys: Vec<SeriesKey> = reader.products(true).await?.iter().map(|p| p.key()).collect();
  let mut engine = DcpEngine::new(reader, config, window);
  let (series, omitted) = engine.compute_all(keys).await?;

  let mut items: Vec<Variation> = series
    .into_iter()
    .map(|s| Variation {
      pid:               s.pid,
      name:              s.label,
      first_index:       s.summary.first_index,
      last_index:        s.summary.last_index,
      variation_percent: s.summary.variation_percent,
      first_date:        s.summary.first_date,
      last_date:         s.summary.last_date,
    })
    .collect();
  items.sort_by(|a, b| {
    let ord = a.variation_percent.total_cmp(&b.variation_percent);
    match order {
      SortOrder::Asc => ord,
      SortOrder::Desc => ord.reverse(),
    }
    .then_with(|| a.pid.cmp(&b.pid))
  });

  Ok(VariationsResult { items, omitted })
}
