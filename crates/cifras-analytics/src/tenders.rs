//! LRM tender auctions joined with BEVSA reference rates.
//!
//! Each tenor bucket tracks one auction per date through three variables
//! (announced amount, adjudicated ratio, cut rate). The bucket's BEVSA tenor
//! is the comparator for the cut rate.

use std::collections::HashMap;

use chrono::NaiveDate;
use cifras_core::{
  Error, Result,
  series::{DateRange, Point, SeriesKey, days_before},
  store::SeriesStore,
};
use serde::Serialize;

use crate::{
  config::{TenderBucket, TenderConfig},
  reader::Reader,
  yield_curve::{self, CurveKind, CurvePoint},
};

fn bucket(config: &TenderConfig, days: u32) -> Result<&TenderBucket> {
  config
    .bucket(days)
    .ok_or_else(|| Error::bad_request(format!("unknown tenor {days}; expected 30, 90, 180 or 360")))
}

// ─── Proximity ───────────────────────────────────────────────────────────────

/// How close an auction's cut rate landed to the BEVSA reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Proximity {
  /// `|Δ| ≤ 0.5` pp.
  Green,
  /// `|Δ| ≤ 1.0` pp.
  Amber,
  Red,
}

impl Proximity {
  pub fn classify(cut_rate: f64, bevsa: f64) -> Self {
    let gap = (cut_rate - bevsa).abs();
    if gap <= 0.5 {
      Self::Green
    } else if gap <= 1.0 {
      Self::Amber
    } else {
      Self::Red
    }
  }

  fn between(cut_rate: Option<f64>, bevsa: Option<f64>) -> Option<Self> {
    Some(Self::classify(cut_rate?, bevsa?))
  }
}

// ─── Auction enumeration ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuctionKey {
  pub date:  NaiveDate,
  pub tenor: u32,
}

/// Every `(date, tenor)` with auction data, newest first.
pub async fn auctions<S: SeriesStore>(
  reader: Reader<'_, S>,
  config: &TenderConfig,
) -> Result<Vec<AuctionKey>> {
  let mut out = Vec::new();
  for b in &config.buckets {
    for date in reader.dates(&b.auction_variables(), config.country_id).await? {
      out.push(AuctionKey { date, tenor: b.days });
    }
  }
  out.sort_by(|a, b| b.date.cmp(&a.date).then(a.tenor.cmp(&b.tenor)));
  Ok(out)
}

// ─── Single auction ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Auction {
  pub date:               NaiveDate,
  pub tenor:              u32,
  pub announced:          Option<f64>,
  /// In `[0, 1]`.
  pub adjudicated_ratio:  Option<f64>,
  pub adjudicated_amount: Option<f64>,
  pub cut_rate:           Option<f64>,
  pub bevsa_rate:         Option<f64>,
  pub bevsa_date:         Option<NaiveDate>,
  pub proximity:          Option<Proximity>,
}

async fn load_auction<S: SeriesStore>(
  reader: Reader<'_, S>,
  config: &TenderConfig,
  b: &TenderBucket,
  date: NaiveDate,
) -> Result<Auction> {
  let values: HashMap<i64, f64> = reader
    .values_on(&b.auction_variables(), config.country_id, date)
    .await?
    .into_iter()
    .collect();
  let bevsa = reader
    .latest_at(SeriesKey::new(b.bevsa, config.country_id), Some(date))
    .await?;

  let announced = values.get(&b.announced).copied();
  let adjudicated_ratio = values.get(&b.adjudicated).copied();
  let cut_rate = values.get(&b.cut_rate).copied();
  let bevsa_rate = bevsa.map(|p| p.value);
  Ok(Auction {
    date,
    tenor: b.days,
    announced,
    adjudicated_ratio,
    adjudicated_amount: announced.zip(adjudicated_ratio).map(|(a, r)| a * r),
    cut_rate,
    bevsa_rate,
    bevsa_date: bevsa.map(|p| p.date),
    proximity: Proximity::between(cut_rate, bevsa_rate),
  })
}

/// The auction held on `date` for `tenor` days, with the latest BEVSA rate on
/// or before that date.
pub async fn auction<S: SeriesStore>(
  reader: Reader<'_, S>,
  config: &TenderConfig,
  date: NaiveDate,
  tenor: u32,
) -> Result<Auction> {
  let b = bucket(config, tenor)?;
  let a = load_auction(reader, config, b, date).await?;
  if a.announced.is_none() && a.adjudicated_ratio.is_none() && a.cut_rate.is_none() {
    return Err(Error::not_found(format!("licitación a {tenor} días del {date}")));
  }
  Ok(a)
}

// ─── BEVSA reference ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BevsaReference {
  pub tenor:       u32,
  pub variable_id: i64,
  pub latest:      Option<Point>,
  /// Extremes over the last five observations.
  pub min:         Option<Point>,
  pub max:         Option<Point>,
}

pub async fn bevsa_reference<S: SeriesStore>(
  reader: Reader<'_, S>,
  config: &TenderConfig,
  tenor: u32,
  on_or_before: Option<NaiveDate>,
) -> Result<BevsaReference> {
  let b = bucket(config, tenor)?;
  let recent = reader
    .recent(SeriesKey::new(b.bevsa, config.country_id), on_or_before, 5)
    .await?;
  Ok(BevsaReference {
    tenor,
    variable_id: b.bevsa,
    latest: recent.first().copied(),
    min: recent.iter().copied().min_by(|a, b| a.value.total_cmp(&b.value)),
    max: recent.iter().copied().max_by(|a, b| a.value.total_cmp(&b.value)),
  })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BevsaCurve {
  pub date:   Option<NaiveDate>,
  pub points: Vec<CurvePoint>,
}

/// The full nominal BEVSA curve on the most recent trading date on or before
/// `on_or_before`.
pub async fn bevsa_curve<S: SeriesStore>(
  reader: Reader<'_, S>,
  config: &TenderConfig,
  on_or_before: Option<NaiveDate>,
) -> Result<BevsaCurve> {
  let dates = yield_curve::available_dates(reader, config.country_id, Some(CurveKind::Nominal))
    .await?
    .dates;
  let Some(date) = dates.into_iter().find(|d| on_or_before.is_none_or(|limit| *d <= limit))
  else {
    return Ok(BevsaCurve { date: None, points: Vec::new() });
  };
  let points = yield_curve::snapshot(reader, config.country_id, CurveKind::Nominal, date).await?;
  Ok(BevsaCurve { date: Some(date), points })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BevsaHistory {
  pub tenor:  u32,
  pub from:   Option<NaiveDate>,
  pub to:     Option<NaiveDate>,
  pub points: Vec<Point>,
}

/// BEVSA rate for a tenor over `[reference − days, reference]`, where the
/// reference is `on_or_before` or the latest observation.
pub async fn bevsa_history<S: SeriesStore>(
  reader: Reader<'_, S>,
  config: &TenderConfig,
  tenor: u32,
  days: Option<u64>,
  on_or_before: Option<NaiveDate>,
) -> Result<BevsaHistory> {
  let b = bucket(config, tenor)?;
  let key = SeriesKey::new(b.bevsa, config.country_id);
  let reference = match on_or_before {
    Some(d) => Some(d),
    None => reader.latest_at(key, None).await?.map(|p| p.date),
  };
  let Some(to) = reference else {
    return Ok(BevsaHistory { tenor, from: None, to: None, points: Vec::new() });
  };
  let from = days_before(to, days.unwrap_or(config.history_days));
  let points = reader.series(key, DateRange::between(from, to)?).await?;
  Ok(BevsaHistory { tenor, from: Some(from), to: Some(to), points })
}

// ─── Last-N aggregate ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuctionRow {
  pub date:               NaiveDate,
  pub announced:          f64,
  /// Adjudicated ratio in percent.
  pub adjudicated_pct:    f64,
  pub adjudicated_amount: f64,
  pub cut_rate:           Option<f64>,
  pub bevsa_rate:         Option<f64>,
  pub proximity:          Option<Proximity>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedAuction {
  pub date:   NaiveDate,
  pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastAuctions {
  pub tenor:             u32,
  pub rows:              Vec<AuctionRow>,
  pub omitted:           Vec<SkippedAuction>,
  pub total_announced:   f64,
  pub total_adjudicated: f64,
  /// `total_adjudicated / total_announced · 100`; `null` when nothing was
  /// announced.
  pub weighted_ratio:    Option<f64>,
}

/// The most recent `config.last_n` auctions on or before `on_or_before`,
/// aggregated into a weighted adjudication ratio.
pub async fn last_auctions<S: SeriesStore>(
  reader: Reader<'_, S>,
  config: &TenderConfig,
  tenor: u32,
  on_or_before: Option<NaiveDate>,
) -> Result<LastAuctions> {
  let b = bucket(config, tenor)?;
  let dates: Vec<NaiveDate> = reader
    .dates(&[b.announced], config.country_id)
    .await?
    .into_iter()
    .filter(|d| on_or_before.is_none_or(|limit| *d <= limit))
    .take(config.last_n)
    .collect();

  let mut rows = Vec::with_capacity(dates.len());
  let mut omitted = Vec::new();
  for date in dates {
    let a = load_auction(reader, config, b, date).await?;
    let (Some(announced), Some(ratio)) = (a.announced, a.adjudicated_ratio) else {
      omitted.push(SkippedAuction { date, reason: "sin ratio adjudicado" });
      continue;
    };
    rows.push(AuctionRow {
      date,
      announced,
      adjudicated_pct: ratio * 100.0,
      adjudicated_amount: announced * ratio,
      cut_rate: a.cut_rate,
      bevsa_rate: a.bevsa_rate,
      proximity: a.proximity,
    });
  }

  let total_announced: f64 = rows.iter().map(|r| r.announced).sum();
  let total_adjudicated: f64 = rows.iter().map(|r| r.adjudicated_amount).sum();
  let weighted_ratio = (total_announced != 0.0).then(|| total_adjudicated / total_announced * 100.0);
  Ok(LastAuctions {
    tenor,
    rows,
    omitted,
    total_announced,
    total_adjudicated,
    weighted_ratio,
  })
}

// ─── Report bundle ───────────────────────────────────────────────────────────

/// Everything the external PDF renderer needs for one auction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenderReport {
  pub auction:   Auction,
  pub reference: BevsaReference,
  pub last:      LastAuctions,
  pub curve:     BevsaCurve,
  pub history:   BevsaHistory,
}

pub async fn report<S: SeriesStore>(
  reader: Reader<'_, S>,
  config: &TenderConfig,
  date: NaiveDate,
  tenor: u32,
) -> Result<TenderReport> {
  Ok(TenderReport {
    auction:   auction(reader, config, date, tenor).await?,
    reference: bevsa_reference(reader, config, tenor, Some(date)).await?,
    last:      last_auctions(reader, config, tenor, Some(date)).await?,
    curve:     bevsa_curve(reader, config, Some(date)).await?,
    history:   bevsa_history(reader, config, tenor, None, Some(date)).await?,
  })
}
