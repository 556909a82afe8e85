//! Index arithmetic shared by the engines.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use cifras_core::series::Point;
use serde::Serialize;

/// Rebase a series so its first point equals exactly 100.
///
/// `None` when the series is empty or its first value is zero or not finite.
pub fn normalize(points: &[Point]) -> Option<Vec<Point>> {
  let base = points.first()?.value;
  if base == 0.0 || !base.is_finite() {
    return None;
  }
  let factor = 100.0 / base;
  Some(
    points
      .iter()
      .enumerate()
      .map(|(i, p)| Point::new(p.date, if i == 0 { 100.0 } else { p.value * factor }))
      .collect(),
  )
}

/// Relative change `(last / first − 1) · 100`.
pub fn variation_percent(first: f64, last: f64) -> Option<f64> {
  (first != 0.0 && first.is_finite() && last.is_finite()).then(|| (last / first - 1.0) * 100.0)
}

/// Signed difference in percentage points, rounded to four decimals.
pub fn pp_change(current: Option<f64>, past: Option<f64>) -> Option<f64> {
  Some(round_to(current? - past?, 4))
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
  let scale = 10f64.powi(decimals);
  (value * scale).round() / scale
}

/// Points of `a` and `b` sharing a date, ascending.
pub fn align(a: &[Point], b: &[Point]) -> Vec<(NaiveDate, f64, f64)> {
  let right: BTreeMap<NaiveDate, f64> = b.iter().map(|p| (p.date, p.value)).collect();
  a.iter()
    .filter_map(|p| right.get(&p.date).map(|&v| (p.date, p.value, v)))
    .collect()
}

/// First/last summary of an index series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
  pub first_date:        NaiveDate,
  pub last_date:         NaiveDate,
  pub first_index:       f64,
  pub last_index:        f64,
  pub variation_percent: f64,
}

impl Summary {
  pub fn of(points: &[Point]) -> Option<Self> {
    let first = points.first()?;
    let last = points.last()?;
    Some(Self {
      first_date:        first.date,
      last_date:         last.date,
      first_index:       first.value,
      last_index:        last.value,
      variation_percent: variation_percent(first.value, last.value)?,
    })
  }
}
