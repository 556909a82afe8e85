//! Periodicity conversion to month-start series.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use cifras_core::series::{Periodicity, Point, month_start};

/// Convert a series to monthly points dated on the first of each month.
///
/// Monthly input is re-anchored to day 1 with values untouched (a month that
/// appears twice keeps its latest point). Daily and weekly input is bucketed
/// by month and averaged.
pub fn to_monthly(points: &[Point], periodicity: Periodicity) -> Vec<Point> {
  match periodicity {
    Periodicity::Monthly => latest_per_month(points),
    Periodicity::Daily | Periodicity::Weekly => month_means(points),
  }
}

/// One point per month holding the last value seen in that month.
pub fn latest_per_month(points: &[Point]) -> Vec<Point> {
  let mut months: BTreeMap<NaiveDate, (NaiveDate, f64)> = BTreeMap::new();
  for p in points {
    let slot = months.entry(month_start(p.date)).or_insert((p.date, p.value));
    if p.date >= slot.0 {
      *slot = (p.date, p.value);
    }
  }
  months
    .into_iter()
    .map(|(month, (_, value))| Point::new(month, value))
    .collect()
}

fn month_means(points: &[Point]) -> Vec<Point> {
  let mut buckets: BTreeMap<NaiveDate, (f64, u32)> = BTreeMap::new();
  for p in points {
    let (sum, n) = buckets.entry(month_start(p.date)).or_insert((0.0, 0));
    *sum += p.value;
    *n += 1;
  }
  buckets
    .into_iter()
    .map(|(month, (sum, n))| Point::new(month, sum / f64::from(n)))
    .collect()
}
