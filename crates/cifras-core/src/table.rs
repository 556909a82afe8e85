//! Wide-form tables: one row per date, one column per series.
//!
//! The pivot target for spreadsheet exports. Cells are `None` where a series
//! has no observation on a row's date.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::series::Point;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WideRow {
  pub date:   NaiveDate,
  pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WideTable {
  /// Sheet title.
  pub name:    String,
  /// Column headers after the leading `date` column.
  pub columns: Vec<String>,
  pub rows:    Vec<WideRow>,
}

impl WideTable {
  /// Pivot named series into a table. Row dates are the union of every
  /// series' dates, ascending; columns keep the order of `series`.
  pub fn pivot(name: impl Into<String>, series: &[(String, Vec<Point>)]) -> Self {
    let dates: BTreeSet<NaiveDate> = series
      .iter()
      .flat_map(|(_, pts)| pts.iter().map(|p| p.date))
      .collect();
    let lookups: Vec<BTreeMap<NaiveDate, f64>> = series
      .iter()
      .map(|(_, pts)| pts.iter().map(|p| (p.date, p.value)).collect())
      .collect();

    let rows = dates
      .into_iter()
      .map(|date| WideRow {
        date,
        values: lookups.iter().map(|m| m.get(&date).copied()).collect(),
      })
      .collect();

    Self {
      name: name.into(),
      columns: series.iter().map(|(label, _)| label.clone()).collect(),
      rows,
    }
  }

  /// Un-pivot back into `(column, date, value)` triples, skipping empty cells.
  pub fn cells(&self) -> impl Iterator<Item = (&str, NaiveDate, f64)> + '_ {
    self.rows.iter().flat_map(move |row| {
      self
        .columns
        .iter()
        .zip(&row.values)
        .filter_map(move |(col, v)| v.map(|v| (col.as_str(), row.date, v)))
    })
  }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }
}
