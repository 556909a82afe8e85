//! Tidy export: long-form observations pivoted into one wide sheet per
//! variable, with countries as columns.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use cifras_core::{
  Error, Result,
  catalog::{Country, MaestroFilter},
  series::{DateRange, Point},
  store::SeriesStore,
  table::WideTable,
};
use serde::Serialize;

use crate::reader::Reader;

/// Rows returned by the preview.
pub const PREVIEW_ROWS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TidyRow {
  pub date:        NaiveDate,
  pub variable_id: i64,
  pub variable:    String,
  pub country_id:  i64,
  pub country:     String,
  pub value:       f64,
}

#[derive(Debug, Clone)]
pub struct Selection<'a> {
  pub variable_ids: &'a [i64],
  pub country_ids:  &'a [i64],
  pub window:       DateRange,
}

impl Selection<'_> {
  fn validate(&self) -> Result<()> {
    if self.variable_ids.is_empty() {
      return Err(Error::bad_request("at least one variable is required"));
    }
    if self.country_ids.is_empty() {
      return Err(Error::bad_request("at least one country is required"));
    }
    Ok(())
  }
}

struct Names {
  variables: HashMap<i64, String>,
  countries: HashMap<i64, String>,
}

impl Names {
  async fn load<S: SeriesStore>(reader: Reader<'_, S>) -> Result<Self> {
    Ok(Self {
      variables: reader.variables().await?.into_iter().map(|v| (v.id, v.name)).collect(),
      countries: reader.countries().await?.into_iter().map(|c| (c.id, c.name)).collect(),
    })
  }

  fn variable(&self, id: i64) -> String {
    self.variables.get(&id).cloned().unwrap_or_else(|| format!("Variable {id}"))
  }

  fn country(&self, id: i64) -> String {
    self.countries.get(&id).cloned().unwrap_or_else(|| id.to_string())
  }
}

/// The last rows of the selection in long form, oldest first.
pub async fn preview<S: SeriesStore>(
  reader: Reader<'_, S>,
  selection: &Selection<'_>,
) -> Result<Vec<TidyRow>> {
  selection.validate()?;
  let names = Names::load(reader).await?;
  let mut rows = reader
    .long(selection.variable_ids, selection.country_ids, selection.window)
    .await?;
  rows.sort_by(|a, b| {
    a.date
      .cmp(&b.date)
      .then(a.variable_id.cmp(&b.variable_id))
      .then(a.country_id.cmp(&b.country_id))
  });
  let skip = rows.len().saturating_sub(PREVIEW_ROWS);
  Ok(
    rows
      .into_iter()
      .skip(skip)
      .map(|o| TidyRow {
        date:        o.date,
        variable:    names.variable(o.variable_id),
        variable_id: o.variable_id,
        country:     names.country(o.country_id),
        country_id:  o.country_id,
        value:       o.value,
      })
      .collect(),
  )
}

/// One wide table per requested variable. Columns follow the requested
/// country order; countries without data for a variable still get a column.
pub async fn export<S: SeriesStore>(
  reader: Reader<'_, S>,
  selection: &Selection<'_>,
) -> Result<Vec<WideTable>> {
  selection.validate()?;
  let names = Names::load(reader).await?;
  let rows = reader
    .long(selection.variable_ids, selection.country_ids, selection.window)
    .await?;

  let mut by_series: HashMap<(i64, i64), Vec<Point>> = HashMap::new();
  for o in &rows {
    by_series.entry((o.variable_id, o.country_id)).or_default().push(o.point());
  }

  let mut seen = BTreeSet::new();
  let mut tables = Vec::new();
  for &v in selection.variable_ids {
    if !seen.insert(v) {
      continue;
    }
    let columns: Vec<(String, Vec<Point>)> = selection
      .country_ids
      .iter()
      .map(|&c| (names.country(c), by_series.remove(&(v, c)).unwrap_or_default()))
      .collect();
    tables.push(WideTable::pivot(names.variable(v), &columns));
  }
  Ok(tables)
}

/// Countries with a Maestro declaration for any of `variable_ids`, by name.
pub async fn countries_for<S: SeriesStore>(
  reader: Reader<'_, S>,
  variable_ids: &[i64],
) -> Result<Vec<Country>> {
  let mut ids = BTreeSet::new();
  for &v in variable_ids {
    let filter = MaestroFilter { variable_id: Some(v), ..Default::default() };
    ids.extend(reader.maestros(filter).await?.into_iter().map(|m| m.country_id));
  }
  let mut countries: Vec<Country> =
    reader.countries().await?.into_iter().filter(|c| ids.contains(&c.id)).collect();
  countries.sort_by(|a, b| a.name.cmp(&b.name));
  Ok(countries)
}
