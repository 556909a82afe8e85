//! Series reader: typed retrieval over any [`SeriesStore`].
//!
//! The reader never computes. It validates inputs, forwards to the store and
//! lifts backend errors into [`cifras_core::Error`] so every engine can use
//! `?` against one error type.

use chrono::NaiveDate;
use cifras_core::{
  Result,
  catalog::{Country, Maestro, MaestroFilter, Product, Variable},
  series::{DateRange, Observation, Periodicity, Point, SeriesKey},
  store::SeriesStore,
};

use crate::monthly::to_monthly;

pub struct Reader<'s, S> {
  store: &'s S,
}

impl<S> Clone for Reader<'_, S> {
  fn clone(&self) -> Self { *self }
}

impl<S> Copy for Reader<'_, S> {}

impl<'s, S: SeriesStore> Reader<'s, S> {
  pub fn new(store: &'s S) -> Self { Self { store } }

  // ── Catalog lookups ───────────────────────────────────────────────────

  pub async fn maestro(&self, key: SeriesKey) -> Result<Option<Maestro>> {
    self.store.get_maestro(key).await.map_err(Into::into)
  }

  pub async fn maestros(&self, filter: MaestroFilter) -> Result<Vec<Maestro>> {
    self.store.list_maestros(filter).await.map_err(Into::into)
  }

  /// Declared periodicity of `key`, or `None` when the pair is not tracked.
  pub async fn periodicity(&self, key: SeriesKey) -> Result<Option<Periodicity>> {
    Ok(self.maestro(key).await?.map(|m| m.fields.periodicity))
  }

  pub async fn product(&self, key: SeriesKey) -> Result<Option<Product>> {
    self.store.get_product(key).await.map_err(Into::into)
  }

  pub async fn products(&self, active_only: bool) -> Result<Vec<Product>> {
    self.store.list_products(active_only).await.map_err(Into::into)
  }

  pub async fn country(&self, id: i64) -> Result<Option<Country>> {
    self.store.get_country(id).await.map_err(Into::into)
  }

  pub async fn countries(&self) -> Result<Vec<Country>> {
    self.store.list_countries().await.map_err(Into::into)
  }

  pub async fn variables(&self) -> Result<Vec<Variable>> {
    self.store.list_variables(None).await.map_err(Into::into)
  }

  /// Display name of a country, falling back to its id.
  pub async fn country_name(&self, id: i64) -> Result<String> {
    Ok(self.country(id).await?.map_or_else(|| id.to_string(), |c| c.name))
  }

  // ── Observations ──────────────────────────────────────────────────────

  /// Ascending `(date, value)` pairs of `key` inside `range`. A series that
  /// does not exist reads as empty.
  pub async fn series(&self, key: SeriesKey, range: DateRange) -> Result<Vec<Point>> {
    self.store.read_series(key, range).await.map_err(Into::into)
  }

  /// The series converted to month starts using its declared periodicity.
  /// Untracked pairs read as empty.
  pub async fn monthly(&self, key: SeriesKey, range: DateRange) -> Result<Vec<Point>> {
    let Some(periodicity) = self.periodicity(key).await? else {
      return Ok(Vec::new());
    };
    let raw = self.series(key, range).await?;
    Ok(to_monthly(&raw, periodicity))
  }

  pub async fn long(
    &self,
    variable_ids: &[i64],
    country_ids: &[i64],
    range: DateRange,
  ) -> Result<Vec<Observation>> {
    self
      .store
      .read_long(variable_ids, country_ids, range)
      .await
      .map_err(Into::into)
  }

  pub async fn latest_at(
    &self,
    key: SeriesKey,
    on_or_before: Option<NaiveDate>,
  ) -> Result<Option<Point>> {
    self.store.latest_at(key, on_or_before).await.map_err(Into::into)
  }

  /// Newest first.
  pub async fn recent(
    &self,
    key: SeriesKey,
    on_or_before: Option<NaiveDate>,
    limit: usize,
  ) -> Result<Vec<Point>> {
    self.store.recent(key, on_or_before, limit).await.map_err(Into::into)
  }

  /// Distinct dates across `variable_ids`, newest first.
  pub async fn dates(&self, variable_ids: &[i64], country_id: i64) -> Result<Vec<NaiveDate>> {
    self
      .store
      .observation_dates(variable_ids, country_id)
      .await
      .map_err(Into::into)
  }

  pub async fn values_on(
    &self,
    variable_ids: &[i64],
    country_id: i64,
    date: NaiveDate,
  ) -> Result<Vec<(i64, f64)>> {
    self
      .store
      .values_on(variable_ids, country_id, date)
      .await
      .map_err(Into::into)
  }

  pub async fn store_observations(&self, rows: Vec<Observation>) -> Result<usize> {
    self.store.store_observations(rows).await.map_err(Into::into)
  }
}
