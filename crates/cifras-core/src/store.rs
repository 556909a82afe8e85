//! The `SeriesStore` trait: catalog plus observation storage.
//!
//! Implemented by storage backends (e.g. `cifras-store-sqlite`). The analytics
//! engines and the HTTP layer depend on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  catalog::{
    Country, Family, Graph, Maestro, MaestroBulk, MaestroFields, MaestroFilter,
    NewFamily, NewGraph, NewSubFamily, NewVariable, Product, SeriesType,
    SubFamily, Variable,
  },
  series::{DateRange, Observation, Point, SeriesKey},
};

/// Abstraction over a catalog + observation backend.
///
/// Catalog mutations enforce referential integrity before writing and report
/// violations as [`crate::Error::Conflict`] naming the blocking dependency.
/// Observations are read-only from the API's point of view; the single write
/// path ([`SeriesStore::store_observations`]) exists for derived batches.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait SeriesStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static + Into<crate::Error>;

  // ── Families ──────────────────────────────────────────────────────────

  fn list_families(
    &self,
  ) -> impl Future<Output = Result<Vec<Family>, Self::Error>> + Send + '_;

  fn get_family(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Family>, Self::Error>> + Send + '_;

  /// Returns `Conflict` if the name is taken.
  fn create_family(
    &self,
    input: NewFamily,
  ) -> impl Future<Output = Result<Family, Self::Error>> + Send + '_;

  fn update_family(
    &self,
    id: i64,
    input: NewFamily,
  ) -> impl Future<Output = Result<Family, Self::Error>> + Send + '_;

  /// Returns `Conflict` while sub-families reference the family.
  fn delete_family(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Sub-families ──────────────────────────────────────────────────────

  fn list_subfamilies(
    &self,
    family_id: Option<i64>,
  ) -> impl Future<Output = Result<Vec<SubFamily>, Self::Error>> + Send + '_;

  fn get_subfamily(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<SubFamily>, Self::Error>> + Send + '_;

  fn create_subfamily(
    &self,
    input: NewSubFamily,
  ) -> impl Future<Output = Result<SubFamily, Self::Error>> + Send + '_;

  fn update_subfamily(
    &self,
    id: i64,
    input: NewSubFamily,
  ) -> impl Future<Output = Result<SubFamily, Self::Error>> + Send + '_;

  /// Returns `Conflict` while variables reference the sub-family.
  fn delete_subfamily(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Series types ──────────────────────────────────────────────────────

  fn list_series_types(
    &self,
  ) -> impl Future<Output = Result<Vec<SeriesType>, Self::Error>> + Send + '_;

  // ── Variables ─────────────────────────────────────────────────────────

  fn list_variables(
    &self,
    subfamily_id: Option<i64>,
  ) -> impl Future<Output = Result<Vec<Variable>, Self::Error>> + Send + '_;

  fn get_variable(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Variable>, Self::Error>> + Send + '_;

  fn create_variable(
    &self,
    input: NewVariable,
  ) -> impl Future<Output = Result<Variable, Self::Error>> + Send + '_;

  fn update_variable(
    &self,
    id: i64,
    input: NewVariable,
  ) -> impl Future<Output = Result<Variable, Self::Error>> + Send + '_;

  /// Returns `Conflict` while Maestro rows reference the variable.
  fn delete_variable(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Countries ─────────────────────────────────────────────────────────

  fn list_countries(
    &self,
  ) -> impl Future<Output = Result<Vec<Country>, Self::Error>> + Send + '_;

  fn get_country(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Country>, Self::Error>> + Send + '_;

  fn create_country(
    &self,
    input: Country,
  ) -> impl Future<Output = Result<Country, Self::Error>> + Send + '_;

  fn update_country(
    &self,
    id: i64,
    name: String,
  ) -> impl Future<Output = Result<Country, Self::Error>> + Send + '_;

  /// Returns `Conflict` while Maestro rows reference the country.
  fn delete_country(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Maestro ───────────────────────────────────────────────────────────

  fn list_maestros(
    &self,
    filter: MaestroFilter,
  ) -> impl Future<Output = Result<Vec<Maestro>, Self::Error>> + Send + '_;

  fn get_maestro(
    &self,
    key: SeriesKey,
  ) -> impl Future<Output = Result<Option<Maestro>, Self::Error>> + Send + '_;

  fn create_maestro(
    &self,
    input: Maestro,
  ) -> impl Future<Output = Result<Maestro, Self::Error>> + Send + '_;

  /// Declare one variable for many countries. Every row is pre-checked; if any
  /// fails, nothing is written and the error lists each failing row.
  fn create_maestros(
    &self,
    input: MaestroBulk,
  ) -> impl Future<Output = Result<Vec<Maestro>, Self::Error>> + Send + '_;

  fn update_maestro(
    &self,
    key: SeriesKey,
    fields: MaestroFields,
  ) -> impl Future<Output = Result<Maestro, Self::Error>> + Send + '_;

  /// Returns `Conflict` while observations reference the pair.
  fn delete_maestro(
    &self,
    key: SeriesKey,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Graphs ────────────────────────────────────────────────────────────

  fn list_graphs(
    &self,
  ) -> impl Future<Output = Result<Vec<Graph>, Self::Error>> + Send + '_;

  fn get_graph(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Graph>, Self::Error>> + Send + '_;

  fn create_graph(
    &self,
    input: NewGraph,
  ) -> impl Future<Output = Result<Graph, Self::Error>> + Send + '_;

  fn update_graph(
    &self,
    id: i64,
    input: NewGraph,
  ) -> impl Future<Output = Result<Graph, Self::Error>> + Send + '_;

  /// Deleting a graph drops its country filter with it.
  fn delete_graph(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn graph_countries(
    &self,
    graph_id: i64,
  ) -> impl Future<Output = Result<Vec<i64>, Self::Error>> + Send + '_;

  /// Replace a graph's country filter atomically.
  fn replace_graph_countries(
    &self,
    graph_id: i64,
    country_ids: Vec<i64>,
  ) -> impl Future<Output = Result<Vec<i64>, Self::Error>> + Send + '_;

  // ── Products ──────────────────────────────────────────────────────────

  /// Maestro rows joined with their catalog context, ordered by family,
  /// sub-family, variable and country name.
  fn list_products(
    &self,
    active_only: bool,
  ) -> impl Future<Output = Result<Vec<Product>, Self::Error>> + Send + '_;

  fn get_product(
    &self,
    key: SeriesKey,
  ) -> impl Future<Output = Result<Option<Product>, Self::Error>> + Send + '_;

  // ── Observations ──────────────────────────────────────────────────────

  /// The series for `key` inside `range`, ascending by date. A series that
  /// does not exist reads as empty.
  fn read_series(
    &self,
    key: SeriesKey,
    range: DateRange,
  ) -> impl Future<Output = Result<Vec<Point>, Self::Error>> + Send + '_;

  /// Long-form rows for every `(variable, country)` combination, ordered by
  /// variable, country and date.
  fn read_long<'a>(
    &'a self,
    variable_ids: &'a [i64],
    country_ids: &'a [i64],
    range: DateRange,
  ) -> impl Future<Output = Result<Vec<Observation>, Self::Error>> + Send + 'a;

  /// The most recent point on or before `on_or_before` (or overall when
  /// `None`).
  fn latest_at(
    &self,
    key: SeriesKey,
    on_or_before: Option<NaiveDate>,
  ) -> impl Future<Output = Result<Option<Point>, Self::Error>> + Send + '_;

  /// Up to `limit` most recent points on or before `on_or_before`, newest
  /// first.
  fn recent(
    &self,
    key: SeriesKey,
    on_or_before: Option<NaiveDate>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Point>, Self::Error>> + Send + '_;

  /// Distinct observation dates across `variable_ids` for one country, newest
  /// first.
  fn observation_dates<'a>(
    &'a self,
    variable_ids: &'a [i64],
    country_id: i64,
  ) -> impl Future<Output = Result<Vec<NaiveDate>, Self::Error>> + Send + 'a;

  /// `(variable_id, value)` for every variable in `variable_ids` with an
  /// observation exactly on `date`.
  fn values_on<'a>(
    &'a self,
    variable_ids: &'a [i64],
    country_id: i64,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<(i64, f64)>, Self::Error>> + Send + 'a;

  /// Upsert observations in one transaction. Rows whose pair has no Maestro
  /// declaration reject the whole batch with `Conflict`.
  fn store_observations(
    &self,
    rows: Vec<Observation>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
