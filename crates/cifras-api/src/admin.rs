//! Handlers for the catalog CRUD surface under `/admin`.
//!
//! Every mutation goes through the store's integrity prechecks: a blocked
//! delete or a duplicate name answers `409` with a message naming the
//! dependency, a missing row `404`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/series-types` | |
//! | `GET` `POST` | `/families` | |
//! | `GET` `PUT` `DELETE` | `/families/:id` | |
//! | `GET` `POST` | `/subfamilies` | `?family_id` filter |
//! | `GET` `PUT` `DELETE` | `/subfamilies/:id` | |
//! | `GET` `POST` | `/variables` | `?subfamily_id` filter |
//! | `GET` `PUT` `DELETE` | `/variables/:id` | |
//! | `GET` `POST` | `/countries` | |
//! | `GET` `PUT` `DELETE` | `/countries/:id` | Body `{"name":..}` on `PUT` |
//! | `GET` `POST` | `/maestros` | `?variable_id&country_id&active` |
//! | `POST` | `/maestros/bulk` | One variable, many countries; all or nothing |
//! | `GET` `PUT` `DELETE` | `/maestros/:variable_id/:country_id` | |
//! | `GET` `POST` | `/graphs` | |
//! | `GET` `PUT` `DELETE` | `/graphs/:id` | |
//! | `GET` `PUT` | `/graphs/:id/countries` | `PUT` replaces the whole filter |
//! | `POST` | `/implicit-inflation/recompute` | |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use cifras_analytics::implicit::{self, RecomputeReport};
use cifras_core::{
  catalog::{
    Country, Family, Graph, Maestro, MaestroBulk, MaestroFields, MaestroFilter, NewFamily,
    NewGraph, NewSubFamily, NewVariable, SeriesType, SubFamily, Variable,
  },
  series::SeriesKey,
  store::SeriesStore,
};
use serde::{Deserialize, Serialize};

use crate::{
  ApiState,
  error::{ApiError, lift},
};

fn found<T>(row: Option<T>, what: impl FnOnce() -> String) -> Result<T, ApiError> {
  row.ok_or_else(|| ApiError::NotFound(what()))
}

pub async fn series_types<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<SeriesType>>, ApiError>
where
  S: SeriesStore + 'static,
{
  Ok(Json(state.store.list_series_types().await.map_err(lift)?))
}

// ─── Families ─────────────────────────────────────────────────────────────────

pub async fn list_families<S>(State(state): State<ApiState<S>>) -> Result<Json<Vec<Family>>, ApiError>
where
  S: SeriesStore + 'static,
{
  Ok(Json(state.store.list_families().await.map_err(lift)?))
}

pub async fn get_family<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Family>, ApiError>
where
  S: SeriesStore + 'static,
{
  let row = state.store.get_family(id).await.map_err(lift)?;
  Ok(Json(found(row, || format!("familia {id}"))?))
}

/// `POST /families`, body: `{"name":"..."}`
pub async fn create_family<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewFamily>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SeriesStore + 'static,
{
  let family = state.store.create_family(body).await.map_err(lift)?;
  tracing::info!(id = family.id, name = %family.name, "family created");
  Ok((StatusCode::CREATED, Json(family)))
}

pub async fn update_family<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
  Json(body): Json<NewFamily>,
) -> Result<Json<Family>, ApiError>
where
  S: SeriesStore + 'static,
{
  Ok(Json(state.store.update_family(id, body).await.map_err(lift)?))
}

pub async fn delete_family<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
  S: SeriesStore + 'static,
{
  state.store.delete_family(id).await.map_err(lift)?;
  tracing::info!(id, "family deleted");
  Ok(StatusCode::NO_CONTENT)
}

// ─── Sub-families ─────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct SubFamilyFilter {
  pub family_id: Option<i64>,
}

pub async fn list_subfamilies<S>(
  State(state): State<ApiState<S>>,
  Query(filter): Query<SubFamilyFilter>,
) -> Result<Json<Vec<SubFamily>>, ApiError>
where
  S: SeriesStore + 'static,
{
  Ok(Json(state.store.list_subfamilies(filter.family_id).await.map_err(lift)?))
}

pub async fn get_subfamily<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<SubFamily>, ApiError>
where
  S: SeriesStore + 'static,
{
  let row = state.store.get_subfamily(id).await.map_err(lift)?;
  Ok(Json(found(row, || format!("sub-familia {id}"))?))
}

/// `POST /subfamilies`, body: `{"name":"...","family_id":1}`
pub async fn create_subfamily<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewSubFamily>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SeriesStore + 'static,
{
  let sub = state.store.create_subfamily(body).await.map_err(lift)?;
  Ok((StatusCode::CREATED, Json(sub)))
}

pub async fn update_subfamily<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
  Json(body): Json<NewSubFamily>,
) -> Result<Json<SubFamily>, ApiError>
where
  S: SeriesStore + 'static,
{
  Ok(Json(state.store.update_subfamily(id, body).await.map_err(lift)?))
}

pub async fn delete_subfamily<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
  S: SeriesStore + 'static,
{
  state.store.delete_subfamily(id).await.map_err(lift)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Variables ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct VariableFilter {
  pub subfamily_id: Option<i64>,
}

pub async fn list_variables<S>(
  State(state): State<ApiState<S>>,
  Query(filter): Query<VariableFilter>,
) -> Result<Json<Vec<Variable>>, ApiError>
where
  S: SeriesStore + 'static,
{
  Ok(Json(state.store.list_variables(filter.subfamily_id).await.map_err(lift)?))
}

pub async fn get_variable<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Variable>, ApiError>
where
  S: SeriesStore + 'static,
{
  let row = state.store.get_variable(id).await.map_err(lift)?;
  Ok(Json(found(row, || format!("variable {id}"))?))
}

/// `POST /variables`, body: [`NewVariable`]; `id` may be pinned.
pub async fn create_variable<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewVariable>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SeriesStore + 'static,
{
  let variable = state.store.create_variable(body).await.map_err(lift)?;
  tracing::info!(id = variable.id, name = %variable.name, "variable created");
  Ok((StatusCode::CREATED, Json(variable)))
}

pub async fn update_variable<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
  Json(body): Json<NewVariable>,
) -> Result<Json<Variable>, ApiError>
where
  S: SeriesStore + 'static,
{
  Ok(Json(state.store.update_variable(id, body).await.map_err(lift)?))
}

pub async fn delete_variable<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
  S: SeriesStore + 'static,
{
  state.store.delete_variable(id).await.map_err(lift)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Countries ────────────────────────────────────────────────────────────────

pub async fn list_countries<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Country>>, ApiError>
where
  S: SeriesStore + 'static,
{
  Ok(Json(state.store.list_countries().await.map_err(lift)?))
}

pub async fn get_country<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Country>, ApiError>
where
  S: SeriesStore + 'static,
{
  let row = state.store.get_country(id).await.map_err(lift)?;
  Ok(Json(found(row, || format!("país {id}"))?))
}

/// `POST /countries`, body: `{"id":858,"name":"Uruguay"}`
pub async fn create_country<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<Country>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SeriesStore + 'static,
{
  let country = state.store.create_country(body).await.map_err(lift)?;
  Ok((StatusCode::CREATED, Json(country)))
}

#[derive(Debug, Deserialize)]
pub struct CountryName {
  pub name: String,
}

pub async fn update_country<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
  Json(body): Json<CountryName>,
) -> Result<Json<Country>, ApiError>
where
  S: SeriesStore + 'static,
{
  Ok(Json(state.store.update_country(id, body.name).await.map_err(lift)?))
}

pub async fn delete_country<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
  S: SeriesStore + 'static,
{
  state.store.delete_country(id).await.map_err(lift)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Maestro ──────────────────────────────────────────────────────────────────

/// `GET /maestros[?variable_id=..][&country_id=..][&active=..]`
pub async fn list_maestros<S>(
  State(state): State<ApiState<S>>,
  Query(filter): Query<MaestroFilter>,
) -> Result<Json<Vec<Maestro>>, ApiError>
where
  S: SeriesStore + 'static,
{
  Ok(Json(state.store.list_maestros(filter).await.map_err(lift)?))
}

pub async fn get_maestro<S>(
  State(state): State<ApiState<S>>,
  Path((variable_id, country_id)): Path<(i64, i64)>,
) -> Result<Json<Maestro>, ApiError>
where
  S: SeriesStore + 'static,
{
  let key = SeriesKey::new(variable_id, country_id);
  let row = state.store.get_maestro(key).await.map_err(lift)?;
  Ok(Json(found(row, || format!("maestro {key}"))?))
}

/// `POST /maestros`, body: [`Maestro`] with its fields flattened.
pub async fn create_maestro<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<Maestro>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SeriesStore + 'static,
{
  let maestro = state.store.create_maestro(body).await.map_err(lift)?;
  tracing::info!(pid = %maestro.pid(), "maestro created");
  Ok((StatusCode::CREATED, Json(maestro)))
}

/// `POST /maestros/bulk`, body: `{"variable_id":20,"country_ids":[..],"periodicity":"D",..}`
pub async fn create_maestros<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<MaestroBulk>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SeriesStore + 'static,
{
  let variable_id = body.variable_id;
  let created = state.store.create_maestros(body).await.map_err(lift)?;
  tracing::info!(variable_id, rows = created.len(), "maestro bulk created");
  Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_maestro<S>(
  State(state): State<ApiState<S>>,
  Path((variable_id, country_id)): Path<(i64, i64)>,
  Json(body): Json<MaestroFields>,
) -> Result<Json<Maestro>, ApiError>
where
  S: SeriesStore + 'static,
{
  let key = SeriesKey::new(variable_id, country_id);
  Ok(Json(state.store.update_maestro(key, body).await.map_err(lift)?))
}

pub async fn delete_maestro<S>(
  State(state): State<ApiState<S>>,
  Path((variable_id, country_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError>
where
  S: SeriesStore + 'static,
{
  let key = SeriesKey::new(variable_id, country_id);
  state.store.delete_maestro(key).await.map_err(lift)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Graphs ───────────────────────────────────────────────────────────────────

pub async fn list_graphs<S>(State(state): State<ApiState<S>>) -> Result<Json<Vec<Graph>>, ApiError>
where
  S: SeriesStore + 'static,
{
  Ok(Json(state.store.list_graphs().await.map_err(lift)?))
}

pub async fn get_graph<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Graph>, ApiError>
where
  S: SeriesStore + 'static,
{
  let row = state.store.get_graph(id).await.map_err(lift)?;
  Ok(Json(found(row, || format!("gráfico {id}"))?))
}

pub async fn create_graph<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewGraph>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SeriesStore + 'static,
{
  let graph = state.store.create_graph(body).await.map_err(lift)?;
  Ok((StatusCode::CREATED, Json(graph)))
}

pub async fn update_graph<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
  Json(body): Json<NewGraph>,
) -> Result<Json<Graph>, ApiError>
where
  S: SeriesStore + 'static,
{
  Ok(Json(state.store.update_graph(id, body).await.map_err(lift)?))
}

pub async fn delete_graph<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
  S: SeriesStore + 'static,
{
  state.store.delete_graph(id).await.map_err(lift)?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GraphCountries {
  #[serde(default)]
  pub graph_id:    i64,
  pub country_ids: Vec<i64>,
}

pub async fn graph_countries<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<GraphCountries>, ApiError>
where
  S: SeriesStore + 'static,
{
  let graph = state.store.get_graph(id).await.map_err(lift)?;
  found(graph, || format!("gráfico {id}"))?;
  let country_ids = state.store.graph_countries(id).await.map_err(lift)?;
  Ok(Json(GraphCountries { graph_id: id, country_ids }))
}

/// `PUT /graphs/:id/countries`, body: `{"country_ids":[858,32]}`
pub async fn replace_graph_countries<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
  Json(body): Json<GraphCountries>,
) -> Result<Json<GraphCountries>, ApiError>
where
  S: SeriesStore + 'static,
{
  let country_ids = state
    .store
    .replace_graph_countries(id, body.country_ids)
    .await
    .map_err(lift)?;
  Ok(Json(GraphCountries { graph_id: id, country_ids }))
}

// ─── Derived batches ──────────────────────────────────────────────────────────

/// `POST /implicit-inflation/recompute`
pub async fn recompute_implicit<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<RecomputeReport>, ApiError>
where
  S: SeriesStore + 'static,
{
  Ok(Json(implicit::recompute(state.reader(), state.analytics.home_country).await?))
}
