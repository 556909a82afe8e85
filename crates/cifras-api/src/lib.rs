//! JSON REST API for Cifras.
//!
//! Exposes axum [`Router`]s backed by any [`cifras_core::store::SeriesStore`]:
//! [`api_router`] for the public read surface and [`admin_router`] for the
//! catalog CRUD. Sessions, the network guard and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", cifras_api::api_router(state.clone()))
//! .nest("/api/admin", cifras_api::admin_router(state).layer(guard))
//! ```

pub mod admin;
pub mod curves;
pub mod dcp;
pub mod dollars;
pub mod error;
pub mod export;
pub mod implicit;
pub mod params;
pub mod policy;
pub mod products;
pub mod tenders;
pub mod ticker;

use std::sync::Arc;

use axum::{
  Router,
  http::header,
  response::{IntoResponse, Response},
  routing::{get, post},
};
use cifras_analytics::{AnalyticsConfig, Reader};
use cifras_core::store::SeriesStore;

pub use error::ApiError;
pub use params::Params;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through every handler.
pub struct ApiState<S> {
  pub store:     Arc<S>,
  pub analytics: Arc<AnalyticsConfig>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), analytics: Arc::clone(&self.analytics) }
  }
}

impl<S: SeriesStore> ApiState<S> {
  pub fn new(store: Arc<S>, analytics: Arc<AnalyticsConfig>) -> Self { Self { store, analytics } }

  pub fn reader(&self) -> Reader<'_, S> { Reader::new(self.store.as_ref()) }
}

/// An `.xlsx` download.
pub fn xlsx_attachment(filename: &str, bytes: Vec<u8>) -> Response {
  (
    [
      (header::CONTENT_TYPE, cifras_xlsx::CONTENT_TYPE.to_owned()),
      (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
    ],
    bytes,
  )
    .into_response()
}

// ─── Routers ──────────────────────────────────────────────────────────────────

/// Build the public read API for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: SeriesStore + 'static,
{
  Router::new()
    .route("/ticker/ticker", get(ticker::handler::<S>))
    // Products and prices
    .route("/products", get(products::list::<S>))
    .route("/products/prices", get(products::prices::<S>))
    .route("/cotizaciones", get(products::quotes::<S>))
    // DCP
    .route("/variations", get(dcp::variations::<S>))
    .route("/variations/export", get(dcp::variations_export::<S>))
    .route("/dcp/indices", get(dcp::indices::<S>))
    // Dollar inflation
    .route("/inflacion-dolares", get(dollars::index::<S>))
    .route("/inflacion-dolares/export", get(dollars::export::<S>))
    // Yield curves
    .route("/yield-curve/dates", get(curves::dates::<S>))
    .route("/yield-curve/data", get(curves::data::<S>))
    .route("/yield-curve/table", get(curves::table::<S>))
    .route("/yield-curve/timeseries", get(curves::timeseries::<S>))
    // Implicit inflation
    .route("/inflacion-implicita/fechas", get(implicit::dates::<S>))
    .route("/inflacion-implicita/curva", get(implicit::curve::<S>))
    .route("/inflacion-implicita/evolucion", get(implicit::evolution::<S>))
    .route("/inflacion-implicita/plazos", get(implicit::tenors))
    // Tenders
    .route("/licitaciones/fechas", get(tenders::auctions::<S>))
    .route("/licitaciones/licitacion", get(tenders::auction::<S>))
    .route("/licitaciones/bevsa", get(tenders::reference::<S>))
    .route("/licitaciones/ultimas", get(tenders::last::<S>))
    .route("/licitaciones/curva-bevsa", get(tenders::curve::<S>))
    .route("/licitaciones/historico-bevsa", get(tenders::history::<S>))
    .route("/licitaciones/reporte", get(tenders::report::<S>))
    // Monetary policy
    .route("/politica-monetaria", get(policy::dashboard::<S>))
    .route("/politica-monetaria/series/tpm", get(policy::tpm::<S>))
    .route("/politica-monetaria/series/expectativas", get(policy::expectations::<S>))
    .route("/politica-monetaria/series/embi", get(policy::embi::<S>))
    .route("/politica-monetaria/series/monedas", get(policy::currencies::<S>))
    // Tidy export
    .route("/export/families", get(export::families::<S>))
    .route("/export/subfamilies", get(export::subfamilies::<S>))
    .route("/export/variables", get(export::variables::<S>))
    .route("/export/countries", get(export::countries::<S>))
    .route("/export/preview", get(export::preview::<S>))
    .route("/export/download", get(export::download::<S>))
    .with_state(state)
}

/// Build the catalog CRUD API. Callers must put it behind the admin guard.
pub fn admin_router<S>(state: ApiState<S>) -> Router<()>
where
  S: SeriesStore + 'static,
{
  Router::new()
    .route("/series-types", get(admin::series_types::<S>))
    // Families
    .route("/families", get(admin::list_families::<S>).post(admin::create_family::<S>))
    .route(
      "/families/{id}",
      get(admin::get_family::<S>).put(admin::update_family::<S>).delete(admin::delete_family::<S>),
    )
    // Sub-families
    .route("/subfamilies", get(admin::list_subfamilies::<S>).post(admin::create_subfamily::<S>))
    .route(
      "/subfamilies/{id}",
      get(admin::get_subfamily::<S>)
        .put(admin::update_subfamily::<S>)
        .delete(admin::delete_subfamily::<S>),
    )
    // Variables
    .route("/variables", get(admin::list_variables::<S>).post(admin::create_variable::<S>))
    .route(
      "/variables/{id}",
      get(admin::get_variable::<S>)
        .put(admin::update_variable::<S>)
        .delete(admin::delete_variable::<S>),
    )
    // Countries
    .route("/countries", get(admin::list_countries::<S>).post(admin::create_country::<S>))
    .route(
      "/countries/{id}",
      get(admin::get_country::<S>).put(admin::update_country::<S>).delete(admin::delete_country::<S>),
    )
    // Maestro
    .route("/maestros", get(admin::list_maestros::<S>).post(admin::create_maestro::<S>))
    .route("/maestros/bulk", post(admin::create_maestros::<S>))
    .route(
      "/maestros/{variable_id}/{country_id}",
      get(admin::get_maestro::<S>).put(admin::update_maestro::<S>).delete(admin::delete_maestro::<S>),
    )
    // Graphs
    .route("/graphs", get(admin::list_graphs::<S>).post(admin::create_graph::<S>))
    .route(
      "/graphs/{id}",
      get(admin::get_graph::<S>).put(admin::update_graph::<S>).delete(admin::delete_graph::<S>),
    )
    .route(
      "/graphs/{id}/countries",
      get(admin::graph_countries::<S>).put(admin::replace_graph_countries::<S>),
    )
    // Derived batches
    .route("/implicit-inflation/recompute", post(admin::recompute_implicit::<S>))
    .with_state(state)
}
