//! Handlers for product listing and raw series fetches.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/products` | Active products; `?all=true` includes inactive ones |
//! | `GET`  | `/products/prices` | `product_ids[]`, `date_from`, `date_to`, `monthly` |
//! | `GET`  | `/cotizaciones` | As above plus `base100` |

use axum::{Json, extract::State};
use cifras_analytics::{
  fx::{self, QuoteOptions, QuotesResult},
  prices::{self, ProductSeries},
};
use cifras_core::{catalog::Product, store::SeriesStore};

use crate::{ApiState, error::ApiError, params::Params};

/// `GET /products[?all=true]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<Vec<Product>>, ApiError>
where
  S: SeriesStore + 'static,
{
  let active_only = !params.flag("all")?;
  Ok(Json(state.reader().products(active_only).await?))
}

/// `GET /products/prices?product_ids[]=..[&date_from=..][&date_to=..][&monthly=true]`
pub async fn prices<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<Vec<ProductSeries>>, ApiError>
where
  S: SeriesStore + 'static,
{
  let pids = params.pids()?;
  let window = params.window()?;
  let monthly = params.flag("monthly")?;
  Ok(Json(prices::fetch(state.reader(), &pids, window, monthly).await?))
}

/// `GET /cotizaciones?product_ids[]=..[&monthly=true][&base100=true]`
pub async fn quotes<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<QuotesResult>, ApiError>
where
  S: SeriesStore + 'static,
{
  let pids = params.pids()?;
  let window = params.window()?;
  let opts = QuoteOptions { monthly: params.flag("monthly")?, base100: params.flag("base100")? };
  Ok(Json(fx::quotes(state.reader(), &pids, window, opts).await?))
}
