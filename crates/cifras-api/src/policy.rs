//! Handlers for the monetary-policy dashboard.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/politica-monetaria` | One row per dashboard country |
//! | `GET`  | `/politica-monetaria/series/tpm` | `pais`, `date_from`, `date_to` |
//! | `GET`  | `/politica-monetaria/series/expectativas` | Latest survey per month |
//! | `GET`  | `/politica-monetaria/series/embi` | Basis points |
//! | `GET`  | `/politica-monetaria/series/monedas` | USD rates rebased to 100 |

use axum::{Json, extract::State};
use cifras_analytics::policy::{self, CountryPolicy, CurrencySeries};
use cifras_core::{series::Point, store::SeriesStore};

use crate::{ApiState, error::ApiError, params::Params};

pub async fn dashboard<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<CountryPolicy>>, ApiError>
where
  S: SeriesStore + 'static,
{
  Ok(Json(policy::dashboard(state.reader(), &state.analytics).await?))
}

/// `GET /politica-monetaria/series/tpm?pais=..`
pub async fn tpm<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<Vec<Point>>, ApiError>
where
  S: SeriesStore + 'static,
{
  let country = params.required("pais")?;
  let window = params.window()?;
  Ok(Json(policy::tpm_series(state.reader(), &state.analytics, country, window).await?))
}

/// `GET /politica-monetaria/series/expectativas?pais=..`
pub async fn expectations<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<Vec<Point>>, ApiError>
where
  S: SeriesStore + 'static,
{
  let country = params.required("pais")?;
  let window = params.window()?;
  Ok(Json(
    policy::expectations_series(state.reader(), &state.analytics, country, window).await?,
  ))
}

/// `GET /politica-monetaria/series/embi?pais=..`
pub async fn embi<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<Vec<Point>>, ApiError>
where
  S: SeriesStore + 'static,
{
  let country = params.required("pais")?;
  let window = params.window()?;
  Ok(Json(policy::embi_series(state.reader(), &state.analytics, country, window).await?))
}

/// `GET /politica-monetaria/series/monedas[?date_from=..][&date_to=..]`
pub async fn currencies<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<Vec<CurrencySeries>>, ApiError>
where
  S: SeriesStore + 'static,
{
  let window = params.window()?;
  Ok(Json(policy::currency_series(state.reader(), &state.analytics, window).await?))
}
