//! Handlers for implicit (breakeven) inflation.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/inflacion-implicita/fechas` | Newest first |
//! | `GET`  | `/inflacion-implicita/curva` | Optional `fecha` |
//! | `GET`  | `/inflacion-implicita/evolucion` | `plazos[]` in years, `date_from`, `date_to` |
//! | `GET`  | `/inflacion-implicita/plazos` | Static tenor list |

use axum::{Json, extract::State};
use chrono::NaiveDate;
use cifras_analytics::implicit::{self, ImplicitCurve, ImplicitSeries, ImplicitTenor};
use cifras_core::store::SeriesStore;
use serde::Serialize;

use crate::{ApiState, error::ApiError, params::Params};

pub async fn dates<S>(State(state): State<ApiState<S>>) -> Result<Json<Vec<NaiveDate>>, ApiError>
where
  S: SeriesStore + 'static,
{
  Ok(Json(implicit::dates(state.reader(), state.analytics.home_country).await?))
}

/// `GET /inflacion-implicita/curva[?fecha=..]`
pub async fn curve<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<ImplicitCurve>, ApiError>
where
  S: SeriesStore + 'static,
{
  let date = params.date("fecha")?;
  Ok(Json(implicit::curve(state.reader(), state.analytics.home_country, date).await?))
}

/// `GET /inflacion-implicita/evolucion[?plazos[]=..][&date_from=..][&date_to=..]`
pub async fn evolution<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<Vec<ImplicitSeries>>, ApiError>
where
  S: SeriesStore + 'static,
{
  let years: Vec<i64> = params.parse_list("plazos")?;
  let window = params.window()?;
  Ok(Json(
    implicit::evolution(state.reader(), state.analytics.home_country, &years, window).await?,
  ))
}

#[derive(Debug, Serialize)]
pub struct TenorInfo {
  #[serde(flatten)]
  pub tenor: ImplicitTenor,
  pub label: String,
}

pub async fn tenors() -> Json<Vec<TenorInfo>> {
  Json(
    implicit::all_tenors()
      .into_iter()
      .map(|t| TenorInfo { label: t.label(), tenor: t })
      .collect(),
  )
}
