//! Handlers for the dollar-inflation index.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/inflacion-dolares` | `product_ids[]` select countries; `date_from`, `date_to` |
//! | `GET`  | `/inflacion-dolares/export` | Three wide sheets as `.xlsx` |

use axum::{Json, extract::State, response::Response};
use cifras_analytics::dollar_inflation::{self, DollarInflationResult};
use cifras_core::store::SeriesStore;

use crate::{ApiState, error::ApiError, params::Params, xlsx_attachment};

async fn compute<S: SeriesStore>(
  state: &ApiState<S>,
  params: &Params,
) -> Result<DollarInflationResult, ApiError> {
  let pids = params.pids()?;
  let window = params.window()?;
  Ok(dollar_inflation::compute(state.reader(), &state.analytics, &pids, window).await?)
}

/// `GET /inflacion-dolares?product_ids[]=..&date_from=..&date_to=..`
pub async fn index<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<DollarInflationResult>, ApiError>
where
  S: SeriesStore + 'static,
{
  Ok(Json(compute(&state, &params).await?))
}

/// `GET /inflacion-dolares/export`: same parameters.
pub async fn export<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Response, ApiError>
where
  S: SeriesStore + 'static,
{
  let result = compute(&state, &params).await?;
  let bytes = cifras_xlsx::write_tables(&dollar_inflation::export_tables(&result))?;
  Ok(xlsx_attachment("inflacion_en_dolares.xlsx", bytes))
}
