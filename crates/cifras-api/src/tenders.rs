//! Handlers for the LRM tender auctions.
//!
//! `plazo` is the tenor bucket in days (30, 90, 180 or 360) and `fecha` an
//! ISO date.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/licitaciones/fechas` | Every `(date, tenor)` with data, newest first |
//! | `GET`  | `/licitaciones/licitacion` | `fecha`, `plazo` |
//! | `GET`  | `/licitaciones/bevsa` | `plazo`, optional `fecha` |
//! | `GET`  | `/licitaciones/ultimas` | `plazo`, optional `fecha` |
//! | `GET`  | `/licitaciones/curva-bevsa` | Optional `fecha` |
//! | `GET`  | `/licitaciones/historico-bevsa` | `plazo`, optional `dias`, `fecha` |
//! | `GET`  | `/licitaciones/reporte` | `fecha`, `plazo`; input of the PDF renderer |

use axum::{Json, extract::State};
use cifras_analytics::tenders::{
  self, Auction, AuctionKey, BevsaCurve, BevsaHistory, BevsaReference, LastAuctions, TenderReport,
};
use cifras_core::store::SeriesStore;

use crate::{ApiState, error::ApiError, params::Params};

pub async fn auctions<S>(State(state): State<ApiState<S>>) -> Result<Json<Vec<AuctionKey>>, ApiError>
where
  S: SeriesStore + 'static,
{
  Ok(Json(tenders::auctions(state.reader(), &state.analytics.tenders).await?))
}

/// `GET /licitaciones/licitacion?fecha=..&plazo=..`
pub async fn auction<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<Auction>, ApiError>
where
  S: SeriesStore + 'static,
{
  let date = params.date("fecha")?.ok_or_else(|| ApiError::BadRequest("missing parameter fecha".into()))?;
  let tenor = params.required("plazo")?;
  Ok(Json(tenders::auction(state.reader(), &state.analytics.tenders, date, tenor).await?))
}

/// `GET /licitaciones/bevsa?plazo=..[&fecha=..]`
pub async fn reference<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<BevsaReference>, ApiError>
where
  S: SeriesStore + 'static,
{
  let tenor = params.required("plazo")?;
  let date = params.date("fecha")?;
  Ok(Json(
    tenders::bevsa_reference(state.reader(), &state.analytics.tenders, tenor, date).await?,
  ))
}

/// `GET /licitaciones/ultimas?plazo=..[&fecha=..]`
pub async fn last<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<LastAuctions>, ApiError>
where
  S: SeriesStore + 'static,
{
  let tenor = params.required("plazo")?;
  let date = params.date("fecha")?;
  Ok(Json(
    tenders::last_auctions(state.reader(), &state.analytics.tenders, tenor, date).await?,
  ))
}

/// `GET /licitaciones/curva-bevsa[?fecha=..]`
pub async fn curve<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<BevsaCurve>, ApiError>
where
  S: SeriesStore + 'static,
{
  let date = params.date("fecha")?;
  Ok(Json(tenders::bevsa_curve(state.reader(), &state.analytics.tenders, date).await?))
}

/// `GET /licitaciones/historico-bevsa?plazo=..[&dias=..][&fecha=..]`
pub async fn history<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<BevsaHistory>, ApiError>
where
  S: SeriesStore + 'static,
{
  let tenor = params.required("plazo")?;
  let days = params.parse("dias")?;
  let date = params.date("fecha")?;
  Ok(Json(
    tenders::bevsa_history(state.reader(), &state.analytics.tenders, tenor, days, date).await?,
  ))
}

/// `GET /licitaciones/reporte?fecha=..&plazo=..`
pub async fn report<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<TenderReport>, ApiError>
where
  S: SeriesStore + 'static,
{
  let date = params.date("fecha")?.ok_or_else(|| ApiError::BadRequest("missing parameter fecha".into()))?;
  let tenor = params.required("plazo")?;
  Ok(Json(tenders::report(state.reader(), &state.analytics.tenders, date, tenor).await?))
}
