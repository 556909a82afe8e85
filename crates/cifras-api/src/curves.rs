//! Handlers for the sovereign yield curves of the home country.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/yield-curve/dates` | Optional `type=nominal\|real` |
//! | `GET`  | `/yield-curve/data` | `type` (default nominal), `date` (default latest) |
//! | `GET`  | `/yield-curve/table` | `type`, optional reference `date` |
//! | `GET`  | `/yield-curve/timeseries` | `variable_ids[]`, `date_from`, `date_to` |

use axum::{Json, extract::State};
use chrono::NaiveDate;
use cifras_analytics::yield_curve::{
  self, AvailableDates, CurveKind, CurvePoint, CurveTable, TenorSeries,
};
use cifras_core::{Error, store::SeriesStore};
use serde::Serialize;

use crate::{ApiState, error::ApiError, params::Params};

fn kind(params: &Params) -> Result<Option<CurveKind>, ApiError> { params.parse("type") }

/// `GET /yield-curve/dates[?type=nominal|real]`
pub async fn dates<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<AvailableDates>, ApiError>
where
  S: SeriesStore + 'static,
{
  let kind = kind(&params)?;
  Ok(Json(yield_curve::available_dates(state.reader(), state.analytics.home_country, kind).await?))
}

#[derive(Debug, Serialize)]
pub struct Snapshot {
  pub date:   NaiveDate,
  #[serde(rename = "type")]
  pub kind:   CurveKind,
  pub points: Vec<CurvePoint>,
}

/// `GET /yield-curve/data[?type=..][&date=..]`
pub async fn data<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<Snapshot>, ApiError>
where
  S: SeriesStore + 'static,
{
  let kind = kind(&params)?.unwrap_or(CurveKind::Nominal);
  let country = state.analytics.home_country;
  let date = match params.date("date")? {
    Some(d) => d,
    None => yield_curve::available_dates(state.reader(), country, Some(kind))
      .await?
      .latest
      .ok_or_else(|| Error::Unavailable(format!("no hay datos de la curva {kind}")))?,
  };
  let points = yield_curve::snapshot(state.reader(), country, kind, date).await?;
  Ok(Json(Snapshot { date, kind, points }))
}

/// `GET /yield-curve/table[?type=..][&date=..]`
pub async fn table<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<CurveTable>, ApiError>
where
  S: SeriesStore + 'static,
{
  let kind = kind(&params)?.unwrap_or(CurveKind::Nominal);
  let reference = params.date("date")?;
  Ok(Json(
    yield_curve::table(state.reader(), state.analytics.home_country, kind, reference).await?,
  ))
}

/// `GET /yield-curve/timeseries?variable_ids[]=..[&date_from=..][&date_to=..]`
pub async fn timeseries<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<Vec<TenorSeries>>, ApiError>
where
  S: SeriesStore + 'static,
{
  let ids: Vec<i64> = params.parse_list("variable_ids")?;
  let window = params.window()?;
  Ok(Json(
    yield_curve::timeseries(state.reader(), state.analytics.home_country, &ids, window).await?,
  ))
}
