//! Handlers for the DCP real-price index.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/dcp/indices` | `product_ids[]`, `date_from`, `date_to` |
//! | `GET`  | `/variations` | Ranked over active products; `order=asc\|desc` |
//! | `GET`  | `/variations/export` | Same ranking as `.xlsx` |

use axum::{Json, extract::State, response::Response};
use cifras_analytics::dcp::{self, DcpResult, SortOrder, VariationsResult};
use cifras_core::store::SeriesStore;
use cifras_xlsx::{Cell, Sheet};

use crate::{ApiState, error::ApiError, params::Params, xlsx_attachment};

/// `GET /dcp/indices?product_ids[]=..&date_from=..&date_to=..`
pub async fn indices<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<DcpResult>, ApiError>
where
  S: SeriesStore + 'static,
{
  let pids = params.pids()?;
  let window = params.window()?;
  Ok(Json(dcp::indices(state.reader(), &state.analytics, &pids, window).await?))
}

async fn ranked<S: SeriesStore>(
  state: &ApiState<S>,
  params: &Params,
) -> Result<VariationsResult, ApiError> {
  let window = params.window()?;
  let order: SortOrder = params.parse("order")?.unwrap_or_default();
  Ok(dcp::variations(state.reader(), &state.analytics, window, order).await?)
}

/// `GET /variations[?date_from=..][&date_to=..][&order=asc|desc]`
pub async fn variations<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<VariationsResult>, ApiError>
where
  S: SeriesStore + 'static,
{
  Ok(Json(ranked(&state, &params).await?))
}

/// `GET /variations/export`: one ranking sheet plus the omitted products.
pub async fn variations_export<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Response, ApiError>
where
  S: SeriesStore + 'static,
{
  let result = ranked(&state, &params).await?;
  let bytes = cifras_xlsx::write_workbook(&variation_sheets(&result))?;
  Ok(xlsx_attachment("variaciones_dcp.xlsx", bytes))
}

fn variation_sheets(result: &VariationsResult) -> Vec<Sheet> {
  let header = |cols: &[&str]| -> Vec<String> { cols.iter().map(|c| (*c).to_owned()).collect() };

  let mut ranking = Sheet::new(
    "Variaciones",
    header(&["Producto", "ID", "Desde", "Hasta", "Índice inicial", "Índice final", "Variación %"]),
  );
  for v in &result.items {
    ranking.push_row(vec![
      v.name.as_str().into(),
      v.pid.0.into(),
      v.first_date.into(),
      v.last_date.into(),
      v.first_index.into(),
      v.last_index.into(),
      v.variation_percent.into(),
    ]);
  }

  let mut sheets = vec![ranking];
  if !result.omitted.is_empty() {
    let mut omitted = Sheet::new("Omitidos", header(&["ID", "Producto", "Motivo", "Último dato"]));
    for o in &result.omitted {
      omitted.push_row(vec![
        o.pid.0.into(),
        o.name.clone().map_or(Cell::Empty, Cell::Text),
        o.message.into(),
        o.last_data_date.map_or(Cell::Empty, Cell::Date),
      ]);
    }
    sheets.push(omitted);
  }
  sheets
}
