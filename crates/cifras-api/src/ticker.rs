//! Handler for `GET /ticker/ticker`.
//!
//! The ticker sits on every page of the client, so failures degrade to an
//! empty list instead of an error status.

use axum::{Json, extract::State};
use cifras_analytics::ticker::{self, TickerItem};
use cifras_core::store::SeriesStore;

use crate::ApiState;

pub async fn handler<S>(State(state): State<ApiState<S>>) -> Json<Vec<TickerItem>>
where
  S: SeriesStore + 'static,
{
  match ticker::feed(state.reader(), &state.analytics.ticker).await {
    Ok(items) => Json(items),
    Err(e) => {
      tracing::warn!(error = %e, "ticker feed failed; serving empty list");
      Json(Vec::new())
    }
  }
}
