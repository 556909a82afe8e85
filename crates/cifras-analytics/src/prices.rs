//! Multi-series fetch: the raw or month-averaged series of several products,
//! each annotated with its catalog context.

use cifras_core::{
  Error, Result,
  catalog::Product,
  series::{DateRange, Pid, Point},
  store::SeriesStore,
};
use serde::Serialize;

use crate::{monthly::to_monthly, reader::Reader};

#[derive(Debug, Clone, Serialize)]
pub struct ProductSeries {
  #[serde(flatten)]
  pub product: Product,
  pub points:  Vec<Point>,
}

/// Fetch every product in `pids`. Unknown ids are a `NotFound`: unlike the
/// derived indices there is nothing to compute, only the catalog to consult.
pub async fn fetch<S: SeriesStore>(
  reader: Reader<'_, S>,
  pids: &[Pid],
  window: DateRange,
  monthly: bool,
) -> Result<Vec<ProductSeries>> {
  if pids.is_empty() {
    return Err(Error::bad_request("at least one product id is required"));
  }
  let mut out = Vec::with_capacity(pids.len());
  for &pid in pids {
    out.push(one(reader, pid, window, monthly).await?);
  }
  Ok(out)
}

pub async fn one<S: SeriesStore>(
  reader: Reader<'_, S>,
  pid: Pid,
  window: DateRange,
  monthly: bool,
) -> Result<ProductSeries> {
  let key = pid.decode();
  let product = reader
    .product(key)
    .await?
    .ok_or_else(|| Error::not_found(format!("producto {pid}")))?;
  let points = if monthly {
    // Widen so the first month averages over all of its days, then clip.
    let raw = reader.series(key, window.widen_to_month_start()).await?;
    to_monthly(&raw, product.periodicity)
      .into_iter()
      .filter(|p| window.contains(p.date))
      .collect()
  } else {
    reader.series(key, window).await?
  };
  Ok(ProductSeries { product, points })
}
