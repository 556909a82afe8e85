//! Exchange-rate batch ("cotizaciones"): FX series per product id, optionally
//! month-averaged and optionally rebased to 100.

use cifras_core::{
  Result,
  series::{DateRange, Pid},
  store::SeriesStore,
};
use serde::Serialize;
use tracing::debug;

use crate::{
  index::normalize,
  omit::{OmitReason, Omitted},
  prices::{self, ProductSeries},
  reader::Reader,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct QuoteOptions {
  pub monthly: bool,
  pub base100: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuotesResult {
  pub series:  Vec<ProductSeries>,
  pub omitted: Vec<Omitted>,
}

pub async fn quotes<S: SeriesStore>(
  reader: Reader<'_, S>,
  pids: &[Pid],
  window: DateRange,
  opts: QuoteOptions,
) -> Result<QuotesResult> {
  let fetched = prices::fetch(reader, pids, window, opts.monthly).await?;
  if !opts.base100 {
    return Ok(QuotesResult { series: fetched, omitted: Vec::new() });
  }

  let mut series = Vec::with_capacity(fetched.len());
  let mut omitted = Vec::new();
  for mut s in fetched {
    let label = s.product.label();
    if s.points.len() < 2 {
      omitted.push(Omitted::new(s.product.pid, Some(label), OmitReason::FewerThanTwoPoints));
      continue;
    }
    match normalize(&s.points) {
      Some(points) => {
        s.points = points;
        series.push(s);
      }
      None => {
        debug!(pid = %s.product.pid, "fx series starts at zero");
        omitted.push(Omitted::new(s.product.pid, Some(label), OmitReason::FirstPointZero));
      }
    }
  }
  Ok(QuotesResult { series, omitted })
}
