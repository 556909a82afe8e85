//! Per-item exclusions in batch computations.
//!
//! A product or country that cannot be computed never fails its batch; it is
//! listed alongside the results with one of these categorical reasons.

use chrono::NaiveDate;
use cifras_core::series::Pid;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OmitReason {
  NotFound,
  NoCpi,
  NoFx,
  NoPricesInRange,
  FirstPointZero,
  FewerThanTwoPoints,
}

impl OmitReason {
  /// Reasons caused by a missing reference series rather than by the item.
  pub fn is_reference_gap(self) -> bool { matches!(self, Self::NoCpi | Self::NoFx) }

  pub fn message(self) -> &'static str {
    match self {
      Self::NotFound => "producto inexistente",
      Self::NoCpi => "sin datos de IPC",
      Self::NoFx => "sin datos de tipo de cambio",
      Self::NoPricesInRange => "sin precios en el rango",
      Self::FirstPointZero => "el primer punto es cero",
      Self::FewerThanTwoPoints => "menos de dos puntos",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Omitted {
  pub pid:            Pid,
  pub name:           Option<String>,
  pub reason:         OmitReason,
  pub message:        &'static str,
  pub last_data_date: Option<NaiveDate>,
}

impl Omitted {
  pub fn new(pid: Pid, name: Option<String>, reason: OmitReason) -> Self {
    Self {
      pid,
      name,
      reason,
      message: reason.message(),
      last_data_date: None,
    }
  }

  pub fn with_last_date(mut self, date: Option<NaiveDate>) -> Self {
    self.last_data_date = date;
    self
  }
}

/// `true` when something was requested, nothing was produced and every
/// exclusion is due to a missing reference series.
pub fn only_reference_gaps(produced: usize, omitted: &[Omitted]) -> bool {
  produced == 0
    && !omitted.is_empty()
    && omitted.iter().all(|o| o.reason.is_reference_gap())
}
