//! Deployment-specific variable-id assignments.
//!
//! Every field has a default, so an absent `[analytics]` table in the server
//! configuration yields the standard Uruguay deployment.

use cifras_core::series::SeriesKey;
use serde::{Deserialize, Serialize};

/// ISO-numeric id of Uruguay, home country of the yield curves and tenders.
pub const URUGUAY: i64 = 858;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
  /// Country of the sovereign curves, tenders and DCP reference series.
  pub home_country: i64,
  /// Variable holding each country's USD / local-currency rate.
  pub fx_variable:  i64,
  /// Variable holding each country's CPI.
  pub cpi_variable: i64,
  /// DCP reference series: USD/UYU, EUR/UYU and the home CPI.
  pub dcp:          DcpReferences,
  pub policy:       PolicyConfig,
  pub tenders:      TenderConfig,
  pub ticker:       Vec<TickerPair>,
}

impl Default for AnalyticsConfig {
  fn default() -> Self {
    Self {
      home_country: URUGUAY,
      fx_variable:  20,
      cpi_variable: 9,
      dcp:          DcpReferences::default(),
      policy:       PolicyConfig::default(),
      tenders:      TenderConfig::default(),
      ticker:       default_ticker(),
    }
  }
}

// ─── DCP ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DcpReferences {
  pub usd: SeriesKey,
  pub eur: SeriesKey,
  pub cpi: SeriesKey,
}

impl Default for DcpReferences {
  fn default() -> Self {
    Self {
      usd: SeriesKey::new(20, URUGUAY),
      eur: SeriesKey::new(21, URUGUAY),
      cpi: SeriesKey::new(9, URUGUAY),
    }
  }
}

// ─── Monetary policy ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
  pub policy_rate_variable: i64,
  pub expectations_12m:     i64,
  pub expectations_24m:     i64,
  /// Stored as a decimal fraction; reported ×100.
  pub embi_variable:        i64,
  pub countries:            Vec<PolicyCountry>,
}

impl Default for PolicyConfig {
  fn default() -> Self {
    Self {
      policy_rate_variable: 30,
      expectations_12m:     31,
      expectations_24m:     32,
      embi_variable:        33,
      countries:            vec![
        PolicyCountry::new(152, "CL", 24, 3.0, 1.0),
        PolicyCountry::new(170, "CO", 24, 3.0, 1.0),
        PolicyCountry::new(604, "PE", 12, 2.0, 1.0),
        PolicyCountry::new(URUGUAY, "UY", 24, 4.5, 1.5),
        PolicyCountry::new(484, "MX", 12, 3.0, 1.0),
      ],
    }
  }
}

impl PolicyConfig {
  pub fn country(&self, id: i64) -> Option<&PolicyCountry> {
    self.countries.iter().find(|c| c.id == id)
  }

  /// The expectations variable matching a country's horizon.
  pub fn expectations_variable(&self, country: &PolicyCountry) -> i64 {
    if country.expectation_horizon_months == 12 {
      self.expectations_12m
    } else {
      self.expectations_24m
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolicyCountry {
  pub id:                         i64,
  pub code:                       String,
  pub expectation_horizon_months: u32,
  pub target:                     Target,
}

impl PolicyCountry {
  fn new(id: i64, code: &str, horizon: u32, center: f64, band: f64) -> Self {
    Self {
      id,
      code: code.to_owned(),
      expectation_horizon_months: horizon,
      target: Target { center, band },
    }
  }
}

/// Inflation target expressed as `center ± band`, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Target {
  pub center: f64,
  pub band:   f64,
}

impl Target {
  pub fn low(&self) -> f64 { self.center - self.band }

  pub fn high(&self) -> f64 { self.center + self.band }

  pub fn contains(&self, value: f64) -> bool { value >= self.low() && value <= self.high() }
}

// ─── Tenders ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TenderConfig {
  pub country_id:   i64,
  /// Auctions aggregated by the last-N summary.
  pub last_n:       usize,
  /// Default BEVSA history window, in calendar days.
  pub history_days: u64,
  pub buckets:      Vec<TenderBucket>,
}

impl Default for TenderConfig {
  fn default() -> Self {
    Self {
      country_id:   URUGUAY,
      last_n:       5,
      history_days: 90,
      buckets:      vec![
        TenderBucket::new(30, 100, 37),
        TenderBucket::new(90, 103, 39),
        TenderBucket::new(180, 106, 40),
        TenderBucket::new(360, 109, 42),
      ],
    }
  }
}

impl TenderConfig {
  pub fn bucket(&self, days: u32) -> Option<&TenderBucket> {
    self.buckets.iter().find(|b| b.days == days)
  }
}

/// One LRM tenor bucket: its three auction variables and the BEVSA tenor it
/// is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TenderBucket {
  pub days:        u32,
  pub announced:   i64,
  /// Ratio in `[0, 1]` of the offered amount actually taken.
  pub adjudicated: i64,
  pub cut_rate:    i64,
  pub bevsa:       i64,
}

impl TenderBucket {
  /// Buckets store their three variables consecutively from `first`.
  fn new(days: u32, first: i64, bevsa: i64) -> Self {
    Self {
      days,
      announced: first,
      adjudicated: first + 1,
      cut_rate: first + 2,
      bevsa,
    }
  }

  pub fn auction_variables(&self) -> [i64; 3] { [self.announced, self.adjudicated, self.cut_rate] }
}

// ─── Ticker ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TickerPair {
  pub variable_id: i64,
  pub country_id:  i64,
  pub label:       String,
}

fn default_ticker() -> Vec<TickerPair> {
  let usd = |country_id, label: &str| TickerPair {
    variable_id: 20,
    country_id,
    label: label.to_owned(),
  };
  vec![
    usd(URUGUAY, "USD/UYU"),
    TickerPair { variable_id: 21, country_id: URUGUAY, label: "EUR/UYU".to_owned() },
    usd(32, "USD/ARS"),
    usd(76, "USD/BRL"),
    usd(152, "USD/CLP"),
    usd(170, "USD/COP"),
    usd(484, "USD/MXN"),
    usd(604, "USD/PEN"),
    usd(600, "USD/PYG"),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_buckets_are_consecutive() {
    let cfg = TenderConfig::default();
    let b = cfg.bucket(90).unwrap();
    assert_eq!(b.auction_variables(), [103, 104, 105]);
    assert_eq!(b.bevsa, 39);
    assert!(cfg.bucket(60).is_none());
  }

  #[test]
  fn uruguay_target_band() {
    let cfg = PolicyConfig::default();
    let uy = cfg.country(URUGUAY).unwrap();
    assert!(uy.target.contains(6.0));
    assert!(!uy.target.contains(6.1));
    assert_eq!(cfg.expectations_variable(uy), 32);
    assert_eq!(cfg.expectations_variable(cfg.country(604).unwrap()), 31);
  }
}
