//! Catalog entities, the reference data observations hang off.
//!
//! Families and sub-families form a two-level taxonomy over variables.
//! A [`Maestro`] row declares that a variable is tracked for a country; every
//! observation must point at one.

use serde::{Deserialize, Serialize};

use crate::series::{Periodicity, Pid, SeriesKey};

// ─── Taxonomy ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
  pub id:   i64,
  pub name: String,
}

/// Input to create or rename a [`Family`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewFamily {
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubFamily {
  pub id:        i64,
  pub name:      String,
  pub family_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSubFamily {
  pub name:      String,
  pub family_id: i64,
}

/// Small enumeration such as "original" or "seasonally adjusted".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesType {
  pub id:   i64,
  pub name: String,
}

// ─── Variables ───────────────────────────────────────────────────────────────

/// Whether a price series is expressed in current or constant money. Drives
/// CPI deflation in the DCP engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Valuation {
  #[serde(rename = "n")]
  Nominal,
  #[serde(rename = "r")]
  Real,
}

impl Valuation {
  pub fn code(self) -> &'static str {
    match self {
      Self::Nominal => "n",
      Self::Real => "r",
    }
  }

  pub fn from_code(code: &str) -> Option<Self> {
    match code.trim() {
      "n" | "N" => Some(Self::Nominal),
      "r" | "R" => Some(Self::Real),
      _ => None,
    }
  }
}

/// Declared denomination of a variable. Drives FX selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
  Usd,
  Eur,
  Uyu,
}

impl Currency {
  pub fn code(self) -> &'static str {
    match self {
      Self::Usd => "usd",
      Self::Eur => "eur",
      Self::Uyu => "uyu",
    }
  }

  pub fn from_code(code: &str) -> Option<Self> {
    match code.trim().to_ascii_lowercase().as_str() {
      "usd" => Some(Self::Usd),
      "eur" => Some(Self::Eur),
      "uyu" => Some(Self::Uyu),
      _ => None,
    }
  }
}

/// The semantic measure (CPI, USD/LC, policy rate, tenor-k yield, a product
/// price).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
  pub id:              i64,
  pub name:            String,
  pub subfamily_id:    i64,
  pub nominal_or_real: Option<Valuation>,
  pub currency:        Option<Currency>,
  pub series_type_id:  Option<i64>,
}

/// Input to create or update a [`Variable`]. `id` is honoured on create when
/// supplied (deployments pin well-known ids such as the curve tenors);
/// otherwise the store assigns one.
#[derive(Debug, Clone, Deserialize)]
pub struct NewVariable {
  #[serde(default)]
  pub id:              Option<i64>,
  pub name:            String,
  pub subfamily_id:    i64,
  #[serde(default)]
  pub nominal_or_real: Option<Valuation>,
  #[serde(default)]
  pub currency:        Option<Currency>,
  #[serde(default)]
  pub series_type_id:  Option<i64>,
}

// ─── Countries ───────────────────────────────────────────────────────────────

/// Keyed by an ISO-numeric-style integer (858 = Uruguay, 32 = Argentina, …).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
  pub id:   i64,
  pub name: String,
}

// ─── Maestro ─────────────────────────────────────────────────────────────────

/// The mutable attributes of a Maestro declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaestroFields {
  pub periodicity: Periodicity,
  #[serde(default)]
  pub source:      Option<String>,
  #[serde(default = "default_active")]
  pub active:      bool,
  #[serde(default)]
  pub link:        Option<String>,
  #[serde(default)]
  pub script:      Option<String>,
  #[serde(default)]
  pub notes:       Option<String>,
  /// Legacy `categoria` attribute; carried opaquely.
  #[serde(default)]
  pub category:    Option<String>,
  /// Legacy `tipo` attribute; carried opaquely.
  #[serde(default)]
  pub kind:        Option<String>,
}

fn default_active() -> bool { true }

impl MaestroFields {
  pub fn new(periodicity: Periodicity) -> Self {
    Self {
      periodicity,
      source: None,
      active: true,
      link: None,
      script: None,
      notes: None,
      category: None,
      kind: None,
    }
  }
}

/// Declares that `variable_id` is tracked for `country_id`. The pair is the
/// primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Maestro {
  pub variable_id: i64,
  pub country_id:  i64,
  #[serde(flatten)]
  pub fields:      MaestroFields,
}

impl Maestro {
  pub fn new(key: SeriesKey, fields: MaestroFields) -> Self {
    Self {
      variable_id: key.variable_id,
      country_id: key.country_id,
      fields,
    }
  }

  pub fn key(&self) -> SeriesKey { SeriesKey::new(self.variable_id, self.country_id) }

  pub fn pid(&self) -> Pid { self.key().pid() }
}

/// One variable declared for many countries at once.
#[derive(Debug, Clone, Deserialize)]
pub struct MaestroBulk {
  pub variable_id: i64,
  pub country_ids: Vec<i64>,
  #[serde(flatten)]
  pub fields:      MaestroFields,
}

/// Filters for [`crate::store::SeriesStore::list_maestros`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaestroFilter {
  pub variable_id: Option<i64>,
  pub country_id:  Option<i64>,
  pub active:      Option<bool>,
}

// ─── Graphs ──────────────────────────────────────────────────────────────────

/// A named UI preset; its country filter restricts which countries a view
/// shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
  pub id:       i64,
  pub name:     String,
  pub selector: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewGraph {
  pub name:     String,
  #[serde(default)]
  pub selector: Option<String>,
}

// ─── Products ────────────────────────────────────────────────────────────────

/// A Maestro row joined with its variable, country and taxonomy; the unit
/// the price and DCP endpoints work on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
  pub pid:             Pid,
  pub variable_id:     i64,
  pub country_id:      i64,
  pub name:            String,
  pub country:         String,
  pub family:          String,
  pub subfamily:       String,
  pub periodicity:     Periodicity,
  pub currency:        Option<Currency>,
  pub nominal_or_real: Option<Valuation>,
  pub active:          bool,
  pub source:          Option<String>,
}

impl Product {
  pub fn key(&self) -> SeriesKey { SeriesKey::new(self.variable_id, self.country_id) }

  /// `"<variable> (<country>)"`, the label used in reports.
  pub fn label(&self) -> String { format!("{} ({})", self.name, self.country) }
}
