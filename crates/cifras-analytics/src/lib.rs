//! Derived-series engines for the Cifras backend.
//!
//! Every engine is a set of async functions over a [`reader::Reader`], which
//! wraps any [`cifras_core::store::SeriesStore`] and converts its errors into
//! [`cifras_core::Error`]. Engines are pure functions of the observations they
//! read at request time; the only per-request state is the reference-series
//! cache inside [`dcp::DcpEngine`].
//!
//! Variation semantics differ by domain and are kept explicit:
//! prices, FX, CPI and implicit inflation use relative percent change
//! ([`index::variation_percent`]); yield curves and policy rates use signed
//! differences in percentage points ([`index::pp_change`]).

pub mod config;
pub mod dcp;
pub mod dollar_inflation;
pub mod fx;
pub mod implicit;
pub mod index;
pub mod monthly;
pub mod omit;
pub mod policy;
pub mod prices;
pub mod reader;
pub mod tenders;
pub mod ticker;
pub mod tidy;
pub mod yield_curve;

pub use config::AnalyticsConfig;
pub use omit::{OmitReason, Omitted};
pub use reader::Reader;

#[cfg(test)]
mod scenarios;
