//! Core types and trait definitions for the Cifras analytical backend.
//!
//! This crate is deliberately free of HTTP and database dependencies. It holds
//! the catalog entities, the observation primitives, the synthetic product id
//! codec, and the [`store::SeriesStore`] abstraction every other crate builds
//! on.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod catalog;
pub mod error;
pub mod series;
pub mod store;
pub mod table;

pub use error::{Error, Result};
