//!
//! Common types shared by the price producer and by anything that consumes its topic.
//!
//! This crate aggregates:
//! - `error` — unified error type `ProducerError` used across the workspace.
//! - `result` — handy `Result<T, ProducerError>` alias.
//! - `instruments` — the fixed commodity set, feed codes and built-in volatility bounds.
//! - `record` — the `PriceRecord` payload published once per instrument per cycle.
#![warn(missing_docs)]
pub mod error;
pub mod instruments;
pub mod record;
pub mod result;

pub use error::ProducerError;
pub use instruments::Instrument;
pub use record::{PriceRecord, Provenance};
pub use result::Result;
