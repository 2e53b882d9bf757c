//! Domain models for the price pipeline.
//!
//! - `baseline` — per-instrument reference prices, mutated only by refreshes.
//! - `refresh` — the staleness window that decides when to hit the external feed.
//! - `variation` — bounded random perturbation of a baseline for one tick.
//! - `record_builder` — assembles one `PriceRecord` per instrument per cycle.

pub mod baseline;
pub mod record_builder;
pub mod refresh;
pub mod variation;
