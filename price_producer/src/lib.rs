//! Commodity price producer.
//!
//! Periodically turns per-instrument baseline prices into `PriceRecord`s and publishes
//! them to a broker topic keyed by symbol. Building blocks:
//!
//! - `model` — baseline store, refresh policy, variation generator, record builder.
//! - `feed` — the external price feed boundary and its MetalpriceAPI client.
//! - `broker` — broker connection traits with stdout and Kafka implementations.
//! - `publisher` — per-record publish with acknowledgement timeout and accounting.
//! - `retry` — bounded linear backoff used for broker connects.
//! - `shutdown` — interruptible sleeps driven by the stop signal.
//! - `driver` — the connect/run/shutdown state machine.
//! - `status` — read-only snapshot board and its health/metrics listener.
//! - `args` — CLI/environment configuration and startup validation.
#![warn(missing_docs)]
pub mod args;
pub mod broker;
pub mod driver;
pub mod feed;
pub mod model;
pub mod publisher;
pub mod retry;
pub mod shutdown;
pub mod status;
