//! Message broker boundary.
//!
//! The pipeline needs three primitives from a broker: connect, publish-and-wait-for-ack,
//! and close. [`Connector`] opens connections, [`Broker`] is one open connection.
//!
//! Implementations:
//! - `stdout` — writes one tab-separated line per record and acknowledges immediately.
//! - `kafka` — librdkafka producer (`kafka` cargo feature, on by default).

use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "kafka")]
pub mod kafka;
pub mod stdout;

/// Broker confirmation that a record was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    /// Partition the record landed in.
    pub partition: i32,
    /// Offset within that partition.
    pub offset: i64,
}

/// Failures reported by a broker connection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BrokerError {
    /// Could not establish a connection.
    #[error("connect failed: {0}")]
    Connect(String),

    /// No acknowledgement within the allowed time.
    #[error("no acknowledgement within {0:?}")]
    Timeout(Duration),

    /// The broker rejected this one record.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// The connection is no longer usable and must be reopened.
    #[error("connection lost: {0}")]
    Disconnected(String),
}

/// One open broker connection.
pub trait Broker {
    /// Send `payload` keyed by `key` to `topic` and block until it is acknowledged or
    /// `timeout` passes.
    fn publish(
        &mut self,
        topic: &str,
        key: &str,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Ack, BrokerError>;

    /// Release the connection, flushing anything still in flight.
    fn close(&mut self);
}

/// Factory for broker connections.
pub trait Connector {
    /// Connection type produced by this connector.
    type Connection: Broker;

    /// Open a connection to `servers`.
    fn connect(&self, servers: &[String]) -> Result<Self::Connection, BrokerError>;
}
