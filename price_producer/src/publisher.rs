//! Record publishing with acknowledgement.
//!
//! Records are sent one at a time, keyed by symbol, and each send blocks until the broker
//! acknowledges it or [`ACK_TIMEOUT`] passes. A failed record is logged and counted; it is
//! not retried within the cycle and never stops the remaining records.

use crate::broker::{Ack, Broker, BrokerError};
use log::{debug, error};
use price_common::{PriceRecord, ProducerError};
use std::time::Duration;
use thiserror::Error;

/// Longest wait for one acknowledgement.
pub const ACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a single record was not published.
#[derive(Error, Debug)]
pub enum PublishError {
    /// The record could not be encoded.
    #[error("encoding {symbol} failed: {source}")]
    Encode {
        /// Record key.
        symbol: String,
        /// Encoder error.
        source: serde_json::Error,
    },
    /// The broker did not acknowledge the record.
    #[error("broker rejected {symbol}: {source}")]
    Broker {
        /// Record key.
        symbol: String,
        /// Broker error.
        source: BrokerError,
    },
}

impl PublishError {
    /// `true` when the connection itself is gone, not just this record.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            PublishError::Broker {
                source: BrokerError::Disconnected(_),
                ..
            }
        )
    }
}

impl From<PublishError> for ProducerError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::Broker {
                source: BrokerError::Disconnected(reason),
                ..
            } => ProducerError::BrokerDisconnected(reason),
            PublishError::Encode { symbol, source } => ProducerError::PublishFailure {
                symbol,
                reason: source.to_string(),
            },
            PublishError::Broker { symbol, source } => ProducerError::PublishFailure {
                symbol,
                reason: source.to_string(),
            },
        }
    }
}

/// Accounting for one cycle's worth of publishes.
#[derive(Debug, Default)]
pub struct PublishReport {
    /// Records attempted.
    pub attempted: usize,
    /// Records acknowledged.
    pub succeeded: usize,
    /// One entry per failed record, in publish order.
    pub failures: Vec<PublishError>,
}

impl PublishReport {
    /// First failure that indicates a lost connection, if any.
    pub fn disconnect(&self) -> Option<&PublishError> {
        self.failures.iter().find(|f| f.is_disconnect())
    }
}

/// Publishes records to one topic over one broker connection.
pub struct Publisher<B: Broker> {
    broker: B,
    topic: String,
    ack_timeout: Duration,
}

impl<B: Broker> Publisher<B> {
    /// Publish to `topic` over `broker` with the default [`ACK_TIMEOUT`].
    pub fn new(broker: B, topic: &str) -> Self {
        Self::with_timeout(broker, topic, ACK_TIMEOUT)
    }

    /// Publish with a custom acknowledgement timeout.
    pub fn with_timeout(broker: B, topic: &str, ack_timeout: Duration) -> Self {
        Self {
            broker,
            topic: topic.to_string(),
            ack_timeout,
        }
    }

    /// Send one record and wait for its acknowledgement.
    pub fn publish(&mut self, record: &PriceRecord) -> Result<Ack, PublishError> {
        let symbol = record.key();
        let payload = serde_json::to_vec(record).map_err(|source| PublishError::Encode {
            symbol: symbol.clone(),
            source,
        })?;
        self.broker
            .publish(&self.topic, &symbol, &payload, self.ack_timeout)
            .map_err(|source| PublishError::Broker { symbol, source })
    }

    /// Send every record in order; failures are recorded and the next record is still
    /// attempted.
    pub fn publish_all(&mut self, records: &[PriceRecord]) -> PublishReport {
        let mut report = PublishReport::default();
        for record in records {
            report.attempted += 1;
            match self.publish(record) {
                Ok(ack) => {
                    debug!(
                        "Sent {}: ${:.2} to partition {} offset {}",
                        record.symbol, record.price, ack.partition, ack.offset
                    );
                    report.succeeded += 1;
                }
                Err(e) => {
                    error!("Failed to send {}: {}", record.symbol, e);
                    report.failures.push(e);
                }
            }
        }
        report
    }

    /// Borrow the underlying connection.
    pub fn broker(&self) -> &B {
        &self.broker
    }

    /// Close the connection and give it back.
    pub fn close(mut self) -> B {
        self.broker.close();
        self.broker
    }
}
