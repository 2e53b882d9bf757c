//! Error types shared across the workspace.
//!
//! `ProducerError` covers the four failure classes of the pipeline plus the library
//! errors that bubble up through `?`:
//! - `FeedUnavailable` — recovered locally; the cycle falls back to stale baselines.
//! - `PublishFailure` — one record was not acknowledged; counted, the cycle goes on.
//! - `BrokerConnectFailure` / `BrokerDisconnected` — connection level problems.
//! - `ConfigInvalid` — fatal at startup, before any cycle runs.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type for the producer pipeline.
#[derive(Error, Debug)]
pub enum ProducerError {
    /// The external price feed could not be reached or returned nothing usable.
    #[error("Price feed unavailable: {0}")]
    FeedUnavailable(String),

    /// A single record was not acknowledged by the broker.
    #[error("Publish failed for {symbol}: {reason}")]
    PublishFailure {
        /// Key of the record that failed.
        symbol: String,
        /// Broker-reported reason.
        reason: String,
    },

    /// Every connection attempt to the broker failed.
    #[error("Could not connect to broker after {attempts} attempts: {reason}")]
    BrokerConnectFailure {
        /// Number of attempts made before giving up.
        attempts: u32,
        /// Error reported by the last attempt.
        reason: String,
    },

    /// An established broker connection is no longer usable.
    #[error("Broker connection lost: {0}")]
    BrokerDisconnected(String),

    /// Missing or contradictory configuration.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// I/O error originating from sockets or the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),
}

impl ProducerError {
    /// Errors after which the process cannot continue.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProducerError::BrokerConnectFailure { .. } | ProducerError::ConfigInvalid(_)
        )
    }
}

impl<T> From<PoisonError<T>> for ProducerError {
    fn from(err: PoisonError<T>) -> Self {
        ProducerError::MutexLock(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_connect_and_config_errors_are_fatal() {
        let connect = ProducerError::BrokerConnectFailure {
            attempts: 5,
            reason: "refused".into(),
        };
        assert!(connect.is_fatal());
        assert!(ProducerError::ConfigInvalid("interval".into()).is_fatal());
        assert!(!ProducerError::FeedUnavailable("timeout".into()).is_fatal());
        assert!(!ProducerError::BrokerDisconnected("gone".into()).is_fatal());
    }

    #[test]
    fn publish_failure_names_the_symbol() {
        let err = ProducerError::PublishFailure {
            symbol: "GOLD".into(),
            reason: "ack timeout".into(),
        };
        assert_eq!(err.to_string(), "Publish failed for GOLD: ack timeout");
    }
}
