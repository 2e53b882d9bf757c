//! Price record payload and JSON encoding helpers.
//!
//! A `PriceRecord` is produced once per instrument per cycle and published keyed by its
//! symbol. It is immutable once built.

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::error::ProducerError;
use crate::instruments::Instrument;

/// Whether the cycle that produced a record refreshed its baselines from the live feed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Provenance {
    /// No successful feed refresh happened in this cycle.
    Simulated,
    /// This cycle's refresh attempt succeeded.
    Live,
}

/// Market price for a single commodity in one cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceRecord {
    /// Instrument symbol, also used as the message key.
    pub symbol: Instrument,
    /// Baseline perturbed by one variation draw, rounded to cents.
    pub price: f64,
    /// Always `USD`.
    pub currency: String,
    /// RFC 3339 UTC timestamp with millisecond precision.
    pub timestamp: String,
    /// Provenance tag shared by every record of the cycle.
    pub source: Provenance,
    /// Synthetic volume.
    pub volume: u32,
    /// Synthetic 24h change in percent, rounded to 2 decimals.
    pub change_24h: f64,
}

impl PriceRecord {
    /// Message key for this record.
    pub fn key(&self) -> String {
        self.symbol.to_string()
    }

    /// Encode the record to JSON bytes.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, ProducerError> {
        let json = serde_json::to_vec(self)?;
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_uses_upper_case_tags() {
        let record = PriceRecord {
            symbol: Instrument::GOLD,
            price: 1850.0,
            currency: "USD".into(),
            timestamp: "2026-01-01T00:00:00.000Z".into(),
            source: Provenance::Live,
            volume: 1200,
            change_24h: -1.25,
        };
        let value: serde_json::Value =
            serde_json::from_slice(&record.to_json_bytes().unwrap()).unwrap();
        assert_eq!(value["symbol"], "GOLD");
        assert_eq!(value["source"], "LIVE");
        assert_eq!(value["change_24h"], -1.25);
        assert_eq!(record.key(), "GOLD");
        assert_eq!(Provenance::Simulated.to_string(), "SIMULATED");
    }
}
