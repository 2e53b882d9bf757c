//! In-memory baseline prices.
//!
//! The store is owned by the cycle driver. Outside readers only ever get a
//! [`BaselineStore::snapshot`] copy, and the only mutation path is
//! [`BaselineStore::apply_refresh`].

use log::warn;
use price_common::Instrument;
use std::collections::{BTreeMap, HashMap};

/// Last known "true" price per instrument.
#[derive(Debug, Clone)]
pub struct BaselineStore {
    prices: BTreeMap<Instrument, f64>,
}

impl BaselineStore {
    /// Seed every instrument with its built-in starting price.
    pub fn with_defaults(instruments: &[Instrument]) -> Self {
        Self {
            prices: instruments
                .iter()
                .map(|i| (*i, i.default_baseline()))
                .collect(),
        }
    }

    /// Current baseline of `instrument`, `None` if it is not part of the set.
    pub fn get(&self, instrument: Instrument) -> Option<f64> {
        self.prices.get(&instrument).copied()
    }

    /// Instruments in the store, in the stable order used for a whole cycle.
    pub fn instruments(&self) -> impl Iterator<Item = Instrument> + '_ {
        self.prices.keys().copied()
    }

    /// Overwrite baselines with freshly observed prices.
    ///
    /// Entries that are not strictly positive and finite, or that name an instrument
    /// outside the configured set, are skipped one by one. Returns the number of
    /// baselines actually updated.
    pub fn apply_refresh(&mut self, observed: &HashMap<Instrument, f64>) -> usize {
        let mut applied = 0;
        for (instrument, price) in observed {
            if !price.is_finite() || *price <= 0.0 {
                warn!("Rejected non-positive price {} for {}", price, instrument);
                continue;
            }
            match self.prices.get_mut(instrument) {
                Some(slot) => {
                    *slot = *price;
                    applied += 1;
                }
                None => warn!("Ignoring price for unconfigured instrument {}", instrument),
            }
        }
        applied
    }

    /// Copy of the current baselines.
    pub fn snapshot(&self) -> BTreeMap<Instrument, f64> {
        self.prices.clone()
    }
}
