//! Per-cycle record assembly.

use crate::model::baseline::BaselineStore;
use crate::model::refresh::RefreshOutcome;
use crate::model::variation::{VolatilityTable, round2, vary};
use chrono::{DateTime, SecondsFormat, Utc};
use price_common::instruments::QUOTE_CURRENCY;
use price_common::{PriceRecord, Provenance};
use rand::Rng;

/// Synthetic volume range, inclusive.
pub const VOLUME_RANGE: (u32, u32) = (1_000, 10_000);
/// Synthetic 24h change range in percent, inclusive.
pub const CHANGE_24H_RANGE: (f64, f64) = (-5.0, 5.0);

/// Build one record per instrument in the store, in store order.
///
/// Every record of the cycle carries the same provenance: `LIVE` iff `outcome` is
/// [`RefreshOutcome::Refreshed`].
pub fn build_cycle(
    store: &BaselineStore,
    volatility: &VolatilityTable,
    outcome: RefreshOutcome,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Vec<PriceRecord> {
    let source = if outcome.is_live() {
        Provenance::Live
    } else {
        Provenance::Simulated
    };
    let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);

    store
        .instruments()
        .filter_map(|instrument| {
            let baseline = store.get(instrument)?;
            Some(PriceRecord {
                symbol: instrument,
                price: vary(baseline, volatility.bound_for(instrument), rng),
                currency: QUOTE_CURRENCY.to_string(),
                timestamp: timestamp.clone(),
                source,
                volume: rng.random_range(VOLUME_RANGE.0..=VOLUME_RANGE.1),
                change_24h: round2(rng.random_range(CHANGE_24H_RANGE.0..=CHANGE_24H_RANGE.1)),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use price_common::Instrument;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    fn build(outcome: RefreshOutcome, seed: u64) -> Vec<PriceRecord> {
        let store = BaselineStore::with_defaults(&Instrument::all());
        let table = VolatilityTable::new(&HashMap::new());
        let mut rng = StdRng::seed_from_u64(seed);
        build_cycle(&store, &table, outcome, Utc::now(), &mut rng)
    }

    #[test]
    fn one_record_per_instrument_in_stable_order() {
        let records = build(RefreshOutcome::Skipped, 1);
        let symbols: Vec<Instrument> = records.iter().map(|r| r.symbol).collect();
        assert_eq!(symbols, Instrument::all());
    }

    #[test]
    fn provenance_follows_this_cycles_refresh() {
        assert!(build(RefreshOutcome::Refreshed(2), 2)
            .iter()
            .all(|r| r.source == Provenance::Live));
        assert!(build(RefreshOutcome::Unavailable, 3)
            .iter()
            .all(|r| r.source == Provenance::Simulated));
        assert!(build(RefreshOutcome::Skipped, 4)
            .iter()
            .all(|r| r.source == Provenance::Simulated));
    }

    #[test]
    fn synthetic_fields_stay_in_range() {
        for seed in 0..50 {
            for record in build(RefreshOutcome::Skipped, seed) {
                assert!((VOLUME_RANGE.0..=VOLUME_RANGE.1).contains(&record.volume));
                assert!(record.change_24h >= CHANGE_24H_RANGE.0);
                assert!(record.change_24h <= CHANGE_24H_RANGE.1);
                assert_eq!(record.change_24h, round2(record.change_24h));
                assert_eq!(record.currency, "USD");
            }
        }
    }

    #[test]
    fn records_share_one_timestamp() {
        let now = DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let store = BaselineStore::with_defaults(&Instrument::all());
        let table = VolatilityTable::new(&HashMap::new());
        let mut rng = StdRng::seed_from_u64(9);

        let records = build_cycle(&store, &table, RefreshOutcome::Skipped, now, &mut rng);

        assert!(records
            .iter()
            .all(|r| r.timestamp == "2026-03-01T12:00:00.000Z"));
    }
}
