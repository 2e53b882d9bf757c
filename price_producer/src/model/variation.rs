//! Bounded random variation of a baseline price.

use price_common::Instrument;
use price_common::instruments::DEFAULT_VOLATILITY;
use rand::Rng;
use std::collections::HashMap;

/// Round to cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Perturb `baseline` by one uniform draw from `[-bound, +bound]` and round to cents.
///
/// A zero bound returns the rounded baseline without touching `rng`.
pub fn vary(baseline: f64, bound: f64, rng: &mut impl Rng) -> f64 {
    let bound = if bound.is_finite() { bound.max(0.0) } else { 0.0 };
    if bound == 0.0 {
        return round2(baseline);
    }
    let draw: f64 = rng.random_range(-bound..=bound);
    round2(baseline * (1.0 + draw))
}

/// Per-instrument volatility bounds: built-ins overlaid with operator overrides.
#[derive(Debug, Clone, Default)]
pub struct VolatilityTable {
    bounds: HashMap<Instrument, f64>,
}

impl VolatilityTable {
    /// Built-in bounds for every instrument that has one, then `overrides` on top.
    pub fn new(overrides: &HashMap<Instrument, f64>) -> Self {
        let mut bounds: HashMap<Instrument, f64> = Instrument::all()
            .into_iter()
            .filter_map(|i| i.builtin_volatility().map(|b| (i, b)))
            .collect();
        bounds.extend(overrides.iter().map(|(i, b)| (*i, *b)));
        Self { bounds }
    }

    /// Bound for `instrument`, falling back to [`DEFAULT_VOLATILITY`].
    pub fn bound_for(&self, instrument: Instrument) -> f64 {
        self.bounds
            .get(&instrument)
            .copied()
            .unwrap_or(DEFAULT_VOLATILITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn zero_bound_is_exact() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(vary(1850.00, 0.0, &mut rng), 1850.00);
        }
    }

    #[test]
    fn rounds_to_cents() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let price = vary(1234.5678, 0.02, &mut rng);
            assert_eq!(round2(price), price);
        }
    }

    #[test]
    fn missing_bound_uses_default() {
        let table = VolatilityTable::new(&HashMap::new());
        assert_eq!(table.bound_for(Instrument::PALLADIUM), DEFAULT_VOLATILITY);
        assert_eq!(table.bound_for(Instrument::GOLD), 0.015);
    }

    #[test]
    fn overrides_win_over_builtins() {
        let overrides = HashMap::from([(Instrument::GOLD, 0.0), (Instrument::PALLADIUM, 0.05)]);
        let table = VolatilityTable::new(&overrides);
        assert_eq!(table.bound_for(Instrument::GOLD), 0.0);
        assert_eq!(table.bound_for(Instrument::PALLADIUM), 0.05);
        assert_eq!(table.bound_for(Instrument::SILVER), 0.025);
    }

    proptest! {
        #[test]
        fn price_stays_inside_the_band(
            baseline in 0.01f64..100_000.0,
            bound in 0.0f64..0.5,
            seed in any::<u64>(),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let price = vary(baseline, bound, &mut rng);
            prop_assert!(price >= round2(baseline * (1.0 - bound)));
            prop_assert!(price <= round2(baseline * (1.0 + bound)));
        }
    }
}
