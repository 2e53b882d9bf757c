//! Commodity instruments known to the producer.
//!
//! The set is fixed at compile time. Each instrument knows its feed currency code, the
//! baseline it starts from before any live refresh, and optionally a built-in
//! volatility bound.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

/// Bound applied to instruments without a configured volatility (±2%).
pub const DEFAULT_VOLATILITY: f64 = 0.02;

/// Currency every record is quoted in.
pub const QUOTE_CURRENCY: &str = "USD";

/// Supported commodity symbols.
#[allow(missing_docs)]
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    Hash,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
)]
#[strum(ascii_case_insensitive)]
pub enum Instrument {
    GOLD,
    SILVER,
    PLATINUM,
    PALLADIUM,
}

impl Instrument {
    /// All instruments in declaration order. This is the order used for building and
    /// publishing every cycle.
    pub fn all() -> Vec<Instrument> {
        Instrument::iter().collect()
    }

    /// ISO 4217 style code the price feed uses for this metal.
    pub fn feed_code(&self) -> &'static str {
        match self {
            Instrument::GOLD => "XAU",
            Instrument::SILVER => "XAG",
            Instrument::PLATINUM => "XPT",
            Instrument::PALLADIUM => "XPD",
        }
    }

    /// Reverse lookup of [`Self::feed_code`].
    pub fn from_feed_code(code: &str) -> Option<Instrument> {
        Instrument::iter().find(|i| i.feed_code() == code)
    }

    /// Starting baseline in USD per troy ounce.
    pub fn default_baseline(&self) -> f64 {
        match self {
            Instrument::GOLD => 2000.00,
            Instrument::SILVER => 24.00,
            Instrument::PLATINUM => 950.00,
            Instrument::PALLADIUM => 1000.00,
        }
    }

    /// Built-in volatility bound, if the instrument has one.
    pub fn builtin_volatility(&self) -> Option<f64> {
        match self {
            Instrument::GOLD => Some(0.015),
            Instrument::SILVER => Some(0.025),
            Instrument::PLATINUM => Some(0.02),
            Instrument::PALLADIUM => None,
        }
    }
}
