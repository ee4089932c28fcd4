//! # Price Calculator
//!
//! Pure, deterministic derivation of the four sale prices from a cost input
//! and the configured percentages. All decimal comparisons elsewhere in the
//! pipeline go through the same `round2` normalization used here, so the
//! same value always rounds the same way on both sides of a comparison.

use log::warn;
use serde::Deserialize;

pub const DEFAULT_PROFIT_PCT: f64 = 40.0;
pub const DEFAULT_3X_PCT: f64 = 5.0;
pub const DEFAULT_6X_PCT: f64 = 10.0;
pub const DEFAULT_10X_PCT: f64 = 15.0;

/// Markup percentages applied on top of cost. Immutable per run.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PricingConfig {
    /// Base profit margin applied to cost.
    #[serde(default = "default_profit")]
    pub profit: f64,
    /// Surcharge for the 3-installment price.
    #[serde(default = "default_p3x")]
    pub p3x: f64,
    /// Surcharge for the 6-installment price.
    #[serde(default = "default_p6x")]
    pub p6x: f64,
    /// Surcharge for the 10-installment price.
    #[serde(default = "default_p10x")]
    pub p10x: f64,
}

fn default_profit() -> f64 {
    DEFAULT_PROFIT_PCT
}
fn default_p3x() -> f64 {
    DEFAULT_3X_PCT
}
fn default_p6x() -> f64 {
    DEFAULT_6X_PCT
}
fn default_p10x() -> f64 {
    DEFAULT_10X_PCT
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            profit: DEFAULT_PROFIT_PCT,
            p3x: DEFAULT_3X_PCT,
            p6x: DEFAULT_6X_PCT,
            p10x: DEFAULT_10X_PCT,
        }
    }
}

impl PricingConfig {
    /// Replaces out-of-range percentages with the documented defaults.
    pub fn sanitized(self) -> Self {
        Self {
            profit: valid_pct("profit", self.profit, DEFAULT_PROFIT_PCT),
            p3x: valid_pct("p3x", self.p3x, DEFAULT_3X_PCT),
            p6x: valid_pct("p6x", self.p6x, DEFAULT_6X_PCT),
            p10x: valid_pct("p10x", self.p10x, DEFAULT_10X_PCT),
        }
    }
}

fn valid_pct(name: &str, value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        warn!("Invalid {} percentage {}, using default {}", name, value, fallback);
        fallback
    }
}

/// The four derived prices written alongside the cost.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DerivedPrices {
    pub sell_price: f64,
    pub price_3x: f64,
    pub price_6x: f64,
    pub price_10x: f64,
}

/// Half-away-from-zero rounding to two fractional digits.
///
/// `f64::round` rounds halves away from zero, which is the rounding the
/// target schema expects. Bankers' rounding must not be used here.
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `round2` over an optional decimal; an absent value reads as zero.
#[inline]
pub fn round2_opt(value: Option<f64>) -> f64 {
    value.map(round2).unwrap_or(0.0)
}

/// Computes the four derived prices from a cost.
///
/// A missing or zero cost yields all-zero prices. Never fails.
pub fn calculate_prices(cost: Option<f64>, cfg: &PricingConfig) -> DerivedPrices {
    let cost = match cost {
        Some(c) if c != 0.0 => c,
        _ => return DerivedPrices::default(),
    };

    let marked = cost * (1.0 + cfg.profit / 100.0);

    DerivedPrices {
        sell_price: round2(marked),
        price_3x: round2(marked * (1.0 + cfg.p3x / 100.0) / 3.0),
        price_6x: round2(marked * (1.0 + cfg.p6x / 100.0) / 6.0),
        price_10x: round2(marked * (1.0 + cfg.p10x / 100.0) / 10.0),
    }
}
