//! Generated price series for development runs.
//!
//! Produces a seeded random walk that starts near a reference price, so the
//! walk actually interacts with a call's levels. Output is deterministic for a
//! given (seed, symbol, range). Everything it returns is tagged
//! [`DataSource::Synthetic`] and never written to the cache.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{check_range, PriceError, PriceSeries, PriceSource};
use crate::domain::{DataSource, PricePoint};

/// Anchor used for symbols without a registered reference price.
pub const DEFAULT_ANCHOR: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct SyntheticSource {
    seed: u64,
    anchors: HashMap<String, f64>,
    max_daily_move: f64,
}

impl SyntheticSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            anchors: HashMap::new(),
            max_daily_move: 0.03,
        }
    }

    /// Start walks for `symbol` at `price`. Non-positive prices are ignored.
    pub fn with_anchor(mut self, symbol: impl Into<String>, price: f64) -> Self {
        self.set_anchor(symbol, price);
        self
    }

    pub fn set_anchor(&mut self, symbol: impl Into<String>, price: f64) {
        if price.is_finite() && price > 0.0 {
            self.anchors.insert(symbol.into(), price);
        }
    }

    /// Largest absolute daily return, as a fraction.
    pub fn with_max_daily_move(mut self, max_daily_move: f64) -> Self {
        if max_daily_move.is_finite() && max_daily_move > 0.0 {
            self.max_daily_move = max_daily_move.min(0.5);
        }
        self
    }

    pub fn anchor(&self, symbol: &str) -> f64 {
        self.anchors.get(symbol).copied().unwrap_or(DEFAULT_ANCHOR)
    }

    fn rng_for(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        hasher.update(start.to_string().as_bytes());
        hasher.update(end.to_string().as_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }

    /// Weekday-only random walk over `[start, end]`.
    pub fn generate(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<PricePoint> {
        let mut rng = self.rng_for(symbol, start, end);
        let mut price = self.anchor(symbol);
        let mut points = Vec::new();

        for current in start.iter_days().take_while(|d| *d <= end) {
            if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                continue;
            }

            let daily_return: f64 = rng.gen_range(-self.max_daily_move..self.max_daily_move);
            let open = price;
            let close = price * (1.0 + daily_return);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume = rng.gen_range(10_000..1_000_000u64);

            points.push(PricePoint {
                date: current,
                open: Some(open),
                high: Some(high),
                low: Some(low),
                close,
                volume: Some(volume),
            });
            price = close;
        }
        points
    }
}

impl PriceSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, PriceError> {
        check_range(start, end)?;
        log::warn!("generating synthetic prices for {symbol} ({start}..{end})");
        let points = self.generate(symbol, start, end);
        if points.is_empty() {
            return Err(PriceError::EmptySeries {
                symbol: symbol.to_string(),
                start,
                end,
            });
        }
        Ok(PriceSeries::new(symbol, points, DataSource::Synthetic))
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    #[test]
    fn deterministic_for_same_inputs() {
        let src = SyntheticSource::new(7);
        assert_eq!(src.generate("TCS", d(1, 1), d(1, 31)), src.generate("TCS", d(1, 1), d(1, 31)));
        assert_ne!(
            src.generate("TCS", d(1, 1), d(1, 31)),
            SyntheticSource::new(8).generate("TCS", d(1, 1), d(1, 31))
        );
    }

    #[test]
    fn skips_weekends_and_starts_near_anchor() {
        let src = SyntheticSource::new(1).with_anchor("INFY", 1500.0);
        let points = src.generate("INFY", d(1, 1), d(1, 14));
        assert_eq!(points.len(), 10);
        assert!(points
            .iter()
            .all(|p| !matches!(p.date.weekday(), Weekday::Sat | Weekday::Sun)));
        let first = points[0].close;
        assert!((first - 1500.0).abs() <= 1500.0 * 0.03 + 1e-9);
    }

    #[test]
    fn tagged_synthetic_and_weekend_only_range_is_empty() {
        let src = SyntheticSource::new(1);
        let series = src.fetch("ABC", d(1, 1), d(1, 5)).unwrap();
        assert_eq!(series.source, DataSource::Synthetic);

        // 2024-01-06/07 is a weekend.
        assert!(matches!(
            src.fetch("ABC", d(1, 6), d(1, 7)),
            Err(PriceError::EmptySeries { .. })
        ));
    }

    #[test]
    fn invalid_anchor_falls_back_to_default() {
        let src = SyntheticSource::new(1).with_anchor("X", -5.0);
        assert_eq!(src.anchor("X"), DEFAULT_ANCHOR);
    }
}
