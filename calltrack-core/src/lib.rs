//! Calltrack Core — signal records, expiry, performance evaluation, price sources.
//!
//! This crate contains the evaluation logic and its collaborators:
//! - Domain types (signals, price points, outcomes, performance results)
//! - Expiry calculator (time frame text to cutoff date)
//! - Performance evaluator (single pass over daily closes)
//! - Chat-export parser and signal statistics
//! - Price sources: Yahoo Finance, Alpha Vantage, fallback chain, Parquet
//!   cache, opt-in synthetic data, circuit breaker
//! - Injected clock

pub mod chat;
pub mod clock;
pub mod data;
pub mod domain;
pub mod evaluator;
pub mod expiry;

pub use clock::{Clock, FixedClock, SystemClock};
pub use evaluator::evaluate;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed to worker threads are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Signal>();
        require_sync::<domain::Signal>();
        require_send::<domain::AnalyzedSignal>();
        require_sync::<domain::AnalyzedSignal>();
        require_send::<domain::PricePoint>();
        require_sync::<domain::PricePoint>();
        require_send::<domain::PerformanceResult>();
        require_sync::<domain::PerformanceResult>();

        require_send::<data::PriceSeries>();
        require_sync::<data::PriceSeries>();
        require_send::<data::YahooSource>();
        require_sync::<data::YahooSource>();
        require_send::<data::AlphaVantageSource>();
        require_sync::<data::AlphaVantageSource>();
        require_send::<data::FallbackSource>();
        require_sync::<data::FallbackSource>();
        require_send::<data::CachedSource>();
        require_sync::<data::CachedSource>();
        require_send::<data::SyntheticSource>();
        require_sync::<data::SyntheticSource>();
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();

        require_send::<chat::ChatParser>();
        require_sync::<chat::ChatParser>();
        require_send::<SystemClock>();
        require_sync::<FixedClock>();
    }
}
