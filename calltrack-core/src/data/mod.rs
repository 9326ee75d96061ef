//! Price retrieval: sources, fallback chain, cache, circuit breaker

pub mod alpha_vantage;
pub mod cache;
pub mod circuit_breaker;
pub mod fallback;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use alpha_vantage::AlphaVantageSource;
pub use cache::{CacheMeta, CacheStatus, CachedSource, PriceCache};
pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use fallback::FallbackSource;
pub use provider::{PriceError, PriceSeries, PriceSource};
pub use synthetic::SyntheticSource;
pub use yahoo::{YahooOptions, YahooSource};
