//! Price source trait and structured error types.
//!
//! The PriceSource trait abstracts over where daily prices come from (Yahoo
//! Finance, Alpha Vantage, the Parquet cache, generated data) so sources can be
//! chained, cached and mocked in tests. Callers treat any error uniformly as
//! "no data" for the signal at hand.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{DataSource, PricePoint};

/// Structured error types for price retrieval.
#[derive(Debug, Error)]
pub enum PriceError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no prices for '{symbol}' between {start} and {end}")]
    EmptySeries {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("hard stop: price provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("no cached prices for '{symbol}' ({start}..{end})")]
    NoCachedData {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("price error: {0}")]
    Other(String),
}

/// A daily series for one symbol, with provenance.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub symbol: String,
    pub points: Vec<PricePoint>,
    pub source: DataSource,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>, source: DataSource) -> Self {
        Self {
            symbol: symbol.into(),
            points,
            source,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Keep only points inside `[start, end]`, sorted by date.
    pub fn clip(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.points.retain(|p| p.date >= start && p.date <= end);
        self.points.sort_by_key(|p| p.date);
        self
    }
}

/// Trait for price sources.
///
/// Implementations handle the specifics of one origin. Caching and fallback
/// are themselves sources wrapping other sources.
pub trait PriceSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch the daily series for `symbol` over `[start, end]` inclusive.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<PriceSeries, PriceError>;

    /// Whether the source can currently serve requests (not rate-limited, not blocked).
    fn is_available(&self) -> bool;
}

impl<S: PriceSource + ?Sized> PriceSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, PriceError> {
        (**self).fetch(symbol, start, end)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

/// Reject reversed ranges before any I/O happens.
pub fn check_range(start: NaiveDate, end: NaiveDate) -> Result<(), PriceError> {
    if start > end {
        Err(PriceError::InvalidRange { start, end })
    } else {
        Ok(())
    }
}
