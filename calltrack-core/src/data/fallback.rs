//! Ordered fallback across several price sources.

use chrono::NaiveDate;

use super::provider::{PriceError, PriceSeries, PriceSource};

/// Tries each source in order and returns the first success.
///
/// Unavailable sources (tripped breaker) are skipped. When every source fails
/// the last error is returned.
pub struct FallbackSource {
    sources: Vec<Box<dyn PriceSource>>,
}

impl FallbackSource {
    pub fn new(sources: Vec<Box<dyn PriceSource>>) -> Self {
        Self { sources }
    }

    pub fn push(&mut self, source: Box<dyn PriceSource>) {
        self.sources.push(source);
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Names of the chained sources, in priority order.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }
}

impl PriceSource for FallbackSource {
    fn name(&self) -> &str {
        "fallback"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, PriceError> {
        let mut last_error = None;
        for source in &self.sources {
            if !source.is_available() {
                log::debug!("{}: unavailable, skipping {symbol}", source.name());
                last_error = Some(PriceError::Unavailable(source.name().to_string()));
                continue;
            }
            match source.fetch(symbol, start, end) {
                Ok(series) => return Ok(series),
                Err(e) => {
                    log::debug!("{} failed for {symbol}: {e}", source.name());
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| PriceError::Unavailable("no price sources configured".into())))
    }

    fn is_available(&self) -> bool {
        self.sources.iter().any(|s| s.is_available())
    }
}
