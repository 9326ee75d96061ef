//! Price source assembly from configuration.
//!
//! Layout of the resulting chain:
//! - online: cache → (Yahoo → Alpha Vantage, when a key is set)
//! - offline: cache only
//! - with synthetic opt-in: the above, then a synthetic walk anchored on
//!   each stock's entry price. Generated series never reach the cache.

use std::collections::HashMap;
use std::sync::Arc;

use calltrack_core::data::{
    AlphaVantageSource, CachedSource, CircuitBreaker, FallbackSource, PriceCache, PriceSource,
    SyntheticSource, YahooSource,
};
use calltrack_core::domain::Signal;

use crate::config::AnalyzerConfig;
use crate::pipeline::RunError;

/// Build the price source chain described by `config`.
///
/// `signals` supply the anchor prices for synthetic data; they are only
/// consulted when `config.data.synthetic` is set.
pub fn build_source<S: AsRef<Signal>>(
    config: &AnalyzerConfig,
    signals: &[S],
) -> Result<Box<dyn PriceSource>, RunError> {
    let cache = PriceCache::new(&config.data.cache_dir);

    let primary: Box<dyn PriceSource> = if config.data.offline {
        log::info!("offline mode: prices from {} only", cache.cache_dir().display());
        Box::new(CachedSource::offline(cache))
    } else {
        Box::new(CachedSource::new(cache, Box::new(network_chain(config)?)))
    };

    if !config.data.synthetic {
        return Ok(primary);
    }

    log::warn!("synthetic prices enabled: results on generated data are flagged");
    let synthetic = synthetic_source(config.data.synthetic_seed, signals);
    Ok(Box::new(FallbackSource::new(vec![
        primary,
        Box::new(synthetic),
    ])))
}

/// Yahoo Finance, then Alpha Vantage when an API key is available.
pub fn network_chain(config: &AnalyzerConfig) -> Result<FallbackSource, RunError> {
    let provider = &config.provider;
    let breaker = Arc::new(CircuitBreaker::new(provider.circuit_breaker_cooldown()));

    let mut chain = FallbackSource::new(vec![Box::new(YahooSource::new(
        provider.yahoo_options(),
        breaker,
    )?)]);

    if let Some(key) = config.resolved_api_key() {
        chain.push(Box::new(AlphaVantageSource::new(
            key,
            provider.timeout(),
            provider.request_delay(),
        )?));
    }
    log::debug!("price sources: {}", chain.source_names().join(" -> "));
    Ok(chain)
}

/// Synthetic source anchored on the first usable entry price seen per stock.
pub fn synthetic_source<S: AsRef<Signal>>(seed: u64, signals: &[S]) -> SyntheticSource {
    let mut anchors: HashMap<&str, f64> = HashMap::new();
    for signal in signals.iter().map(AsRef::as_ref) {
        if let Some(price) = signal.entry_price() {
            anchors.entry(signal.stock.as_str()).or_insert(price);
        }
    }

    let mut source = SyntheticSource::new(seed);
    for (stock, price) in anchors {
        source.set_anchor(stock, price);
    }
    source
}
