//! Yahoo Finance price source.
//!
//! Fetches daily bars from Yahoo's v8 chart API. Handles the exchange suffix,
//! a polite delay between requests, retries with exponential backoff, response
//! parsing, and the circuit breaker.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes. Alpha Vantage is the configured fallback when Yahoo fails.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

use super::circuit_breaker::CircuitBreaker;
use super::provider::{check_range, PriceError, PriceSeries, PriceSource};
use crate::domain::{DataSource, PricePoint};

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

/// Request behaviour for [`YahooSource`].
#[derive(Debug, Clone)]
pub struct YahooOptions {
    /// Exchange suffix appended to bare symbols (`".NS"` for NSE listings).
    pub symbol_suffix: String,
    /// Pause before every request.
    pub request_delay: Duration,
    pub timeout: Duration,
    pub max_retries: u32,
    /// First backoff step; doubles on each retry.
    pub base_delay: Duration,
}

impl Default for YahooOptions {
    fn default() -> Self {
        Self {
            symbol_suffix: ".NS".into(),
            request_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(15),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

pub struct YahooSource {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    options: YahooOptions,
}

impl YahooSource {
    pub fn new(options: YahooOptions, circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, PriceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(options.timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| PriceError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            options,
        })
    }

    /// Ticker as Yahoo knows it: `TCS` becomes `TCS.NS`.
    pub fn provider_symbol(&self, symbol: &str) -> String {
        with_suffix(symbol, &self.options.symbol_suffix)
    }

    /// Build the chart API URL for a symbol and date range.
    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end.and_time(NaiveTime::MIN).and_utc().timestamp() + 86_399;
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d"
        )
    }

    /// Parse the chart API response into price points.
    ///
    /// Rows without a close (holidays, halted sessions) are dropped.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<PricePoint>, PriceError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => PriceError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => {
                PriceError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => PriceError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| PriceError::ResponseFormatChanged("result array is empty".into()))?;

        let Some(timestamps) = data.timestamp else {
            // Yahoo omits timestamps entirely when the range has no sessions.
            return Ok(Vec::new());
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| PriceError::ResponseFormatChanged("no quote data".into()))?;

        let mut points = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    PriceError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let Some(close) = quote.close.get(i).copied().flatten() else {
                continue;
            };

            points.push(PricePoint {
                date,
                open: quote.open.get(i).copied().flatten(),
                high: quote.high.get(i).copied().flatten(),
                low: quote.low.get(i).copied().flatten(),
                close,
                volume: quote.volume.get(i).copied().flatten(),
            });
        }

        Ok(points)
    }

    /// Execute the request with retry and circuit breaker logic.
    fn fetch_with_retry(
        &self,
        provider_symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, PriceError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(PriceError::CircuitBreakerTripped);
        }

        let url = Self::chart_url(provider_symbol, start, end);
        let mut last_error = None;

        for attempt in 0..=self.options.max_retries {
            let pause = if attempt == 0 {
                self.options.request_delay
            } else {
                self.options.base_delay * 2u32.saturating_pow(attempt - 1)
            };
            if !pause.is_zero() {
                std::thread::sleep(pause);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(PriceError::CircuitBreakerTripped);
            }

            log::debug!("yahoo: GET {provider_symbol} {start}..{end} (attempt {})", attempt + 1);

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN {
                        self.circuit_breaker.trip();
                        return Err(PriceError::CircuitBreakerTripped);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.circuit_breaker.record_failure();
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        log::warn!("yahoo: rate limited on {provider_symbol}");
                        last_error = Some(PriceError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        return Err(PriceError::AuthenticationRequired(
                            "Yahoo Finance requires authentication".into(),
                        ));
                    }

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(PriceError::SymbolNotFound {
                            symbol: provider_symbol.to_string(),
                        });
                    }

                    if !status.is_success() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(PriceError::Other(format!(
                            "HTTP {status} for {provider_symbol}"
                        )));
                        continue;
                    }

                    let chart: ChartResponse = resp.json().map_err(|e| {
                        PriceError::ResponseFormatChanged(format!(
                            "failed to parse response for {provider_symbol}: {e}"
                        ))
                    })?;

                    let points = Self::parse_response(provider_symbol, chart)?;
                    self.circuit_breaker.record_success();
                    return Ok(points);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(PriceError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(PriceError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| PriceError::Other("max retries exceeded".into())))
    }
}

impl PriceSource for YahooSource {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, PriceError> {
        check_range(start, end)?;
        let provider_symbol = self.provider_symbol(symbol);
        let points = self.fetch_with_retry(&provider_symbol, start, end)?;
        let series = PriceSeries::new(symbol, points, DataSource::YahooFinance).clip(start, end);
        if series.is_empty() {
            return Err(PriceError::EmptySeries {
                symbol: symbol.to_string(),
                start,
                end,
            });
        }
        Ok(series)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

fn with_suffix(symbol: &str, suffix: &str) -> String {
    if suffix.is_empty() || symbol.ends_with(suffix) {
        symbol.to_string()
    } else {
        format!("{symbol}{suffix}")
    }
}
