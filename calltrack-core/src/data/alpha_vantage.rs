//! Alpha Vantage price source (`TIME_SERIES_DAILY`, full history).
//!
//! Only built when an API key is configured. The endpoint returns the whole
//! history in one document, so the range filter is applied locally.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use super::provider::{check_range, PriceError, PriceSeries, PriceSource};
use crate::domain::{DataSource, PricePoint};

const ENDPOINT: &str = "https://www.alphavantage.co/query";

#[derive(Debug, Deserialize)]
struct DailyResponse {
    #[serde(rename = "Time Series (Daily)")]
    series: Option<BTreeMap<String, DailyBar>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailyBar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

pub struct AlphaVantageSource {
    client: reqwest::blocking::Client,
    api_key: String,
    request_delay: Duration,
}

impl AlphaVantageSource {
    pub fn new(
        api_key: impl Into<String>,
        timeout: Duration,
        request_delay: Duration,
    ) -> Result<Self, PriceError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(PriceError::AuthenticationRequired(
                "Alpha Vantage API key is empty".into(),
            ));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PriceError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            request_delay,
        })
    }

    fn parse_response(
        symbol: &str,
        resp: DailyResponse,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, PriceError> {
        if let Some(msg) = resp.error_message {
            return Err(if msg.contains("Invalid API call") {
                PriceError::SymbolNotFound {
                    symbol: symbol.to_string(),
                }
            } else {
                PriceError::Other(msg)
            });
        }
        // Throttling is reported in-band with HTTP 200.
        if let Some(note) = resp.note.or(resp.information) {
            log::warn!("alpha vantage: {note}");
            return Err(PriceError::RateLimited {
                retry_after_secs: 60,
            });
        }
        let series = resp.series.ok_or_else(|| {
            PriceError::ResponseFormatChanged("missing 'Time Series (Daily)'".into())
        })?;

        let mut points = Vec::new();
        for (date_str, bar) in series {
            let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
                PriceError::ResponseFormatChanged(format!("bad date '{date_str}': {e}"))
            })?;
            if date < start || date > end {
                continue;
            }
            let Some(close) = parse_num(&bar.close) else {
                continue;
            };
            points.push(PricePoint {
                date,
                open: parse_num(&bar.open),
                high: parse_num(&bar.high),
                low: parse_num(&bar.low),
                close,
                volume: bar.volume.trim().parse().ok(),
            });
        }
        // BTreeMap keys are ISO dates, so iteration is already ascending.
        Ok(points)
    }
}

fn parse_num(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl PriceSource for AlphaVantageSource {
    fn name(&self) -> &str {
        "alpha_vantage"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, PriceError> {
        check_range(start, end)?;
        if !self.request_delay.is_zero() {
            std::thread::sleep(self.request_delay);
        }
        log::debug!("alpha vantage: GET {symbol} {start}..{end}");

        let resp = self
            .client
            .get(ENDPOINT)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
                ("outputsize", "full"),
            ])
            .send()
            .map_err(|e| PriceError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PriceError::Other(format!("HTTP {status} for {symbol}")));
        }

        let body: DailyResponse = resp.json().map_err(|e| {
            PriceError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })?;

        let points = Self::parse_response(symbol, body, start, end)?;
        if points.is_empty() {
            return Err(PriceError::EmptySeries {
                symbol: symbol.to_string(),
                start,
                end,
            });
        }
        Ok(PriceSeries::new(symbol, points, DataSource::AlphaVantage))
    }

    fn is_available(&self) -> bool {
        true
    }
}
