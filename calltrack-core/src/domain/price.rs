//! PricePoint — one daily observation for a symbol.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily price observation.
///
/// The evaluator only reads `close`. The other columns are whatever the
/// provider supplied and are kept for caching and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<u64>,
}

impl PricePoint {
    /// A point carrying only a closing price.
    pub fn close_only(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
        }
    }

    /// True if the close can take part in level comparisons.
    pub fn has_close(&self) -> bool {
        self.close.is_finite()
    }
}

/// Where a price series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    YahooFinance,
    AlphaVantage,
    Cache,
    Synthetic,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::YahooFinance => "yahoo_finance",
            DataSource::AlphaVantage => "alpha_vantage",
            DataSource::Cache => "cache",
            DataSource::Synthetic => "synthetic",
        }
    }
}

/// Build a close-only series on consecutive calendar days starting at `start`.
///
/// Handy for fixtures and for callers that only track closes.
pub fn daily_closes(start: NaiveDate, closes: &[f64]) -> Vec<PricePoint> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PricePoint::close_only(start + chrono::Duration::days(i as i64), close))
        .collect()
}
