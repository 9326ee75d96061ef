//! Summary statistics over parsed signals.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Action, Signal};

/// How many stocks `top_stocks` keeps.
pub const TOP_STOCKS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalStatistics {
    pub total_signals: usize,
    pub unique_stocks: usize,
    pub date_range: Option<DateRange>,
    pub actions: BTreeMap<Action, usize>,
    /// Most frequently called stocks, highest count first (ties by name).
    pub top_stocks: Vec<(String, usize)>,
    /// Mean over both entry prices, where present.
    pub avg_buy_price: f64,
    pub avg_stop_loss: f64,
}

impl SignalStatistics {
    pub fn from_signals(signals: &[Signal]) -> Self {
        let mut actions = BTreeMap::new();
        let mut stocks: HashMap<&str, usize> = HashMap::new();
        let mut buy_prices = Vec::new();
        let mut stop_losses = Vec::new();

        for signal in signals {
            *actions.entry(signal.action).or_insert(0) += 1;
            *stocks.entry(signal.stock.as_str()).or_insert(0) += 1;
            buy_prices.extend(signal.entry_price());
            buy_prices.extend(signal.buy_price_secondary.filter(|p| p.is_finite() && *p > 0.0));
            stop_losses.extend(signal.stop_level());
        }

        let date_range = signals
            .iter()
            .map(|s| s.listing_date)
            .min()
            .zip(signals.iter().map(|s| s.listing_date).max())
            .map(|(start, end)| DateRange { start, end });

        let mut top_stocks: Vec<(String, usize)> = stocks
            .iter()
            .map(|(stock, count)| (stock.to_string(), *count))
            .collect();
        top_stocks.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_stocks.truncate(TOP_STOCKS);

        Self {
            total_signals: signals.len(),
            unique_stocks: stocks.len(),
            date_range,
            actions,
            top_stocks,
            avg_buy_price: mean(&buy_prices),
            avg_stop_loss: mean(&stop_losses),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
