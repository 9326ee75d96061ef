//! Outcome labels and the per-signal performance record.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::price::DataSource;
use super::signal::MAX_TARGETS;

/// Terminal classification of a signal's price performance.
///
/// `NoHit` is the evaluator's working placeholder and is resolved by the
/// precedence rule before a result is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    NoData,
    NoHit,
    StopLossHit,
    #[serde(rename = "TARGET_1_HIT")]
    Target1Hit,
    #[serde(rename = "TARGET_2_HIT")]
    Target2Hit,
    #[serde(rename = "TARGET_3_HIT")]
    Target3Hit,
    Profit,
    Loss,
    Breakeven,
}

impl Outcome {
    pub const ALL: [Outcome; 9] = [
        Outcome::NoData,
        Outcome::NoHit,
        Outcome::StopLossHit,
        Outcome::Target1Hit,
        Outcome::Target2Hit,
        Outcome::Target3Hit,
        Outcome::Profit,
        Outcome::Loss,
        Outcome::Breakeven,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::NoData => "NO_DATA",
            Outcome::NoHit => "NO_HIT",
            Outcome::StopLossHit => "STOP_LOSS_HIT",
            Outcome::Target1Hit => "TARGET_1_HIT",
            Outcome::Target2Hit => "TARGET_2_HIT",
            Outcome::Target3Hit => "TARGET_3_HIT",
            Outcome::Profit => "PROFIT",
            Outcome::Loss => "LOSS",
            Outcome::Breakeven => "BREAKEVEN",
        }
    }

    /// Outcome for the highest target reached (`index` is 0-based).
    pub fn for_target(index: usize) -> Option<Outcome> {
        match index {
            0 => Some(Outcome::Target1Hit),
            1 => Some(Outcome::Target2Hit),
            2 => Some(Outcome::Target3Hit),
            _ => None,
        }
    }

    /// Counted as a winning call in summaries.
    pub fn is_profitable(&self) -> bool {
        matches!(
            self,
            Outcome::Profit | Outcome::Target1Hit | Outcome::Target2Hit | Outcome::Target3Hit
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of walking one signal against its price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceResult {
    pub outcome: Outcome,
    /// Close at the stop-loss break, else the last close in the window.
    pub final_price: Option<f64>,
    /// Earliest date any level (stop or target) was touched.
    pub first_hit_date: Option<NaiveDate>,
    pub first_hit_price: Option<f64>,
    pub stop_loss_hit: bool,
    pub target_hits: [bool; MAX_TARGETS],
    pub highest_close: Option<f64>,
    pub lowest_close: Option<f64>,
    /// Points consumed, up to and including a stop-loss break.
    pub data_points: usize,
    /// Provenance of the series, filled in by the batch layer.
    #[serde(default)]
    pub data_source: Option<DataSource>,
}

impl PerformanceResult {
    /// Result for a signal with no usable price data.
    pub fn no_data() -> Self {
        Self {
            outcome: Outcome::NoData,
            final_price: None,
            first_hit_date: None,
            first_hit_price: None,
            stop_loss_hit: false,
            target_hits: [false; MAX_TARGETS],
            highest_close: None,
            lowest_close: None,
            data_points: 0,
            data_source: None,
        }
    }

    /// Whether target `index` (0-based) was reached.
    pub fn target_hit(&self, index: usize) -> bool {
        self.target_hits.get(index).copied().unwrap_or(false)
    }

    pub fn with_source(mut self, source: DataSource) -> Self {
        self.data_source = Some(source);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_labels_match_serde() {
        for outcome in Outcome::ALL {
            let json = serde_json::to_string(&outcome).unwrap();
            assert_eq!(json, format!("\"{}\"", outcome.as_str()));
        }
    }

    #[test]
    fn profitable_outcomes() {
        assert!(Outcome::Target2Hit.is_profitable());
        assert!(Outcome::Profit.is_profitable());
        assert!(!Outcome::StopLossHit.is_profitable());
        assert!(!Outcome::Breakeven.is_profitable());
        assert!(!Outcome::NoData.is_profitable());
    }

    #[test]
    fn no_data_has_no_flags() {
        let r = PerformanceResult::no_data();
        assert_eq!(r.outcome, Outcome::NoData);
        assert_eq!(r.data_points, 0);
        assert!(!r.stop_loss_hit);
        assert!((0..MAX_TARGETS).all(|i| !r.target_hit(i)));
        assert_eq!(r.final_price, None);
    }
}
