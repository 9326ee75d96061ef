//! Aggregate views over analyzed and evaluated signals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use calltrack_core::chat::DateRange;
use calltrack_core::domain::{AnalyzedSignal, DataSource, Outcome, PerformanceResult};

/// Key used in the time-frame distribution for open-ended signals.
pub const NO_TIME_FRAME: &str = "No Timeframe";

/// Share of `count` in `total`, as a percentage. Zero for an empty batch.
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Expiry-level statistics; needs no price data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisStatistics {
    pub total_signals: usize,
    pub expired_signals: usize,
    pub active_signals: usize,
    pub with_time_frame: usize,
    pub without_time_frame: usize,
    pub time_frame_distribution: BTreeMap<String, usize>,
    pub stock_distribution: BTreeMap<String, usize>,
    pub date_range: Option<DateRange>,
}

impl AnalysisStatistics {
    pub fn from_analyzed(analyzed: &[AnalyzedSignal]) -> Self {
        let mut time_frame_distribution = BTreeMap::new();
        let mut stock_distribution = BTreeMap::new();
        let mut with_time_frame = 0;

        for a in analyzed {
            let key = match a.signal.time_frame.as_deref() {
                Some(tf) => {
                    with_time_frame += 1;
                    tf.to_string()
                }
                None => NO_TIME_FRAME.to_string(),
            };
            *time_frame_distribution.entry(key).or_insert(0) += 1;
            *stock_distribution.entry(a.signal.stock.clone()).or_insert(0) += 1;
        }

        let expired_signals = analyzed.iter().filter(|a| a.is_expired).count();
        let date_range = analyzed
            .iter()
            .map(AnalyzedSignal::listing_date)
            .min()
            .zip(analyzed.iter().map(AnalyzedSignal::listing_date).max())
            .map(|(start, end)| DateRange { start, end });

        Self {
            total_signals: analyzed.len(),
            expired_signals,
            active_signals: analyzed.len() - expired_signals,
            with_time_frame,
            without_time_frame: analyzed.len() - with_time_frame,
            time_frame_distribution,
            stock_distribution,
            date_range,
        }
    }
}

/// Outcome-level summary of a batch evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_analyzed: usize,
    /// `PROFIT` or any `TARGET_*` outcome.
    pub profitable: usize,
    pub target_1_hits: usize,
    pub stop_loss_hits: usize,
    pub no_data: usize,
    /// Results computed on generated prices.
    pub synthetic: usize,
    pub outcome_distribution: BTreeMap<Outcome, usize>,
    pub profitable_pct: f64,
    pub target_1_pct: f64,
    pub stop_loss_pct: f64,
}

impl PerformanceSummary {
    pub fn from_results<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a PerformanceResult>,
    {
        let mut total = 0;
        let mut profitable = 0;
        let mut target_1_hits = 0;
        let mut stop_loss_hits = 0;
        let mut no_data = 0;
        let mut synthetic = 0;
        let mut outcome_distribution = BTreeMap::new();

        for r in results {
            total += 1;
            *outcome_distribution.entry(r.outcome).or_insert(0) += 1;
            if r.outcome.is_profitable() {
                profitable += 1;
            }
            if r.target_hit(0) {
                target_1_hits += 1;
            }
            if r.stop_loss_hit {
                stop_loss_hits += 1;
            }
            if r.outcome == Outcome::NoData {
                no_data += 1;
            }
            if r.data_source == Some(DataSource::Synthetic) {
                synthetic += 1;
            }
        }

        Self {
            total_analyzed: total,
            profitable,
            target_1_hits,
            stop_loss_hits,
            no_data,
            synthetic,
            outcome_distribution,
            profitable_pct: percentage(profitable, total),
            target_1_pct: percentage(target_1_hits, total),
            stop_loss_pct: percentage(stop_loss_hits, total),
        }
    }

    pub fn has_synthetic(&self) -> bool {
        self.synthetic > 0
    }
}
