//! Batch orchestrator — fetch each signal's window and run the evaluator.
//!
//! One result per input signal, in input order. A failed fetch becomes a
//! `NO_DATA` result for that signal only; the batch always completes.
//! Retries and rate limiting belong to the price source.

use rayon::prelude::*;

use calltrack_core::data::PriceSource;
use calltrack_core::domain::{AnalyzedSignal, Outcome, PerformanceResult};
use calltrack_core::evaluate;

use crate::pipeline::RunError;

/// Progress callbacks for a batch evaluation.
///
/// With a worker pool the callbacks arrive from several threads and
/// `on_complete` order follows completion, not input order.
pub trait BatchProgress: Send + Sync {
    /// Called before fetching prices for a signal.
    fn on_start(&self, stock: &str, index: usize, total: usize);

    /// Called once a signal's result is known.
    fn on_complete(&self, stock: &str, index: usize, total: usize, result: &PerformanceResult);

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, evaluated: usize, no_data: usize, total: usize);
}

/// Progress reporter that writes to the log.
pub struct LogProgress;

impl BatchProgress for LogProgress {
    fn on_start(&self, stock: &str, index: usize, total: usize) {
        log::info!("[{}/{}] evaluating {stock}", index + 1, total);
    }

    fn on_complete(&self, stock: &str, _index: usize, _total: usize, result: &PerformanceResult) {
        log::debug!(
            "{stock}: {} after {} points",
            result.outcome,
            result.data_points
        );
    }

    fn on_batch_complete(&self, evaluated: usize, no_data: usize, total: usize) {
        log::info!("batch complete: {evaluated}/{total} evaluated, {no_data} without data");
    }
}

/// Evaluate one signal over its `[listing_date, cutoff_date]` window.
///
/// Signals without a cutoff are open-ended and come back `NO_DATA` without
/// touching the source.
pub fn evaluate_one(analyzed: &AnalyzedSignal, source: &dyn PriceSource) -> PerformanceResult {
    let Some((start, cutoff)) = analyzed.window() else {
        log::debug!("{}: no time frame, skipping price fetch", analyzed.stock());
        return PerformanceResult::no_data();
    };

    match source.fetch(analyzed.stock(), start, cutoff) {
        Ok(series) => evaluate(&analyzed.signal, &series.points).with_source(series.source),
        Err(e) => {
            log::warn!(
                "{}: no price data for {start}..{cutoff}: {e}",
                analyzed.stock()
            );
            PerformanceResult::no_data()
        }
    }
}

fn run_one(
    index: usize,
    total: usize,
    analyzed: &AnalyzedSignal,
    source: &dyn PriceSource,
    progress: Option<&dyn BatchProgress>,
) -> PerformanceResult {
    if let Some(p) = progress {
        p.on_start(analyzed.stock(), index, total);
    }
    let result = evaluate_one(analyzed, source);
    if let Some(p) = progress {
        p.on_complete(analyzed.stock(), index, total, &result);
    }
    result
}

fn finish(results: &[PerformanceResult], progress: Option<&dyn BatchProgress>) {
    if let Some(p) = progress {
        let no_data = results
            .iter()
            .filter(|r| r.outcome == Outcome::NoData)
            .count();
        p.on_batch_complete(results.len() - no_data, no_data, results.len());
    }
}

/// Evaluate every signal sequentially.
pub fn evaluate_all(
    signals: &[AnalyzedSignal],
    source: &dyn PriceSource,
    progress: Option<&dyn BatchProgress>,
) -> Vec<PerformanceResult> {
    let total = signals.len();
    let results: Vec<PerformanceResult> = signals
        .iter()
        .enumerate()
        .map(|(i, s)| run_one(i, total, s, source, progress))
        .collect();
    finish(&results, progress);
    results
}

/// Evaluate every signal on a bounded pool of `workers` threads.
///
/// Output order equals input order. `workers <= 1` runs sequentially on the
/// calling thread.
pub fn evaluate_all_parallel(
    signals: &[AnalyzedSignal],
    source: &dyn PriceSource,
    workers: usize,
    progress: Option<&dyn BatchProgress>,
) -> Result<Vec<PerformanceResult>, RunError> {
    if workers <= 1 {
        return Ok(evaluate_all(signals, source, progress));
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()?;
    let total = signals.len();
    log::info!("evaluating {total} signals on {workers} workers");

    let results: Vec<PerformanceResult> = pool.install(|| {
        signals
            .par_iter()
            .enumerate()
            .map(|(i, s)| run_one(i, total, s, source, progress))
            .collect()
    });
    finish(&results, progress);
    Ok(results)
}
