//! Analysis pipeline — wires loading, expiry analysis, and batch evaluation.
//!
//! Two entry points:
//! - `analyze_file()`: loads signals and builds the price chain from config. Used by the CLI.
//! - `run_analysis()`: takes in-memory signals and an optional source. No file I/O.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use calltrack_core::data::{PriceError, PriceSource};
use calltrack_core::domain::{AnalyzedSignal, PerformanceResult, Signal};
use calltrack_core::Clock;

use crate::analysis::{analyze_signals, expired};
use crate::batch::{evaluate_all_parallel, BatchProgress};
use crate::config::{AnalyzerConfig, ConfigError};
use crate::loader::{load_signals, LoadError};
use crate::sources::build_source;
use crate::stats::{AnalysisStatistics, PerformanceSummary};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("load error: {0}")]
    Load(#[from] LoadError),
    #[error("price source error: {0}")]
    Source(#[from] PriceError),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// An expired signal together with its performance result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedSignal {
    #[serde(flatten)]
    pub analyzed: AnalyzedSignal,
    pub performance: PerformanceResult,
}

impl AsRef<Signal> for EvaluatedSignal {
    fn as_ref(&self) -> &Signal {
        &self.analyzed.signal
    }
}

/// Complete result of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Name of the input the signals came from.
    pub input: String,
    /// "Today" used for expiry.
    pub as_of: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub statistics: AnalysisStatistics,
    /// Every input signal, in input order.
    pub signals: Vec<AnalyzedSignal>,
    /// Expired signals with their results, in input order.
    pub evaluated: Vec<EvaluatedSignal>,
    /// `None` when price analysis was skipped.
    pub summary: Option<PerformanceSummary>,
}

impl AnalysisReport {
    pub fn has_synthetic(&self) -> bool {
        self.summary.as_ref().is_some_and(PerformanceSummary::has_synthetic)
    }

    pub fn price_analysis_ran(&self) -> bool {
        self.summary.is_some()
    }
}

/// Analyze in-memory signals.
///
/// Expiry is resolved for every signal; only expired ones are evaluated, and
/// only when a `source` is given.
pub fn run_analysis(
    signals: Vec<Signal>,
    input: &str,
    clock: &dyn Clock,
    source: Option<&dyn PriceSource>,
    workers: usize,
    progress: Option<&dyn BatchProgress>,
) -> Result<AnalysisReport, RunError> {
    let as_of = clock.today();
    let analyzed = analyze_signals(signals, clock);
    let statistics = AnalysisStatistics::from_analyzed(&analyzed);
    let candidates = expired(&analyzed);
    log::info!(
        "{} signals: {} expired, {} active",
        statistics.total_signals,
        statistics.expired_signals,
        statistics.active_signals
    );

    let (evaluated, summary) = match source {
        Some(source) if !candidates.is_empty() => {
            log::info!(
                "evaluating {} expired signals via {}",
                candidates.len(),
                source.name()
            );
            let results = evaluate_all_parallel(&candidates, source, workers, progress)?;
            let summary = PerformanceSummary::from_results(&results);
            let evaluated = candidates
                .into_iter()
                .zip(results)
                .map(|(analyzed, performance)| EvaluatedSignal {
                    analyzed,
                    performance,
                })
                .collect();
            (evaluated, Some(summary))
        }
        Some(_) => {
            log::info!("no expired signals to evaluate");
            (
                Vec::new(),
                Some(PerformanceSummary::from_results(
                    &Vec::<PerformanceResult>::new(),
                )),
            )
        }
        None => {
            log::info!(
                "skipping price analysis for {} expired signals",
                candidates.len()
            );
            (Vec::new(), None)
        }
    };

    Ok(AnalysisReport {
        schema_version: SCHEMA_VERSION,
        input: input.to_string(),
        as_of,
        generated_at: Utc::now(),
        statistics,
        signals: analyzed,
        evaluated,
        summary,
    })
}

/// Load `path`, build the configured price chain, and analyze.
pub fn analyze_file(
    path: &Path,
    config: &AnalyzerConfig,
    clock: &dyn Clock,
    progress: Option<&dyn BatchProgress>,
) -> Result<AnalysisReport, RunError> {
    config.validate()?;
    let signals = load_signals(path)?;
    let input = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    if !config.batch.price_analysis {
        return run_analysis(signals, &input, clock, None, config.batch.workers, progress);
    }

    let source = build_source(config, &signals)?;
    run_analysis(
        signals,
        &input,
        clock,
        Some(source.as_ref()),
        config.batch.workers,
        progress,
    )
}
