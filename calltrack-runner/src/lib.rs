//! Calltrack Runner — signal loading, expiry analysis, batch evaluation, reports.
//!
//! This crate builds on `calltrack-core` to provide:
//! - TOML configuration with defaults
//! - Signal loading from JSON or CSV
//! - Expiry analysis against an injected clock
//! - Batch evaluation, sequential or on a bounded worker pool
//! - Price source assembly (network chain, cache, offline, synthetic opt-in)
//! - Statistics and CSV/JSON/Markdown export

pub mod analysis;
pub mod batch;
pub mod config;
pub mod export;
pub mod loader;
pub mod pipeline;
pub mod sources;
pub mod stats;

pub use analysis::{active, analyze_signals, expired};
pub use batch::{evaluate_all, evaluate_all_parallel, evaluate_one, BatchProgress, LogProgress};
pub use config::{AnalyzerConfig, ConfigError};
pub use export::{load_artifacts, save_artifacts};
pub use loader::{load_signals, LoadError};
pub use pipeline::{analyze_file, run_analysis, AnalysisReport, EvaluatedSignal, RunError};
pub use sources::build_source;
pub use stats::{AnalysisStatistics, PerformanceSummary};
