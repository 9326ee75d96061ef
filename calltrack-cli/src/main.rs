//! Calltrack CLI — parse, analyze, and cache inspection commands.
//!
//! Commands:
//! - `parse` — extract trading calls from a chat export to CSV and JSON
//! - `analyze` — resolve expiry and evaluate expired calls against prices
//! - `cache status` — report cached price windows per symbol

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use calltrack_core::chat::{ChatParser, SignalStatistics};
use calltrack_core::data::PriceCache;
use calltrack_core::domain::Signal;
use calltrack_core::{Clock, FixedClock, SystemClock};
use calltrack_runner::export::{export_signals_csv, export_signals_json};
use calltrack_runner::{
    analyze_file, save_artifacts, AnalysisReport, AnalysisStatistics, AnalyzerConfig,
    LogProgress, PerformanceSummary,
};

#[derive(Parser)]
#[command(
    name = "calltrack",
    about = "Calltrack CLI — trading-call expiry and performance tracking"
)]
struct Cli {
    /// Debug-level logging (RUST_LOG still takes precedence).
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract trading calls from a chat export.
    Parse {
        /// Chat export text file.
        input: PathBuf,

        /// CSV output path.
        #[arg(long, default_value = "trading_signals.csv")]
        output_csv: PathBuf,

        /// JSON output path.
        #[arg(long, default_value = "trading_signals.json")]
        output_json: PathBuf,
    },
    /// Analyze signal expiry and price performance.
    Analyze(AnalyzeArgs),
    /// Price cache commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(clap::Args)]
struct AnalyzeArgs {
    /// Signals file (.json or .csv).
    input: PathBuf,

    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip price analysis of expired signals.
    #[arg(long, default_value_t = false)]
    no_price_analysis: bool,

    /// Print signal statistics only; implies --no-price-analysis.
    #[arg(long, default_value_t = false)]
    statistics_only: bool,

    /// Offline mode: prices from the cache only.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Fall back to synthetic prices when no real data is available.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Worker threads for price analysis (1 = sequential).
    #[arg(long)]
    workers: Option<usize>,

    /// Evaluate expiry as of this date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    today: Option<String>,

    /// Cache directory.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Output directory for artifacts.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Alpha Vantage API key.
    #[arg(long)]
    api_key: Option<String>,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached windows, point counts, and date ranges.
    Status {
        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let outcome = match cli.command {
        Commands::Parse {
            input,
            output_csv,
            output_json,
        } => run_parse(&input, &output_csv, &output_json),
        Commands::Analyze(args) => run_analyze(args),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
        },
    };

    if let Err(e) = outcome {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

// ─── parse ──────────────────────────────────────────────────────────

fn run_parse(input: &Path, output_csv: &Path, output_json: &Path) -> Result<()> {
    let signals = ChatParser::new()
        .parse_file(input)
        .with_context(|| format!("failed to parse {}", input.display()))?;

    if signals.is_empty() {
        println!("No trading signals found!");
        return Ok(());
    }

    print_signal_statistics(&SignalStatistics::from_signals(&signals));
    print_first_signals(&signals, 5);

    std::fs::write(output_csv, export_signals_csv(&signals)?)
        .with_context(|| format!("failed to write {}", output_csv.display()))?;
    std::fs::write(output_json, export_signals_json(&signals)?)
        .with_context(|| format!("failed to write {}", output_json.display()))?;

    println!("Signals written to:");
    println!("  {}", output_csv.display());
    println!("  {}", output_json.display());
    Ok(())
}

fn print_signal_statistics(stats: &SignalStatistics) {
    println!();
    println!("=== Extracted Signals ===");
    println!("Total Signals:  {}", stats.total_signals);
    println!("Unique Stocks:  {}", stats.unique_stocks);
    if let Some(range) = stats.date_range {
        println!("Date Range:     {} to {}", range.start, range.end);
    }
    println!("Avg Buy Price:  {:.2}", stats.avg_buy_price);
    println!("Avg Stop Loss:  {:.2}", stats.avg_stop_loss);
    println!();
    println!("--- Actions ---");
    for (action, count) in &stats.actions {
        println!("  {action}: {count}");
    }
    println!();
    println!("--- Top Stocks ---");
    for (stock, count) in &stats.top_stocks {
        println!("  {stock}: {count} signals");
    }
}

fn print_first_signals(signals: &[Signal], n: usize) {
    let fmt = |v: Option<f64>| v.map(|p| p.to_string()).unwrap_or_else(|| "-".into());
    println!();
    println!("--- First {} signals ---", n.min(signals.len()));
    for s in signals.iter().take(n) {
        println!(
            "{} | {} {} @ {} | {} | SL: {} | T1: {} | T2: {} | T3: {}",
            s.listing_date,
            s.action,
            s.stock,
            fmt(s.buy_price_primary),
            fmt(s.buy_price_secondary),
            fmt(s.stop_loss),
            fmt(s.targets[0]),
            fmt(s.targets[1]),
            fmt(s.targets[2]),
        );
    }
    println!();
}

// ─── analyze ────────────────────────────────────────────────────────

fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let mut config = AnalyzerConfig::load(args.config.as_deref())?;
    apply_overrides(&mut config, &args);
    config.validate()?;
    log::debug!(
        "workers={} price_analysis={} offline={} synthetic={} cache_dir={}",
        config.batch.workers,
        config.batch.price_analysis,
        config.data.offline,
        config.data.synthetic,
        config.data.cache_dir.display()
    );

    let clock: Box<dyn Clock> = match args.today.as_deref() {
        Some(s) => Box::new(FixedClock(
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("invalid --today date '{s}' (expected YYYY-MM-DD)"))?,
        )),
        None => Box::new(SystemClock),
    };

    let report = analyze_file(&args.input, &config, clock.as_ref(), Some(&LogProgress))
        .with_context(|| format!("analysis of {} failed", args.input.display()))?;

    print_analysis_summary(&report.statistics);
    if args.statistics_only {
        print_statistics(&report.statistics);
    }
    match &report.summary {
        Some(summary) => print_performance_summary(summary),
        None if report.statistics.expired_signals > 0 => println!(
            "Skipped price analysis for {} expired signals.",
            report.statistics.expired_signals
        ),
        None => {}
    }

    let stem = args
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "signals".into());
    let run_dir = save_artifacts(&report, &stem, &config.output.output_dir)?;
    print_artifacts(&report, &run_dir);
    Ok(())
}

fn apply_overrides(config: &mut AnalyzerConfig, args: &AnalyzeArgs) {
    if args.no_price_analysis || args.statistics_only {
        config.batch.price_analysis = false;
    }
    if args.offline {
        config.data.offline = true;
    }
    if args.synthetic {
        config.data.synthetic = true;
    }
    if let Some(workers) = args.workers {
        config.batch.workers = workers;
    }
    if let Some(dir) = &args.cache_dir {
        config.data.cache_dir = dir.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output.output_dir = dir.clone();
    }
    if let Some(key) = &args.api_key {
        config.provider.alpha_vantage_api_key = Some(key.clone());
    }
}

fn print_analysis_summary(stats: &AnalysisStatistics) {
    println!();
    println!("=== Signal Analysis ===");
    println!("Total Signals:  {}", stats.total_signals);
    println!("Expired:        {}", stats.expired_signals);
    println!("Active:         {}", stats.active_signals);
    println!();
}

fn print_statistics(stats: &AnalysisStatistics) {
    println!("=== Signal Statistics ===");
    println!("With Time Frame:    {}", stats.with_time_frame);
    println!("Without Time Frame: {}", stats.without_time_frame);
    if let Some(range) = stats.date_range {
        println!("Date Range:         {} to {}", range.start, range.end);
    }
    println!();
    println!("--- Time Frames ---");
    for (tf, count) in &stats.time_frame_distribution {
        println!("  {tf}: {count}");
    }
    println!();
    println!("--- Stocks ---");
    for (stock, count) in &stats.stock_distribution {
        println!("  {stock}: {count}");
    }
    println!();
}

fn print_performance_summary(summary: &PerformanceSummary) {
    println!("=== Performance Summary ===");
    println!("Analyzed:       {}", summary.total_analyzed);
    println!(
        "Profitable:     {} ({:.1}%)",
        summary.profitable, summary.profitable_pct
    );
    println!(
        "Target 1 Hit:   {} ({:.1}%)",
        summary.target_1_hits, summary.target_1_pct
    );
    println!(
        "Stop Loss Hit:  {} ({:.1}%)",
        summary.stop_loss_hits, summary.stop_loss_pct
    );
    println!("No Data:        {}", summary.no_data);
    println!();
    println!("--- Outcomes ---");
    for (outcome, count) in &summary.outcome_distribution {
        println!("  {outcome}: {count}");
    }
    if summary.has_synthetic() {
        println!();
        println!(
            "WARNING: {} result(s) based on SYNTHETIC data",
            summary.synthetic
        );
    }
    println!();
}

fn print_artifacts(report: &AnalysisReport, run_dir: &Path) {
    println!("Artifacts saved to: {}", run_dir.display());
    println!("  - analyzed_signals.csv (signal analysis)");
    if report.price_analysis_ran() {
        println!("  - performance_report.csv (price analysis)");
    }
    println!("  - report.json, report.md");
}

// ─── cache status ───────────────────────────────────────────────────

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let statuses = PriceCache::new(cache_dir)
        .status()
        .with_context(|| format!("failed to read cache {}", cache_dir.display()))?;

    println!("Cache: {}", cache_dir.display());
    println!();
    println!(
        "{:<14} {:>8} {:>8} {:<26} {:>11}",
        "Symbol", "Windows", "Points", "Date Range", "Quarantined"
    );
    println!("{}", "-".repeat(71));

    let mut total_windows = 0;
    for status in &statuses {
        total_windows += status.windows.len();
        let range = match (status.earliest(), status.latest()) {
            (Some(start), Some(end)) => format!("{start} to {end}"),
            _ => "-".into(),
        };
        println!(
            "{:<14} {:>8} {:>8} {:<26} {:>11}",
            status.symbol,
            status.windows.len(),
            status.total_points(),
            range,
            status.quarantined
        );
    }

    println!();
    println!("{} symbol(s), {} cached window(s)", statuses.len(), total_windows);
    Ok(())
}
