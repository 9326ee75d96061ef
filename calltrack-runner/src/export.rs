//! Reporting and export — JSON, CSV, and Markdown artifact generation.
//!
//! - **CSV**: parsed signals, expiry analysis, and the performance report
//! - **JSON**: parsed signals, and the full analysis report with schema versioning
//! - **Markdown**: human-readable run report
//!
//! Persisted reports carry a `schema_version` field. Unknown versions are
//! rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

use calltrack_core::domain::{AnalyzedSignal, Outcome, Signal};

use crate::pipeline::{AnalysisReport, EvaluatedSignal, SCHEMA_VERSION};
use crate::stats::percentage;

/// File names inside an artifact directory.
pub const ANALYZED_CSV: &str = "analyzed_signals.csv";
pub const PERFORMANCE_CSV: &str = "performance_report.csv";
pub const REPORT_JSON: &str = "report.json";
pub const REPORT_MD: &str = "report.md";

fn opt_f64(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn opt_date(value: Option<NaiveDate>) -> String {
    value.map(|d| d.to_string()).unwrap_or_default()
}

fn signal_fields(s: &Signal) -> [String; 11] {
    let [t1, t2, t3] = s.targets;
    [
        s.listing_date.to_string(),
        s.sender.clone(),
        s.action.to_string(),
        s.stock.clone(),
        opt_f64(s.buy_price_primary),
        opt_f64(s.buy_price_secondary),
        opt_f64(s.stop_loss),
        opt_f64(t1),
        opt_f64(t2),
        opt_f64(t3),
        s.time_frame.clone().unwrap_or_default(),
    ]
}

fn finish_csv(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

// ─── Parsed signals ─────────────────────────────────────────────────

/// Parsed signals as CSV, in the column layout the loader reads back.
///
/// Columns: date, sender, action, stock, buy_price_1, buy_price_2, stop_loss,
/// target_1, target_2, target_3, time_frame, raw_message
pub fn export_signals_csv(signals: &[Signal]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for signal in signals {
        wtr.serialize(signal)
            .with_context(|| format!("failed to write signal for {}", signal.stock))?;
    }
    if signals.is_empty() {
        wtr.write_record([
            "date",
            "sender",
            "action",
            "stock",
            "buy_price_1",
            "buy_price_2",
            "stop_loss",
            "target_1",
            "target_2",
            "target_3",
            "time_frame",
            "raw_message",
        ])?;
    }
    finish_csv(wtr)
}

pub fn export_signals_json(signals: &[Signal]) -> Result<String> {
    serde_json::to_string_pretty(signals).context("failed to serialize signals to JSON")
}

// ─── Expiry analysis ────────────────────────────────────────────────

/// Columns: listing_date, sender, action, stock, buy_price_1, buy_price_2,
/// stop_loss, target_1..3, time_frame, cutoff_date, is_expired, days_expired,
/// raw_message
pub fn export_analysis_csv(analyzed: &[AnalyzedSignal]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "listing_date",
        "sender",
        "action",
        "stock",
        "buy_price_1",
        "buy_price_2",
        "stop_loss",
        "target_1",
        "target_2",
        "target_3",
        "time_frame",
        "cutoff_date",
        "is_expired",
        "days_expired",
        "raw_message",
    ])?;

    for a in analyzed {
        let mut row = signal_fields(&a.signal).to_vec();
        row.push(opt_date(a.cutoff_date));
        row.push(a.is_expired.to_string());
        row.push(a.days_expired.to_string());
        row.push(a.signal.raw_message.clone());
        wtr.write_record(&row)?;
    }
    finish_csv(wtr)
}

// ─── Performance report ─────────────────────────────────────────────

/// Columns: listing_date, sender, action, stock, buy_price_1, buy_price_2,
/// stop_loss, target_1..3, time_frame, cutoff_date, is_expired, days_expired,
/// current_price, target_1_hit..3_hit, stop_loss_hit, first_hit_date,
/// first_hit_price, outcome, data_points
pub fn export_performance_csv(evaluated: &[EvaluatedSignal]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "listing_date",
        "sender",
        "action",
        "stock",
        "buy_price_1",
        "buy_price_2",
        "stop_loss",
        "target_1",
        "target_2",
        "target_3",
        "time_frame",
        "cutoff_date",
        "is_expired",
        "days_expired",
        "current_price",
        "target_1_hit",
        "target_2_hit",
        "target_3_hit",
        "stop_loss_hit",
        "first_hit_date",
        "first_hit_price",
        "outcome",
        "data_points",
    ])?;

    for e in evaluated {
        let a = &e.analyzed;
        let p = &e.performance;
        let mut row = signal_fields(&a.signal).to_vec();
        row.push(opt_date(a.cutoff_date));
        row.push(a.is_expired.to_string());
        row.push(a.days_expired.to_string());
        row.push(opt_f64(p.final_price));
        row.extend(p.target_hits.iter().map(|hit| hit.to_string()));
        row.push(p.stop_loss_hit.to_string());
        row.push(opt_date(p.first_hit_date));
        row.push(opt_f64(p.first_hit_price));
        row.push(p.outcome.to_string());
        row.push(p.data_points.to_string());
        wtr.write_record(&row)?;
    }
    finish_csv(wtr)
}

// ─── JSON report ────────────────────────────────────────────────────

/// Serialize an `AnalysisReport` to pretty JSON.
pub fn export_json(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize AnalysisReport to JSON")
}

/// Deserialize an `AnalysisReport` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<AnalysisReport> {
    let report: AnalysisReport =
        serde_json::from_str(json).context("failed to deserialize AnalysisReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── Artifact directory ─────────────────────────────────────────────

/// Save a report's artifacts to `{output_dir}/{stem}_{timestamp}/`.
///
/// Writes analyzed_signals.csv, report.json and report.md, plus
/// performance_report.csv when price analysis ran. Returns the directory.
pub fn save_artifacts(report: &AnalysisReport, stem: &str, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!("{}_{}", stem, chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write_file(&run_dir.join(ANALYZED_CSV), &export_analysis_csv(&report.signals)?)?;
    if report.price_analysis_ran() {
        write_file(
            &run_dir.join(PERFORMANCE_CSV),
            &export_performance_csv(&report.evaluated)?,
        )?;
    }
    write_file(&run_dir.join(REPORT_JSON), &export_json(report)?)?;
    write_file(&run_dir.join(REPORT_MD), &generate_report(report))?;

    log::info!("artifacts saved to {}", run_dir.display());
    Ok(run_dir)
}

/// Load an `AnalysisReport` from an artifact directory's report.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<AnalysisReport> {
    let path = dir.join(REPORT_JSON);
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Markdown report ────────────────────────────────────────────────

/// Generate a Markdown report for an analysis run.
pub fn generate_report(report: &AnalysisReport) -> String {
    let mut md = String::with_capacity(2048);
    let stats = &report.statistics;

    md.push_str("# Signal Analysis Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Input | {} |\n", report.input));
    md.push_str(&format!("| As Of | {} |\n", report.as_of));
    md.push_str(&format!(
        "| Generated | {} |\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(range) = stats.date_range {
        md.push_str(&format!(
            "| Listing Dates | {} to {} |\n",
            range.start, range.end
        ));
    }
    if report.has_synthetic() {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    md.push_str("## Signals\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Total | {} |\n", stats.total_signals));
    md.push_str(&format!("| Expired | {} |\n", stats.expired_signals));
    md.push_str(&format!("| Active | {} |\n", stats.active_signals));
    md.push_str(&format!("| With Time Frame | {} |\n", stats.with_time_frame));
    md.push_str(&format!(
        "| Without Time Frame | {} |\n",
        stats.without_time_frame
    ));
    md.push('\n');

    match &report.summary {
        Some(summary) => {
            let total = summary.total_analyzed;
            md.push_str("## Performance Summary\n\n");
            md.push_str("| Metric | Value |\n");
            md.push_str("| --- | --- |\n");
            md.push_str(&format!("| Analyzed | {} |\n", total));
            md.push_str(&format!(
                "| Profitable | {} ({:.1}%) |\n",
                summary.profitable, summary.profitable_pct
            ));
            md.push_str(&format!(
                "| Target 1 Hit | {} ({:.1}%) |\n",
                summary.target_1_hits, summary.target_1_pct
            ));
            md.push_str(&format!(
                "| Stop Loss Hit | {} ({:.1}%) |\n",
                summary.stop_loss_hits, summary.stop_loss_pct
            ));
            md.push_str(&format!("| No Data | {} |\n", summary.no_data));
            if summary.synthetic > 0 {
                md.push_str(&format!("| Synthetic | {} |\n", summary.synthetic));
            }
            md.push('\n');

            if !summary.outcome_distribution.is_empty() {
                md.push_str("### Outcomes\n\n");
                md.push_str("| Outcome | Count | Share |\n");
                md.push_str("| --- | --- | --- |\n");
                for outcome in Outcome::ALL {
                    if let Some(&count) = summary.outcome_distribution.get(&outcome) {
                        md.push_str(&format!(
                            "| {} | {} | {:.1}% |\n",
                            outcome,
                            count,
                            percentage(count, total)
                        ));
                    }
                }
                md.push('\n');
            }

            if !report.evaluated.is_empty() {
                md.push_str("## Expired Signals\n\n");
                md.push_str("| Date | Stock | Action | Entry | Stop | Cutoff | Final | Outcome |\n");
                md.push_str("| --- | --- | --- | --- | --- | --- | --- | --- |\n");
                for e in &report.evaluated {
                    let s = &e.analyzed.signal;
                    md.push_str(&format!(
                        "| {} | {} | {} | {} | {} | {} | {} | {} |\n",
                        s.listing_date,
                        s.stock,
                        s.action,
                        opt_f64(s.buy_price_primary),
                        opt_f64(s.stop_loss),
                        opt_date(e.analyzed.cutoff_date),
                        opt_f64(e.performance.final_price),
                        e.performance.outcome
                    ));
                }
                md.push('\n');
            }
        }
        None => {
            md.push_str("## Performance Summary\n\n");
            md.push_str("Price analysis was not run.\n\n");
        }
    }

    if !stats.time_frame_distribution.is_empty() {
        md.push_str("## Time Frames\n\n");
        md.push_str("| Time Frame | Signals |\n");
        md.push_str("| --- | --- |\n");
        for (tf, count) in &stats.time_frame_distribution {
            md.push_str(&format!("| {} | {} |\n", tf, count));
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use calltrack_core::domain::{Action, PerformanceResult};
    use calltrack_core::expiry;
    use chrono::Utc;

    use crate::stats::{AnalysisStatistics, PerformanceSummary};

    // ─── Test helpers ────────────────────────────────────────────────

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample_signal() -> Signal {
        Signal {
            listing_date: d(2024, 1, 1),
            sender: "Ravi".into(),
            action: Action::Buy,
            stock: "TCS".into(),
            buy_price_primary: Some(100.0),
            buy_price_secondary: None,
            stop_loss: Some(90.0),
            targets: [Some(110.0), None, None],
            time_frame: Some("5-10 Days".into()),
            raw_message: "BUY TCS @ 100, quick one".into(),
        }
    }

    fn sample_report() -> AnalysisReport {
        let analyzed = expiry::analyze(sample_signal(), d(2024, 1, 20));
        let mut performance = PerformanceResult::no_data();
        performance.outcome = Outcome::Target1Hit;
        performance.target_hits = [true, false, false];
        performance.final_price = Some(115.0);
        performance.first_hit_date = Some(d(2024, 1, 4));
        performance.first_hit_price = Some(115.0);
        performance.data_points = 3;

        let summary = PerformanceSummary::from_results([&performance]);
        AnalysisReport {
            schema_version: SCHEMA_VERSION,
            input: "signals.json".into(),
            as_of: d(2024, 1, 20),
            generated_at: Utc::now(),
            statistics: AnalysisStatistics::from_analyzed(std::slice::from_ref(&analyzed)),
            signals: vec![analyzed.clone()],
            evaluated: vec![EvaluatedSignal {
                analyzed,
                performance,
            }],
            summary: Some(summary),
        }
    }

    // ─── CSV ─────────────────────────────────────────────────────────

    #[test]
    fn performance_csv_has_exact_columns() {
        let csv = export_performance_csv(&sample_report().evaluated).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "listing_date,sender,action,stock,buy_price_1,buy_price_2,stop_loss,\
target_1,target_2,target_3,time_frame,cutoff_date,is_expired,days_expired,current_price,\
target_1_hit,target_2_hit,target_3_hit,stop_loss_hit,first_hit_date,first_hit_price,outcome,data_points"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2024-01-01,Ravi,BUY,TCS,100,,90,110,,,5-10 Days,2024-01-11,true,9,115,\
true,false,false,false,2024-01-04,115,TARGET_1_HIT,3"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn analysis_csv_quotes_raw_message() {
        let report = sample_report();
        let csv = export_analysis_csv(&report.signals).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert!(row.starts_with("2024-01-01,Ravi,BUY,TCS,100,,90,110,,,5-10 Days,2024-01-11,true,9,"));
        assert!(row.ends_with("\"BUY TCS @ 100, quick one\""));
    }

    #[test]
    fn signals_csv_reads_back() {
        let csv = export_signals_csv(&[sample_signal()]).unwrap();
        assert!(csv.starts_with("date,sender,action,stock,buy_price_1,buy_price_2,stop_loss,"));
        let back = crate::loader::load_csv_str(&csv).unwrap();
        assert_eq!(back, vec![sample_signal()]);
    }

    #[test]
    fn empty_signals_csv_still_has_header() {
        let csv = export_signals_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.starts_with("date,"));
    }

    // ─── JSON ────────────────────────────────────────────────────────

    #[test]
    fn json_import_restores_report() {
        let report = sample_report();
        let json = export_json(&report).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(back.evaluated, report.evaluated);
        assert_eq!(back.signals, report.signals);
        assert_eq!(back.summary, report.summary);
    }

    #[test]
    fn json_rejects_future_schema() {
        let mut report = sample_report();
        report.schema_version = SCHEMA_VERSION + 1;
        let json = export_json(&report).unwrap();
        let err = import_json(&json).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }

    // ─── Artifacts & Markdown ────────────────────────────────────────

    #[test]
    fn save_and_load_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let report = sample_report();
        let run_dir = save_artifacts(&report, "signals", dir.path()).unwrap();

        assert!(run_dir
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("signals_"));
        for name in [ANALYZED_CSV, PERFORMANCE_CSV, REPORT_JSON, REPORT_MD] {
            assert!(run_dir.join(name).exists(), "{name} missing");
        }
        let loaded = load_artifacts(&run_dir).unwrap();
        assert_eq!(loaded.input, "signals.json");
    }

    #[test]
    fn skipped_price_analysis_writes_no_performance_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = sample_report();
        report.summary = None;
        report.evaluated.clear();
        let run_dir = save_artifacts(&report, "signals", dir.path()).unwrap();
        assert!(!run_dir.join(PERFORMANCE_CSV).exists());
        assert!(generate_report(&report).contains("Price analysis was not run."));
    }

    #[test]
    fn markdown_report_lists_outcomes() {
        let md = generate_report(&sample_report());
        assert!(md.starts_with("# Signal Analysis Report"));
        assert!(md.contains("| Profitable | 1 (100.0%) |"));
        assert!(md.contains("| TARGET_1_HIT | 1 | 100.0% |"));
        assert!(md.contains("| 5-10 Days | 1 |"));
        assert!(!md.contains("SYNTHETIC"));
    }
}
