//! Run summary output: the human-readable performance report on stdout and
//! a JSON report artifact for later inspection.

use std::time::Duration;

use log::info;
use serde_json::json;

use crate::domain::entities::SyncOutcome;
use crate::domain::errors::{Result, SyncError};

const RED_BOLD: &str = "\x1b[1;31m";
const GREEN_BOLD: &str = "\x1b[1;32m";
const YELLOW_BOLD: &str = "\x1b[1;33m";
const BLUE_BOLD: &str = "\x1b[1;34m";
const MAGENTA_BOLD: &str = "\x1b[1;35m";
const CYAN_BOLD: &str = "\x1b[1;36m";
const RESET: &str = "\x1b[0m";

/// Prints the performance report for a finished run.
pub fn print_summary(outcome: &SyncOutcome, elapsed: Duration) {
    let total_rows = outcome.inserted + outcome.updated + outcome.ignored;
    let seconds = elapsed.as_secs_f64();
    let rows_per_second = if seconds > 0.0 {
        total_rows as f64 / seconds
    } else {
        0.0
    };

    println!("\n{}", ".".repeat(40));
    println!("SYNCHRONIZATION PERFORMANCE REPORT");
    println!("{}", ".".repeat(40));

    println!("DATABASE CONFIGURATION:");
    println!(
        "  Target max_connections: {}{}{}",
        GREEN_BOLD, outcome.limits.max_connections, RESET
    );
    println!(
        "  Target max_allowed_packet: {}{} MB{}",
        GREEN_BOLD,
        outcome.limits.max_allowed_packet / (1024 * 1024),
        RESET
    );
    println!(
        "  Worker pool size: {}{} workers{}",
        GREEN_BOLD, outcome.workers, RESET
    );
    println!(
        "  Batch size: {}{} rows{}",
        GREEN_BOLD, outcome.batch_size, RESET
    );

    println!("\nPERFORMANCE METRICS:");
    println!(
        "  Data loading time: {}{:?}{}",
        CYAN_BOLD, outcome.stats.load_time, RESET
    );
    println!(
        "  Query execution time: {}{:?}{}",
        CYAN_BOLD, outcome.stats.query_time, RESET
    );
    println!(
        "  Processing time: {}{:?}{}",
        CYAN_BOLD, outcome.stats.processing_time, RESET
    );
    println!(
        "  Procedure time: {}{:?}{}",
        CYAN_BOLD, outcome.stats.procedure_time, RESET
    );
    println!("  Total elapsed time: {}{:?}{}", CYAN_BOLD, elapsed, RESET);
    println!(
        "  Throughput: {}{:.2} rows/second{}",
        MAGENTA_BOLD, rows_per_second, RESET
    );

    println!("\nRESULTS:");
    println!(
        "  Total rows processed: {}{}{}",
        GREEN_BOLD, total_rows, RESET
    );
    if outcome.stats.scan_skipped > 0 {
        println!(
            "  Rows skipped (unreadable): {}{}{}",
            RED_BOLD, outcome.stats.scan_skipped, RESET
        );
    }
    println!("  Rows inserted: {}{}{}", GREEN_BOLD, outcome.inserted, RESET);
    println!("  Rows updated: {}{}{}", YELLOW_BOLD, outcome.updated, RESET);
    println!("  Rows ignored: {}{}{}", BLUE_BOLD, outcome.ignored, RESET);

    println!("{}", "-".repeat(40));
    print_recommendations(outcome, total_rows);
    println!("{}", "-".repeat(40));
    println!("Synchronization completed in {:?}", elapsed);
}

fn print_recommendations(outcome: &SyncOutcome, total_rows: u64) {
    println!("PERFORMANCE RECOMMENDATIONS:");
    let mut findings = 0;

    if outcome.stats.load_time > Duration::from_secs(2) {
        println!(
            "{}  - Consider adding an index on the target inventory id{}",
            RED_BOLD, RESET
        );
        findings += 1;
    }
    if outcome.stats.processing_time > Duration::from_secs(5) {
        println!(
            "{}  - Consider raising the target max_connections{}",
            RED_BOLD, RESET
        );
        findings += 1;
    }
    if total_rows > 0 && outcome.updated as f64 / total_rows as f64 > 0.7 {
        println!(
            "{}  - High update rate; check for drift in the target data{}",
            RED_BOLD, RESET
        );
        findings += 1;
    }

    if findings == 0 {
        println!("{}  0 issues found{}", GREEN_BOLD, RESET);
    } else {
        println!("{}  {} issue(s) found{}", RED_BOLD, findings, RESET);
    }
}

/// Writes a JSON report with the run summary next to the logs.
pub fn write_json_report(dir: &str, outcome: &SyncOutcome, elapsed: Duration) -> Result<String> {
    let report = json!({
        "summary": {
            "inserted": outcome.inserted,
            "updated": outcome.updated,
            "ignored": outcome.ignored,
            "scan_skipped": outcome.stats.scan_skipped,
            "batch_size": outcome.batch_size,
            "workers": outcome.workers,
            "elapsed_seconds": elapsed.as_secs_f64(),
        },
        "server": outcome.limits,
        "stats": outcome.stats,
    });

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = format!("{}/report_{}.json", dir, timestamp);

    std::fs::create_dir_all(dir)?;
    let file = std::fs::File::create(&path)?;
    serde_json::to_writer_pretty(file, &report)
        .map_err(|e| SyncError::Report(e.to_string()))?;

    info!("Run report written to {}", path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{RunStats, ServerLimits};

    fn outcome() -> SyncOutcome {
        SyncOutcome {
            inserted: 107,
            updated: 3,
            ignored: 0,
            batch_size: 500,
            workers: 8,
            limits: ServerLimits::default(),
            stats: RunStats {
                total_rows: 110,
                ..RunStats::default()
            },
        }
    }

    #[test]
    fn json_report_lands_in_the_requested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = dir.path().to_str().unwrap();

        let path = write_json_report(dir_path, &outcome(), Duration::from_secs(3)).unwrap();
        assert!(path.contains("report_"));

        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed["summary"]["inserted"], 107);
        assert_eq!(parsed["summary"]["workers"], 8);
    }
}
