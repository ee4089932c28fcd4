//! # stocksync
//!
//! Incremental inventory synchronization between a read-only source ERP
//! database and a denormalized MySQL target, computing derived installment
//! prices on the fly.
//!
//! The application follows the **Hexagonal Architecture** (Ports and
//! Adapters): the pipeline driver talks to both databases exclusively
//! through port traits, so the live MySQL adapters and the developer-mode
//! SQLite fixtures are interchangeable.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ports;
pub mod report;
pub mod updater;

use clap::Parser;
use log::{error, info, warn};
use std::process;
use std::sync::Arc;
use std::time::Instant;

use crate::application::orchestrator::SyncPipeline;
use crate::application::runtime::{self, RuntimeContext};
use crate::config::{AppConfig, CliArgs};
use crate::domain::cancel::CancelToken;
use crate::domain::entities::SyncOutcome;
use crate::domain::errors::Result;
use crate::infrastructure::mysql::maintenance::MySqlMaintenance;
use crate::infrastructure::mysql::snapshot::MySqlTargetIndex;
use crate::infrastructure::mysql::source_reader::MySqlSourceReader;
use crate::infrastructure::mysql::writer::MySqlBulkWriter;
use crate::infrastructure::sqlite::adapters::{SqliteSource, SqliteTarget};
use crate::infrastructure::sqlite::fixtures;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const REPORT_DIR: &str = "reports";

fn main() {
    // 1. Parse Arguments
    let args = CliArgs::parse();

    // 2. Initialize Logging
    env_logger::Builder::from_default_env()
        .filter_level(if args.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    // 3. Load Config
    let mut config = if let Some(path) = &args.config {
        match AppConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load config: {}", e);
                process::exit(1);
            }
        }
    } else {
        AppConfig::default_from_cli(&args)
    };
    config.merge_cli(&args);
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        process::exit(1);
    }

    // 4. Update Check (never blocks the sync)
    match updater::run_update_flow(VERSION, &config.update) {
        Ok((true, Some(path), info)) => {
            info!("Update {} downloaded to {}", info.version, path)
        }
        Ok((true, None, info)) => {
            info!("Newer version {} available at {}", info.version, info.url)
        }
        Ok((false, _, _)) => {}
        Err(e) => warn!("Error while checking updates: {}", e),
    }

    println!("\nstocksync v{}\n", VERSION);

    // 5. Run the pipeline
    let started = Instant::now();
    let outcome = match run_sync(&config) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Synchronization failed: {}", e);
            process::exit(1);
        }
    };
    let elapsed = started.elapsed();

    // 6. Report
    report::print_summary(&outcome, elapsed);
    if let Err(e) = report::write_json_report(REPORT_DIR, &outcome, elapsed) {
        warn!("Could not write run report: {}", e);
    }
}

/// Wires the ports for the selected mode and runs one pipeline pass.
fn run_sync(config: &AppConfig) -> Result<SyncOutcome> {
    let cancel = CancelToken::new();

    if config.dev_mode {
        info!("Developer mode: using embedded fixture databases");
        let source = Arc::new(SqliteSource::new(fixtures::open_dev_source(
            fixtures::DEV_SOURCE_PATH,
        )?));
        let target = Arc::new(SqliteTarget::new(fixtures::open_dev_target(
            fixtures::DEV_TARGET_PATH,
        )?));
        let workers = runtime::worker_count(num_cpus::get());
        let pipeline = SyncPipeline::new(
            source,
            target.clone(),
            target.clone(),
            target,
            config.pricing,
            workers,
        );
        return pipeline.run(&cancel);
    }

    let runtime = RuntimeContext::init(config)?;
    let source = Arc::new(MySqlSourceReader::new(Arc::clone(&runtime.source_pool)));
    let index = Arc::new(MySqlTargetIndex::new(Arc::clone(&runtime.target_pool)));
    let writer = Arc::new(MySqlBulkWriter::new(Arc::clone(&runtime.target_pool)));
    let maintenance = Arc::new(MySqlMaintenance::new(Arc::clone(&runtime.target_pool)));

    let pipeline = SyncPipeline::new(
        source,
        index,
        writer,
        maintenance,
        config.pricing,
        runtime.workers,
    );
    pipeline.run(&cancel)
}
