//! # Domain Entities
//!
//! The "Nouns" of the synchronizer: source rows, target snapshots, write
//! payloads, and the run accounting surfaced to the final report.

use serde::Serialize;
use std::time::Duration;

/// One active row from the joined source projection. Immutable within a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub id: i64,
    pub description: String,
    pub quantity: f64,
    pub cost: Option<f64>,
    pub usd_value: Option<f64>,
}

/// Point-in-time view of one target row, keyed externally by its id.
///
/// Field-level nulls are preserved: the classifier treats a null on the
/// target side as "differs" so that partial legacy rows converge on re-sync.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetRecord {
    pub description: Option<String>,
    pub quantity: Option<f64>,
    pub cost: Option<f64>,
    pub usd_value: Option<f64>,
    pub sell_price: Option<f64>,
    pub price_3x: Option<f64>,
    pub price_6x: Option<f64>,
    pub price_10x: Option<f64>,
}

/// Fully computed write payload. Inserts and updates share the same shape;
/// all decimal fields are already normalized to two decimals.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryRecord {
    pub id: i64,
    pub description: String,
    pub quantity: f64,
    pub cost: f64,
    pub usd_value: f64,
    pub sell_price: f64,
    pub price_3x: f64,
    pub price_6x: f64,
    pub price_10x: f64,
}

/// The classifier's verdict for one source row.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOperation {
    Insert(InventoryRecord),
    Update(InventoryRecord),
    Ignore,
}

/// Per-phase timings plus row accounting for the final report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub load_time: Duration,
    pub query_time: Duration,
    pub processing_time: Duration,
    pub procedure_time: Duration,
    pub total_rows: u64,
    pub scan_skipped: u64,
}

/// Server-declared limits probed from the target before the write phase.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ServerLimits {
    pub max_connections: u32,
    pub max_allowed_packet: u64,
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            max_connections: 200,
            max_allowed_packet: 4 * 1024 * 1024,
        }
    }
}

/// Everything the pipeline driver hands back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub inserted: u64,
    pub updated: u64,
    pub ignored: u64,
    pub batch_size: usize,
    pub workers: usize,
    pub limits: ServerLimits,
    pub stats: RunStats,
}

/// Summary returned by the source streaming port.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceStreamSummary {
    /// Rows decoded and handed to the pipeline.
    pub delivered: u64,
    /// Rows that failed to decode and were skipped.
    pub skipped: u64,
    /// Time spent executing the projection query before the first row.
    pub query_time: Duration,
}
