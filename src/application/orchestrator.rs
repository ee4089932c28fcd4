// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Pipeline Driver
//!
//! The driver owns the whole reconciliation run. It talks to the outside
//! world through four ports:
//! - `SourcePort`: to stream the joined source projection.
//! - `TargetIndexPort`: to snapshot the target table once, up front.
//! - `BulkWritePort`: to flush classified batches.
//! - `MaintenancePort`: to probe server limits, toggle session tunings, and
//!   invoke the post-processing routines.
//!
//! One producer classifies rows against the snapshot and feeds a bounded
//! queue; a fixed pool of workers drains it, each batching inserts and
//! updates locally and flushing when a buffer fills. No transaction spans
//! the run: correctness over partial failure comes from idempotence, since
//! a re-run reclassifies every already-written row as `Ignore`.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::{bounded, Receiver};
use log::{error, info, warn};

use crate::domain::cancel::CancelToken;
use crate::domain::classifier::classify;
use crate::domain::counters::SyncCounters;
use crate::domain::entities::{
    InventoryRecord, RunStats, ServerLimits, SyncOperation, SyncOutcome,
};
use crate::domain::errors::{BatchKind, Result, SyncError};
use crate::domain::pricing::PricingConfig;
use crate::ports::maintenance_port::MaintenancePort;
use crate::ports::snapshot_port::TargetIndexPort;
use crate::ports::source_port::SourcePort;
use crate::ports::writer_port::BulkWritePort;

/// Post-processing routines invoked, in order, after the write phase.
pub const POST_PROCESSING_ROUTINES: [&str; 2] = ["RefreshVirtualQuantity", "RefreshPartNumbers"];

/// Rough bytes-per-row estimate used to derive the batch budget.
const ASSUMED_ROW_BYTES: u64 = 200;

/// Derives the per-batch row budget from the server's packet limit.
pub fn max_batch_for_packet(packet_bytes: u64) -> usize {
    ((packet_bytes / ASSUMED_ROW_BYTES) as usize).clamp(100, 5000)
}

pub struct SyncPipeline {
    source: Arc<dyn SourcePort>,
    index: Arc<dyn TargetIndexPort>,
    writer: Arc<dyn BulkWritePort>,
    maintenance: Arc<dyn MaintenancePort>,
    pricing: PricingConfig,
    workers: usize,
}

impl SyncPipeline {
    pub fn new(
        source: Arc<dyn SourcePort>,
        index: Arc<dyn TargetIndexPort>,
        writer: Arc<dyn BulkWritePort>,
        maintenance: Arc<dyn MaintenancePort>,
        pricing: PricingConfig,
        workers: usize,
    ) -> Self {
        Self {
            source,
            index,
            writer,
            maintenance,
            pricing,
            workers: workers.max(1),
        }
    }

    /// Runs one full synchronization pass.
    pub fn run(&self, cancel: &CancelToken) -> Result<SyncOutcome> {
        let mut stats = RunStats::default();

        // --- STEP 1: SERVER LIMITS ---
        let limits = match self.maintenance.server_limits() {
            Ok(limits) => limits,
            Err(e) => {
                warn!("Server limit probe failed, using defaults: {}", e);
                ServerLimits::default()
            }
        };
        let max_batch = max_batch_for_packet(limits.max_allowed_packet);
        info!(
            "Starting sync: workers={} batch_size={} max_connections={} max_allowed_packet={}",
            self.workers, max_batch, limits.max_connections, limits.max_allowed_packet
        );

        // --- STEP 2: WRITE PHASE ---
        // Integrity checks are relaxed for the duration and restored even
        // when the phase fails.
        self.maintenance.set_bulk_load_mode(true)?;
        let phase = self.run_write_phase(cancel, max_batch, &mut stats);
        if let Err(e) = self.maintenance.set_bulk_load_mode(false) {
            warn!("Could not restore session tunings: {}", e);
        }
        let (inserted, updated, ignored) = phase?;

        // --- STEP 3: POST-PROCESSING ---
        for name in POST_PROCESSING_ROUTINES {
            let started = Instant::now();
            self.maintenance.run_routine(name)?;
            stats.procedure_time += started.elapsed();
        }

        info!(
            "Sync finished: inserted={} updated={} ignored={}",
            inserted, updated, ignored
        );

        Ok(SyncOutcome {
            inserted,
            updated,
            ignored,
            batch_size: max_batch,
            workers: self.workers,
            limits,
            stats,
        })
    }

    fn run_write_phase(
        &self,
        cancel: &CancelToken,
        max_batch: usize,
        stats: &mut RunStats,
    ) -> Result<(u64, u64, u64)> {
        // Snapshot the target before any write so every classification sees
        // the same point-in-time view.
        let load_start = Instant::now();
        let index = self.index.snapshot()?;
        stats.load_time = load_start.elapsed();
        info!("Target records loaded: {}", index.len());

        let counters = Arc::new(SyncCounters::new());
        let (tx, rx) = bounded::<SyncOperation>(max_batch * 2);

        let processing_start = Instant::now();
        let mut handles = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            let rx = rx.clone();
            let writer = Arc::clone(&self.writer);
            let counters = Arc::clone(&counters);
            let cancel = cancel.clone();
            handles.push(thread::spawn(move || {
                worker_loop(worker_id, rx, writer.as_ref(), &counters, &cancel, max_batch)
            }));
        }
        drop(rx);

        // Feed the queue from the source stream. The bounded channel blocks
        // this producer whenever the workers fall behind.
        let stream_result = self.source.stream_active_rows(cancel, &mut |row| {
            let op = classify(&row, &index, &self.pricing);
            tx.send(op).map_err(|_| SyncError::Cancelled)?;
            Ok(())
        });
        drop(tx);

        // A failing worker cancels its siblings, so the joined errors mix
        // the root cause with secondary `Cancelled` results; keep the root
        // cause.
        let mut worker_error: Option<SyncError> = None;
        for handle in handles {
            let outcome = match handle.join() {
                Ok(outcome) => outcome,
                Err(_) => Err(SyncError::Database("worker thread panicked".to_string())),
            };
            if let Err(e) = outcome {
                let replace = match (&worker_error, &e) {
                    (None, _) => true,
                    (Some(SyncError::Cancelled), e) if !matches!(e, SyncError::Cancelled) => true,
                    _ => false,
                };
                if replace {
                    worker_error = Some(e);
                }
            }
        }
        stats.processing_time = processing_start.elapsed();

        // A worker failure explains any producer-side send error, so it
        // takes precedence.
        if let Some(e) = worker_error {
            return Err(e);
        }
        let summary = stream_result?;
        stats.query_time = summary.query_time;
        stats.total_rows = summary.delivered;
        stats.scan_skipped = summary.skipped;

        Ok((counters.inserted(), counters.updated(), counters.ignored()))
    }
}

/// One worker: drains the queue into two local buffers and flushes each
/// buffer when it fills. On cancellation the in-flight buffers are dropped;
/// on channel close they are flushed.
fn worker_loop(
    worker_id: usize,
    rx: Receiver<SyncOperation>,
    writer: &dyn BulkWritePort,
    counters: &SyncCounters,
    cancel: &CancelToken,
    initial_batch: usize,
) -> Result<()> {
    let result = worker_run(rx, writer, counters, cancel, initial_batch);
    if let Err(ref e) = result {
        // Fail fast: stop the producer and let the other workers drain.
        cancel.cancel();
        error!("Worker {} aborting: {}", worker_id, e);
    }
    result
}

fn worker_run(
    rx: Receiver<SyncOperation>,
    writer: &dyn BulkWritePort,
    counters: &SyncCounters,
    cancel: &CancelToken,
    initial_batch: usize,
) -> Result<()> {
    let mut max_batch = initial_batch;
    let mut inserts: Vec<InventoryRecord> = Vec::with_capacity(initial_batch);
    let mut updates: Vec<InventoryRecord> = Vec::with_capacity(initial_batch);

    for op in rx.iter() {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        match op {
            SyncOperation::Insert(record) => {
                inserts.push(record);
                if inserts.len() >= max_batch {
                    flush(writer, BatchKind::Insert, &mut inserts, &mut max_batch, counters)?;
                }
            }
            SyncOperation::Update(record) => {
                updates.push(record);
                if updates.len() >= max_batch {
                    flush(writer, BatchKind::Update, &mut updates, &mut max_batch, counters)?;
                }
            }
            SyncOperation::Ignore => counters.add_ignored(1),
        }
    }

    // Channel closed: flush what is left.
    flush(writer, BatchKind::Insert, &mut inserts, &mut max_batch, counters)?;
    flush(writer, BatchKind::Update, &mut updates, &mut max_batch, counters)?;
    Ok(())
}

/// Flushes one buffer. A `PacketTooLarge` halves the batch budget and
/// retries once in smaller slices; a second packet failure is fatal.
fn flush(
    writer: &dyn BulkWritePort,
    kind: BatchKind,
    batch: &mut Vec<InventoryRecord>,
    max_batch: &mut usize,
    counters: &SyncCounters,
) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }
    match write_slice(writer, kind, batch) {
        Ok(()) => {
            credit(counters, kind, batch.len());
            batch.clear();
            Ok(())
        }
        Err(SyncError::PacketTooLarge { .. }) => {
            *max_batch = (*max_batch / 2).max(1);
            warn!(
                "{} batch exceeded the server packet limit; retrying in slices of {}",
                kind, max_batch
            );
            for slice in batch.chunks(*max_batch) {
                match write_slice(writer, kind, slice) {
                    Ok(()) => credit(counters, kind, slice.len()),
                    Err(SyncError::PacketTooLarge { count, .. }) => {
                        return Err(SyncError::Write {
                            kind,
                            count,
                            reason: "packet limit still exceeded after halving the batch"
                                .to_string(),
                        });
                    }
                    Err(e) => return Err(e),
                }
            }
            batch.clear();
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn write_slice(writer: &dyn BulkWritePort, kind: BatchKind, records: &[InventoryRecord]) -> Result<()> {
    match kind {
        BatchKind::Insert => writer.bulk_insert(records),
        BatchKind::Update => writer.bulk_update(records),
    }
}

fn credit(counters: &SyncCounters, kind: BatchKind, count: usize) {
    match kind {
        BatchKind::Insert => counters.add_inserted(count as u64),
        BatchKind::Update => counters.add_updated(count as u64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{SourceRow, SourceStreamSummary, TargetRecord};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct MockSource {
        rows: Vec<SourceRow>,
        skipped: u64,
    }

    impl MockSource {
        fn new(rows: Vec<SourceRow>) -> Self {
            Self { rows, skipped: 0 }
        }
    }

    impl SourcePort for MockSource {
        fn stream_active_rows(
            &self,
            cancel: &CancelToken,
            sink: &mut dyn FnMut(SourceRow) -> crate::domain::errors::Result<()>,
        ) -> crate::domain::errors::Result<SourceStreamSummary> {
            let mut delivered = 0;
            for row in &self.rows {
                if cancel.is_cancelled() {
                    return Err(SyncError::Cancelled);
                }
                sink(row.clone())?;
                delivered += 1;
            }
            Ok(SourceStreamSummary {
                delivered,
                skipped: self.skipped,
                query_time: Duration::from_millis(1),
            })
        }
    }

    /// In-memory target: snapshots and writes share one map, so a second
    /// run observes the first run's writes.
    #[derive(Default)]
    struct MemoryTarget {
        rows: Mutex<HashMap<i64, TargetRecord>>,
        insert_batches: Mutex<Vec<usize>>,
        update_batches: Mutex<Vec<usize>>,
        insert_packet_failures: AtomicUsize,
        fail_updates: bool,
        routines: Mutex<Vec<String>>,
        bulk_mode: Mutex<Vec<bool>>,
        limits: ServerLimits,
    }

    fn written(record: &InventoryRecord) -> TargetRecord {
        TargetRecord {
            description: Some(record.description.clone()),
            quantity: Some(record.quantity),
            cost: Some(record.cost),
            usd_value: Some(record.usd_value),
            sell_price: Some(record.sell_price),
            price_3x: Some(record.price_3x),
            price_6x: Some(record.price_6x),
            price_10x: Some(record.price_10x),
        }
    }

    impl TargetIndexPort for MemoryTarget {
        fn snapshot(&self) -> crate::domain::errors::Result<HashMap<i64, TargetRecord>> {
            Ok(self.rows.lock().unwrap().clone())
        }
    }

    impl BulkWritePort for MemoryTarget {
        fn bulk_insert(&self, records: &[InventoryRecord]) -> crate::domain::errors::Result<()> {
            if self.insert_packet_failures.load(Ordering::SeqCst) > 0 {
                self.insert_packet_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(SyncError::PacketTooLarge {
                    kind: BatchKind::Insert,
                    count: records.len(),
                });
            }
            let mut rows = self.rows.lock().unwrap();
            for record in records {
                rows.insert(record.id, written(record));
            }
            self.insert_batches.lock().unwrap().push(records.len());
            Ok(())
        }

        fn bulk_update(&self, records: &[InventoryRecord]) -> crate::domain::errors::Result<()> {
            if self.fail_updates {
                return Err(SyncError::Write {
                    kind: BatchKind::Update,
                    count: records.len(),
                    reason: "simulated failure".to_string(),
                });
            }
            let mut rows = self.rows.lock().unwrap();
            for record in records {
                rows.insert(record.id, written(record));
            }
            self.update_batches.lock().unwrap().push(records.len());
            Ok(())
        }
    }

    impl MaintenancePort for MemoryTarget {
        fn server_limits(&self) -> crate::domain::errors::Result<ServerLimits> {
            Ok(self.limits)
        }

        fn set_bulk_load_mode(&self, enabled: bool) -> crate::domain::errors::Result<()> {
            self.bulk_mode.lock().unwrap().push(enabled);
            Ok(())
        }

        fn run_routine(&self, name: &str) -> crate::domain::errors::Result<()> {
            self.routines.lock().unwrap().push(name.to_string());
            Ok(())
        }
    }

    fn target_with_limits(packet: u64) -> Arc<MemoryTarget> {
        Arc::new(MemoryTarget {
            limits: ServerLimits {
                max_allowed_packet: packet,
                ..ServerLimits::default()
            },
            ..MemoryTarget::default()
        })
    }

    fn pipeline(source: MockSource, target: Arc<MemoryTarget>, workers: usize) -> SyncPipeline {
        SyncPipeline::new(
            Arc::new(source),
            target.clone(),
            target.clone(),
            target,
            PricingConfig::default(),
            workers,
        )
    }

    fn row(id: i64, description: &str, quantity: f64, cost: f64, usd: f64) -> SourceRow {
        SourceRow {
            id,
            description: description.to_string(),
            quantity,
            cost: Some(cost),
            usd_value: Some(usd),
        }
    }

    #[test]
    fn pure_insert_writes_derived_prices() {
        let target = target_with_limits(100_000);
        let source = MockSource::new(vec![row(1, "A", 50.0, 100.0, 18.50)]);
        let outcome = pipeline(source, target.clone(), 2)
            .run(&CancelToken::new())
            .unwrap();

        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.updated, 0);
        assert_eq!(outcome.ignored, 0);
        assert_eq!(outcome.stats.total_rows, 1);

        let rows = target.rows.lock().unwrap();
        let stored = rows.get(&1).expect("row written");
        assert_eq!(stored.cost, Some(100.00));
        assert_eq!(stored.usd_value, Some(18.50));
        assert_eq!(stored.sell_price, Some(140.00));
        assert_eq!(stored.price_3x, Some(49.00));
        assert_eq!(stored.price_6x, Some(25.67));
        assert_eq!(stored.price_10x, Some(16.10));
    }

    #[test]
    fn replay_classifies_everything_as_ignore() {
        let target = target_with_limits(100_000);
        let pipeline_first = pipeline(
            MockSource::new(vec![row(1, "A", 50.0, 100.0, 18.50)]),
            target.clone(),
            2,
        );
        pipeline_first.run(&CancelToken::new()).unwrap();

        let second = pipeline(
            MockSource::new(vec![row(1, "A", 50.0, 100.0, 18.50)]),
            target,
            2,
        )
        .run(&CancelToken::new())
        .unwrap();

        assert_eq!(second.inserted, 0);
        assert_eq!(second.updated, 0);
        assert_eq!(second.ignored, 1);
    }

    #[test]
    fn quantity_change_updates_in_place() {
        let target = target_with_limits(100_000);
        pipeline(
            MockSource::new(vec![row(1, "A", 50.0, 100.0, 18.50)]),
            target.clone(),
            2,
        )
        .run(&CancelToken::new())
        .unwrap();

        let outcome = pipeline(
            MockSource::new(vec![row(1, "A", 49.0, 100.0, 18.50)]),
            target.clone(),
            2,
        )
        .run(&CancelToken::new())
        .unwrap();

        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.inserted, 0);
        let rows = target.rows.lock().unwrap();
        assert_eq!(rows.get(&1).unwrap().quantity, Some(49.0));
        assert_eq!(rows.get(&1).unwrap().sell_price, Some(140.00));
    }

    #[test]
    fn zero_cost_insert_writes_zero_prices() {
        let target = target_with_limits(100_000);
        let outcome = pipeline(
            MockSource::new(vec![row(2, "B", 10.0, 0.0, 0.0)]),
            target.clone(),
            2,
        )
        .run(&CancelToken::new())
        .unwrap();

        assert_eq!(outcome.inserted, 1);
        let rows = target.rows.lock().unwrap();
        let stored = rows.get(&2).unwrap();
        assert_eq!(stored.sell_price, Some(0.0));
        assert_eq!(stored.price_3x, Some(0.0));
        assert_eq!(stored.price_6x, Some(0.0));
        assert_eq!(stored.price_10x, Some(0.0));
    }

    #[test]
    fn mixed_batch_counts_add_up() {
        let target = target_with_limits(100_000);
        {
            // Three ids already present, each with a stale cost.
            let mut rows = target.rows.lock().unwrap();
            for id in 1..=3 {
                rows.insert(
                    id,
                    TargetRecord {
                        description: Some(format!("item {}", id)),
                        quantity: Some(5.0),
                        cost: Some(999.0),
                        ..TargetRecord::default()
                    },
                );
            }
        }

        let source_rows: Vec<SourceRow> = (1..=110)
            .map(|id| row(id, &format!("item {}", id), 5.0, 50.0, 10.0))
            .collect();
        let outcome = pipeline(MockSource::new(source_rows), target, 4)
            .run(&CancelToken::new())
            .unwrap();

        assert_eq!(outcome.inserted, 107);
        assert_eq!(outcome.updated, 3);
        assert_eq!(outcome.ignored, 0);
        assert_eq!(
            outcome.inserted + outcome.updated + outcome.ignored,
            outcome.stats.total_rows
        );
    }

    #[test]
    fn inserted_ids_never_collide_with_the_snapshot() {
        let target = target_with_limits(100_000);
        {
            let mut rows = target.rows.lock().unwrap();
            rows.insert(
                7,
                TargetRecord {
                    description: Some("kept".to_string()),
                    quantity: Some(1.0),
                    ..TargetRecord::default()
                },
            );
        }
        let source_rows = vec![row(7, "kept", 1.0, 10.0, 1.0), row(8, "new", 1.0, 10.0, 1.0)];
        let outcome = pipeline(MockSource::new(source_rows), target.clone(), 2)
            .run(&CancelToken::new())
            .unwrap();

        // id 7 went through the update path, never the insert path.
        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.updated, 1);
        let batches = target.insert_batches.lock().unwrap();
        assert_eq!(batches.iter().sum::<usize>(), 1);
    }

    #[test]
    fn zero_source_rows_still_runs_post_processing() {
        let target = target_with_limits(100_000);
        let outcome = pipeline(MockSource::new(vec![]), target.clone(), 2)
            .run(&CancelToken::new())
            .unwrap();

        assert_eq!(outcome.inserted, 0);
        assert_eq!(outcome.updated, 0);
        assert_eq!(outcome.ignored, 0);
        assert_eq!(outcome.stats.total_rows, 0);
        assert_eq!(
            *target.routines.lock().unwrap(),
            vec!["RefreshVirtualQuantity", "RefreshPartNumbers"]
        );
        assert_eq!(*target.bulk_mode.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn batch_boundary_flushes_exactly_once() {
        // packet 20_000 / 200 bytes per row = budget of 100 rows.
        let target = target_with_limits(20_000);
        let source_rows: Vec<SourceRow> = (1..=100)
            .map(|id| row(id, &format!("item {}", id), 1.0, 10.0, 1.0))
            .collect();

        let outcome = pipeline(MockSource::new(source_rows), target.clone(), 1)
            .run(&CancelToken::new())
            .unwrap();

        assert_eq!(outcome.batch_size, 100);
        assert_eq!(outcome.inserted, 100);
        assert_eq!(*target.insert_batches.lock().unwrap(), vec![100]);
    }

    #[test]
    fn packet_too_large_halves_and_retries_once() {
        let target = target_with_limits(100_000);
        target.insert_packet_failures.store(1, Ordering::SeqCst);

        let source_rows: Vec<SourceRow> = (1..=10)
            .map(|id| row(id, &format!("item {}", id), 1.0, 10.0, 1.0))
            .collect();
        let outcome = pipeline(MockSource::new(source_rows), target.clone(), 1)
            .run(&CancelToken::new())
            .unwrap();

        assert_eq!(outcome.inserted, 10);
        // The failed oversized attempt is retried as one smaller slice.
        assert_eq!(*target.insert_batches.lock().unwrap(), vec![10]);
    }

    #[test]
    fn recurring_packet_failure_is_fatal() {
        let target = target_with_limits(100_000);
        target
            .insert_packet_failures
            .store(usize::MAX, Ordering::SeqCst);

        let source_rows = vec![row(1, "A", 1.0, 10.0, 1.0)];
        let err = pipeline(MockSource::new(source_rows), target.clone(), 1)
            .run(&CancelToken::new())
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::Write {
                kind: BatchKind::Insert,
                ..
            }
        ));
        // Session tunings were still restored; no routine ran.
        assert_eq!(*target.bulk_mode.lock().unwrap(), vec![true, false]);
        assert!(target.routines.lock().unwrap().is_empty());
    }

    #[test]
    fn update_batch_failure_aborts_the_run() {
        let target = Arc::new(MemoryTarget {
            fail_updates: true,
            limits: ServerLimits {
                max_allowed_packet: 100_000,
                ..ServerLimits::default()
            },
            ..MemoryTarget::default()
        });
        {
            let mut rows = target.rows.lock().unwrap();
            rows.insert(
                1,
                TargetRecord {
                    description: Some("stale".to_string()),
                    quantity: Some(1.0),
                    ..TargetRecord::default()
                },
            );
        }

        let err = pipeline(
            MockSource::new(vec![row(1, "fresh", 1.0, 10.0, 1.0)]),
            target.clone(),
            1,
        )
        .run(&CancelToken::new())
        .unwrap_err();

        assert!(matches!(
            err,
            SyncError::Write {
                kind: BatchKind::Update,
                ..
            }
        ));
        assert!(target.routines.lock().unwrap().is_empty());
    }

    #[test]
    fn cancellation_aborts_before_post_processing() {
        let target = target_with_limits(100_000);
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = pipeline(
            MockSource::new(vec![row(1, "A", 1.0, 10.0, 1.0)]),
            target.clone(),
            2,
        )
        .run(&cancel)
        .unwrap_err();

        assert!(matches!(err, SyncError::Cancelled));
        assert!(target.routines.lock().unwrap().is_empty());
        assert_eq!(*target.bulk_mode.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn scan_skips_are_reported_separately() {
        let target = target_with_limits(100_000);
        let mut source = MockSource::new(vec![row(1, "A", 1.0, 10.0, 1.0)]);
        source.skipped = 2;

        let outcome = pipeline(source, target, 2).run(&CancelToken::new()).unwrap();
        assert_eq!(outcome.stats.total_rows, 1);
        assert_eq!(outcome.stats.scan_skipped, 2);
        assert_eq!(outcome.inserted, 1);
    }

    #[test]
    fn batch_budget_is_clamped() {
        assert_eq!(max_batch_for_packet(1_000), 100);
        assert_eq!(max_batch_for_packet(100_000), 500);
        assert_eq!(max_batch_for_packet(4 * 1024 * 1024), 5000);
    }
}
