//! Port implementations over the embedded SQLite fixtures.
//!
//! These adapters exist for developer mode only: they run the exact same
//! statements as the live adapters, serialized through a mutex because a
//! SQLite connection cannot be shared across the worker pool. Stored
//! routines do not exist on this engine, so post-processing is a no-op.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use log::{debug, warn};
use rusqlite::{params, params_from_iter, Connection};

use crate::domain::cancel::CancelToken;
use crate::domain::entities::{
    InventoryRecord, ServerLimits, SourceRow, SourceStreamSummary, TargetRecord,
};
use crate::domain::errors::{BatchKind, Result, SyncError};
use crate::infrastructure::sql_utils::{
    build_insert_statement, SNAPSHOT_COUNT, SNAPSHOT_SELECT, SOURCE_PROJECTION, UPDATE_STATEMENT,
};
use crate::ports::maintenance_port::MaintenancePort;
use crate::ports::snapshot_port::TargetIndexPort;
use crate::ports::source_port::SourcePort;
use crate::ports::writer_port::BulkWritePort;

/// Packet budget reported by the fixture target. Keeps the derived batch
/// size at the stock default of 500 rows.
const DEV_PACKET_BUDGET: u64 = 100_000;

pub struct SqliteSource {
    conn: Mutex<Connection>,
}

impl SqliteSource {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

impl SourcePort for SqliteSource {
    fn stream_active_rows(
        &self,
        cancel: &CancelToken,
        sink: &mut dyn FnMut(SourceRow) -> Result<()>,
    ) -> Result<SourceStreamSummary> {
        let conn = lock(&self.conn, "source fixture")?;

        let started = Instant::now();
        let mut stmt = conn
            .prepare(SOURCE_PROJECTION)
            .map_err(|e| SyncError::SourceQuery(e.to_string()))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| SyncError::SourceQuery(e.to_string()))?;
        let query_time = started.elapsed();

        let mut summary = SourceStreamSummary {
            query_time,
            ..Default::default()
        };

        loop {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            let row = match rows.next() {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(e) => return Err(SyncError::SourceQuery(e.to_string())),
            };
            match decode_source_row(row) {
                Ok(parsed) => {
                    sink(parsed)?;
                    summary.delivered += 1;
                }
                Err(e) => {
                    warn!("Skipping unreadable source row: {}", e);
                    summary.skipped += 1;
                }
            }
        }

        Ok(summary)
    }
}

fn decode_source_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SourceRow> {
    Ok(SourceRow {
        id: row.get(0)?,
        description: row.get(1)?,
        quantity: row.get(2)?,
        cost: row.get(3)?,
        usd_value: row.get(4)?,
    })
}

/// Target fixture: one struct implements the index, write, and maintenance
/// ports so a single connection backs all three.
pub struct SqliteTarget {
    conn: Mutex<Connection>,
}

impl SqliteTarget {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

impl TargetIndexPort for SqliteTarget {
    fn snapshot(&self) -> Result<HashMap<i64, TargetRecord>> {
        let conn = lock(&self.conn, "target fixture")?;

        let count: i64 = conn
            .query_row(SNAPSHOT_COUNT, [], |row| row.get(0))
            .map_err(|e| SyncError::Load(e.to_string()))?;
        let mut index = HashMap::with_capacity(count as usize);

        let mut stmt = conn
            .prepare(SNAPSHOT_SELECT)
            .map_err(|e| SyncError::Load(e.to_string()))?;
        let mut rows = stmt.query([]).map_err(|e| SyncError::Load(e.to_string()))?;
        while let Some(row) = rows.next().map_err(|e| SyncError::Load(e.to_string()))? {
            let id: i64 = row.get(0).map_err(|e| SyncError::Load(e.to_string()))?;
            let record = decode_target_row(row).map_err(|e| SyncError::Load(e.to_string()))?;
            index.insert(id, record);
        }

        debug!("target snapshot loaded; records={}", index.len());
        Ok(index)
    }
}

fn decode_target_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TargetRecord> {
    Ok(TargetRecord {
        description: row.get(1)?,
        quantity: row.get(2)?,
        cost: row.get(3)?,
        usd_value: row.get(4)?,
        sell_price: row.get(5)?,
        price_3x: row.get(6)?,
        price_6x: row.get(7)?,
        price_10x: row.get(8)?,
    })
}

impl BulkWritePort for SqliteTarget {
    fn bulk_insert(&self, records: &[InventoryRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let conn = lock(&self.conn, "target fixture")?;

        let sql = build_insert_statement(records.len());
        let mut values: Vec<rusqlite::types::Value> = Vec::with_capacity(records.len() * 9);
        for record in records {
            values.push(record.id.into());
            values.push(record.description.clone().into());
            values.push(record.quantity.into());
            values.push(record.cost.into());
            values.push(record.usd_value.into());
            values.push(record.sell_price.into());
            values.push(record.price_3x.into());
            values.push(record.price_6x.into());
            values.push(record.price_10x.into());
        }

        conn.execute(&sql, params_from_iter(values))
            .map_err(|e| SyncError::Write {
                kind: BatchKind::Insert,
                count: records.len(),
                reason: e.to_string(),
            })?;
        debug!("bulk insert committed; rows={}", records.len());
        Ok(())
    }

    fn bulk_update(&self, records: &[InventoryRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut conn = lock(&self.conn, "target fixture")?;

        let tx = conn.transaction().map_err(|e| SyncError::Write {
            kind: BatchKind::Update,
            count: records.len(),
            reason: e.to_string(),
        })?;
        {
            let mut stmt = tx.prepare(UPDATE_STATEMENT).map_err(|e| SyncError::Write {
                kind: BatchKind::Update,
                count: records.len(),
                reason: e.to_string(),
            })?;
            for record in records {
                stmt.execute(params![
                    record.description,
                    record.quantity,
                    record.cost,
                    record.usd_value,
                    record.sell_price,
                    record.price_3x,
                    record.price_6x,
                    record.price_10x,
                    record.id,
                ])
                .map_err(|e| SyncError::Write {
                    kind: BatchKind::Update,
                    count: records.len(),
                    reason: e.to_string(),
                })?;
            }
        }
        tx.commit().map_err(|e| SyncError::Write {
            kind: BatchKind::Update,
            count: records.len(),
            reason: e.to_string(),
        })?;
        debug!("bulk update committed; rows={}", records.len());
        Ok(())
    }
}

impl MaintenancePort for SqliteTarget {
    fn server_limits(&self) -> Result<ServerLimits> {
        Ok(ServerLimits {
            max_allowed_packet: DEV_PACKET_BUDGET,
            ..ServerLimits::default()
        })
    }

    fn set_bulk_load_mode(&self, enabled: bool) -> Result<()> {
        debug!("dev mode: session tunings skipped (enabled={})", enabled);
        Ok(())
    }

    fn run_routine(&self, name: &str) -> Result<()> {
        debug!("dev mode: stored routine {} skipped", name);
        Ok(())
    }
}

fn lock<'a>(
    conn: &'a Mutex<Connection>,
    what: &str,
) -> Result<std::sync::MutexGuard<'a, Connection>> {
    conn.lock()
        .map_err(|_| SyncError::Database(format!("{} connection lock poisoned", what)))
}
