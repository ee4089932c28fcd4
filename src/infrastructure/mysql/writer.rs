//! Target-side bulk writer.
//!
//! Inserts go out as one multi-row statement per batch (atomicity at the
//! batch level through the implicit transaction). Updates run as a prepared
//! statement inside an explicit transaction, one execution per row, with the
//! whole batch rolled back on any per-row failure.

use std::sync::Arc;

use log::debug;
use mysql::prelude::Queryable;
use mysql::{TxOpts, Value};
use r2d2::Pool;

use crate::domain::entities::InventoryRecord;
use crate::domain::errors::{BatchKind, Result, SyncError};
use crate::infrastructure::mysql::connection_manager::MySqlConnectionManager;
use crate::infrastructure::sql_utils::{build_insert_statement, UPDATE_STATEMENT};
use crate::ports::writer_port::BulkWritePort;

/// Server error raised when a statement exceeds `max_allowed_packet`.
const ER_NET_PACKET_TOO_LARGE: u16 = 1153;

pub struct MySqlBulkWriter {
    pool: Arc<Pool<MySqlConnectionManager>>,
}

impl MySqlBulkWriter {
    pub fn new(pool: Arc<Pool<MySqlConnectionManager>>) -> Self {
        Self { pool }
    }

    fn checkout(&self, kind: BatchKind, count: usize) -> Result<r2d2::PooledConnection<MySqlConnectionManager>> {
        self.pool.get().map_err(|e| SyncError::Write {
            kind,
            count,
            reason: format!("no connection available: {}", e),
        })
    }
}

impl BulkWritePort for MySqlBulkWriter {
    fn bulk_insert(&self, records: &[InventoryRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut conn = self.checkout(BatchKind::Insert, records.len())?;

        let sql = build_insert_statement(records.len());
        conn.exec_drop(sql, insert_params(records))
            .map_err(|e| map_write_error(BatchKind::Insert, records.len(), e))?;

        debug!("bulk insert committed; rows={}", records.len());
        Ok(())
    }

    fn bulk_update(&self, records: &[InventoryRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut conn = self.checkout(BatchKind::Update, records.len())?;

        // Dropping the transaction without a commit rolls the batch back.
        let mut tx = conn
            .start_transaction(TxOpts::default())
            .map_err(|e| map_write_error(BatchKind::Update, records.len(), e))?;
        let stmt = tx
            .prep(UPDATE_STATEMENT)
            .map_err(|e| map_write_error(BatchKind::Update, records.len(), e))?;

        for record in records {
            tx.exec_drop(
                &stmt,
                (
                    record.description.as_str(),
                    record.quantity,
                    record.cost,
                    record.usd_value,
                    record.sell_price,
                    record.price_3x,
                    record.price_6x,
                    record.price_10x,
                    record.id,
                ),
            )
            .map_err(|e| map_write_error(BatchKind::Update, records.len(), e))?;
        }

        tx.commit()
            .map_err(|e| map_write_error(BatchKind::Update, records.len(), e))?;

        debug!("bulk update committed; rows={}", records.len());
        Ok(())
    }
}

/// Flattens a batch into positional bind values, nine per record, in
/// statement order.
pub fn insert_params(records: &[InventoryRecord]) -> Vec<Value> {
    let mut values = Vec::with_capacity(records.len() * 9);
    for record in records {
        values.push(Value::from(record.id));
        values.push(Value::from(record.description.as_str()));
        values.push(Value::from(record.quantity));
        values.push(Value::from(record.cost));
        values.push(Value::from(record.usd_value));
        values.push(Value::from(record.sell_price));
        values.push(Value::from(record.price_3x));
        values.push(Value::from(record.price_6x));
        values.push(Value::from(record.price_10x));
    }
    values
}

fn map_write_error(kind: BatchKind, count: usize, err: mysql::Error) -> SyncError {
    if let mysql::Error::MySqlError(ref server) = err {
        if server.code == ER_NET_PACKET_TOO_LARGE {
            return SyncError::PacketTooLarge { kind, count };
        }
    }
    SyncError::Write {
        kind,
        count,
        reason: err.to_string(),
    }
}
