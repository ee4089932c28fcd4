//! Target-side adapter loading the inventory table into the in-memory index.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use mysql::prelude::Queryable;
use mysql::Row;
use r2d2::Pool;

use crate::domain::entities::TargetRecord;
use crate::domain::errors::{Result, SyncError};
use crate::infrastructure::mysql::connection_manager::MySqlConnectionManager;
use crate::infrastructure::sql_utils::{SNAPSHOT_COUNT, SNAPSHOT_SELECT};
use crate::ports::snapshot_port::TargetIndexPort;

pub struct MySqlTargetIndex {
    pool: Arc<Pool<MySqlConnectionManager>>,
}

impl MySqlTargetIndex {
    pub fn new(pool: Arc<Pool<MySqlConnectionManager>>) -> Self {
        Self { pool }
    }
}

impl TargetIndexPort for MySqlTargetIndex {
    /// Counts first so the map is allocated once, then streams every row
    /// with a non-null id. Any failure here is fatal for the run.
    fn snapshot(&self) -> Result<HashMap<i64, TargetRecord>> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| SyncError::Load(e.to_string()))?;

        let count: u64 = conn
            .query_first(SNAPSHOT_COUNT)
            .map_err(|e| SyncError::Load(e.to_string()))?
            .unwrap_or(0);

        let mut index = HashMap::with_capacity(count as usize);

        let result = conn
            .query_iter(SNAPSHOT_SELECT)
            .map_err(|e| SyncError::Load(e.to_string()))?;
        for row in result {
            let row = row.map_err(|e| SyncError::Load(e.to_string()))?;
            let (id, record) = decode_target_row(row)?;
            index.insert(id, record);
        }

        debug!("target snapshot loaded; records={}", index.len());
        Ok(index)
    }
}

fn decode_target_row(mut row: Row) -> Result<(i64, TargetRecord)> {
    let id: i64 = take_column(&mut row, 0)?;
    let record = TargetRecord {
        description: take_column(&mut row, 1)?,
        quantity: take_column(&mut row, 2)?,
        cost: take_column(&mut row, 3)?,
        usd_value: take_column(&mut row, 4)?,
        sell_price: take_column(&mut row, 5)?,
        price_3x: take_column(&mut row, 6)?,
        price_6x: take_column(&mut row, 7)?,
        price_10x: take_column(&mut row, 8)?,
    };
    Ok((id, record))
}

fn take_column<T>(row: &mut Row, index: usize) -> Result<T>
where
    T: mysql::prelude::FromValue,
{
    row.take_opt::<T, usize>(index)
        .ok_or_else(|| SyncError::Load(format!("snapshot column {} missing", index)))?
        .map_err(|e| SyncError::Load(format!("snapshot column {}: {}", index, e)))
}
