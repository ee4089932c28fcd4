//! Source-side adapter streaming the joined stock projection.
//!
//! Rows are decoded one at a time and handed to the pipeline's sink; a row
//! that fails to decode is logged with its position and skipped, so one bad
//! row never aborts the run.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, warn};
use mysql::prelude::Queryable;
use mysql::Row;
use r2d2::Pool;

use crate::domain::cancel::CancelToken;
use crate::domain::entities::{SourceRow, SourceStreamSummary};
use crate::domain::errors::{Endpoint, Result, SyncError};
use crate::infrastructure::mysql::connection_manager::MySqlConnectionManager;
use crate::infrastructure::sql_utils::SOURCE_PROJECTION;
use crate::ports::source_port::SourcePort;

pub struct MySqlSourceReader {
    pool: Arc<Pool<MySqlConnectionManager>>,
}

impl MySqlSourceReader {
    pub fn new(pool: Arc<Pool<MySqlConnectionManager>>) -> Self {
        Self { pool }
    }
}

impl SourcePort for MySqlSourceReader {
    fn stream_active_rows(
        &self,
        cancel: &CancelToken,
        sink: &mut dyn FnMut(SourceRow) -> Result<()>,
    ) -> Result<SourceStreamSummary> {
        let mut conn = self.pool.get().map_err(|e| SyncError::Connect {
            which: Endpoint::Source,
            reason: e.to_string(),
        })?;

        let started = Instant::now();
        let result = conn
            .query_iter(SOURCE_PROJECTION)
            .map_err(|e| SyncError::SourceQuery(e.to_string()))?;
        let query_time = started.elapsed();
        debug!("source projection executed in {:?}", query_time);

        let mut summary = SourceStreamSummary {
            query_time,
            ..Default::default()
        };

        for row in result {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            let row = row.map_err(|e| SyncError::SourceQuery(e.to_string()))?;
            match decode_source_row(row) {
                Ok(parsed) => {
                    sink(parsed)?;
                    summary.delivered += 1;
                }
                Err(reason) => {
                    warn!("Skipping unreadable source row: {}", reason);
                    summary.skipped += 1;
                }
            }
        }

        Ok(summary)
    }
}

fn decode_source_row(mut row: Row) -> std::result::Result<SourceRow, String> {
    Ok(SourceRow {
        id: take_column(&mut row, 0)?,
        description: take_column(&mut row, 1)?,
        quantity: take_column(&mut row, 2)?,
        cost: take_column(&mut row, 3)?,
        usd_value: take_column(&mut row, 4)?,
    })
}

fn take_column<T>(row: &mut Row, index: usize) -> std::result::Result<T, String>
where
    T: mysql::prelude::FromValue,
{
    row.take_opt::<T, usize>(index)
        .ok_or_else(|| format!("column {} missing", index))?
        .map_err(|e| format!("column {}: {}", index, e))
}
