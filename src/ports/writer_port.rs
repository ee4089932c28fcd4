//! # Bulk Write Port
//!
//! Contract for the two batched write shapes the workers flush. Batches are
//! independent: a failed batch never corrupts another worker's committed
//! batches.

use crate::domain::entities::InventoryRecord;
use crate::domain::errors::Result;

pub trait BulkWritePort: Send + Sync {
    /// Inserts the whole batch with a single multi-row statement.
    /// Returns `PacketTooLarge` when the statement exceeds the server's
    /// declared packet budget so the caller can shrink and retry.
    fn bulk_insert(&self, records: &[InventoryRecord]) -> Result<()>;

    /// Applies the batch as one transaction of prepared per-row updates,
    /// keyed by id. Any per-row failure rolls back the whole batch.
    fn bulk_update(&self, records: &[InventoryRecord]) -> Result<()>;
}
