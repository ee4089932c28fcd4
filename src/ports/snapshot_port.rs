//! # Target Index Port
//!
//! Contract for the load-once snapshot of the target table. A single bulk
//! read before the streaming phase replaces per-row point lookups.

use std::collections::HashMap;

use crate::domain::entities::TargetRecord;
use crate::domain::errors::Result;

pub trait TargetIndexPort: Send + Sync {
    /// Loads every target row with a non-null id into an id-keyed map.
    /// Invoked once, before any write has happened; a failure here is fatal
    /// and requires no cleanup.
    fn snapshot(&self) -> Result<HashMap<i64, TargetRecord>>;
}
