//! # Maintenance Port
//!
//! Target-side administrative operations around the write phase: server
//! limit probes, session tunings, and the post-processing routines.

use crate::domain::entities::ServerLimits;
use crate::domain::errors::Result;

pub trait MaintenancePort: Send + Sync {
    /// Reads the server-declared connection and packet limits.
    fn server_limits(&self) -> Result<ServerLimits>;

    /// Relaxes (`true`) or restores (`false`) uniqueness and referential
    /// checks for the duration of the write phase. Implementations may treat
    /// an unsupported tuning as a warning rather than a failure.
    fn set_bulk_load_mode(&self, enabled: bool) -> Result<()>;

    /// Invokes a named stored routine on the target. A no-op on engines
    /// without stored routine support (developer mode).
    fn run_routine(&self, name: &str) -> Result<()>;
}
