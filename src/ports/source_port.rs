//! # Source Port
//!
//! Contract for streaming the joined source projection into the pipeline.
//! The implementation owns row decoding: a row that fails to decode is
//! logged and skipped, never surfaced as a run failure.

use crate::domain::cancel::CancelToken;
use crate::domain::entities::{SourceRow, SourceStreamSummary};
use crate::domain::errors::Result;

/// Streams active source rows. `Send + Sync` so the driver can share it.
pub trait SourcePort: Send + Sync {
    /// Runs the fixed projection and invokes `sink` once per decoded row.
    ///
    /// An error returned by `sink` aborts the stream and is propagated.
    /// Cancellation is checked between rows.
    fn stream_active_rows(
        &self,
        cancel: &CancelToken,
        sink: &mut dyn FnMut(SourceRow) -> Result<()>,
    ) -> Result<SourceStreamSummary>;
}
