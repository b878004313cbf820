//! Progress reporting for the long-running passes of a run.
//!
//! The grinder reports through [`ProgressCallback`] and never renders
//! anything itself. `altnames_cli_utils` provides an `indicatif`
//! implementation; tests use [`null_progress`].

use std::sync::Arc;

/// Receives progress from a pass over source rows or scratch records.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work (enables percentage/ETA).
    fn set_total(&self, total: u64);

    /// Set the current position (absolute, not delta).
    fn set_position(&self, pos: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);

    /// Mark progress as complete and remove the progress indicator.
    fn finish_and_clear(&self);
}

/// A [`ProgressCallback`] that ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn set_position(&self, _pos: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

/// Returns a shared [`NullProgress`] instance for convenient use.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
