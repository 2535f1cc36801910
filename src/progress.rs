// Cancellation and progress hooks threaded through long-running operations.
//
// Both are checked or notified at coarse boundaries only: once per document
// during segmentation and once per chunk of similarity rows.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indicatif::ProgressBar;

use crate::error::OperationError;

/// Shared flag that asks a running operation to stop.
///
/// Clones share state, so one clone can be handed to a worker while another
/// stays with whoever may want to cancel.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<(), OperationError> {
        if self.is_cancelled() {
            Err(OperationError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Receives progress notifications. Every method defaults to a no-op.
pub trait ProgressObserver: Send + Sync {
    /// A new stage starts with `total` units of work.
    fn stage(&self, _name: &str, _total: usize) {}

    /// `units` more units of the current stage are done.
    fn advance(&self, _units: usize) {}

    /// The operation finished (successfully or not).
    fn finish(&self) {}
}

/// Observer that ignores everything.
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

/// Drive a terminal progress bar from pipeline stages.
impl ProgressObserver for ProgressBar {
    fn stage(&self, name: &str, total: usize) {
        self.set_message(name.to_string());
        self.set_length(total as u64);
        self.set_position(0);
    }

    fn advance(&self, units: usize) {
        self.inc(units as u64);
    }

    fn finish(&self) {
        self.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let worker = token.clone();
        assert!(worker.check().is_ok());

        token.cancel();
        assert!(worker.is_cancelled());
        assert!(matches!(worker.check(), Err(OperationError::Cancelled)));
    }

    #[test]
    fn test_progress_bar_tracks_stage() {
        let bar = ProgressBar::hidden();
        bar.stage("Scoring", 10);
        bar.advance(3);
        assert_eq!(bar.length(), Some(10));
        assert_eq!(bar.position(), 3);
    }
}
