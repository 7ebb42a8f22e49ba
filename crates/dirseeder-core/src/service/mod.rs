//! Engine, loader, and callback traits implemented by session adapters.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{DescriptorError, TaskResult};
use crate::model::{ContinuationRequest, Descriptor, RateCaps, TaskHandle, TaskStatus};

/// Periodic status consumer invoked by the engine with every active task.
///
/// Implementations run on the engine's scheduling task, concurrently with the
/// rest of the process, and must return promptly.
pub trait StatusCallback: Send + Sync {
    /// Observe the current snapshots and tell the engine how to continue.
    fn on_status(&self, snapshots: &[TaskStatus]) -> ContinuationRequest;
}

impl<F> StatusCallback for F
where
    F: Fn(&[TaskStatus]) -> ContinuationRequest + Send + Sync,
{
    fn on_status(&self, snapshots: &[TaskStatus]) -> ContinuationRequest {
        self(snapshots)
    }
}

/// Turns a descriptor file into a [`Descriptor`].
pub trait DescriptorLoader: Send + Sync {
    /// Load and validate the descriptor stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] when the file cannot be read or is malformed.
    fn load(&self, path: &Path) -> Result<Descriptor, DescriptorError>;
}

/// Shared session engine consumed by the seeding orchestrator.
///
/// One instance exists per process; it is created at startup and torn down
/// exactly once through [`SeedingSession::request_shutdown`].
#[async_trait]
pub trait SeedingSession: Send + Sync {
    /// Resume tasks persisted by a previous run, returning how many were restored.
    async fn restore_checkpoint(&self) -> TaskResult<usize>;

    /// Install the callback invoked with task snapshots, starting at `interval`.
    async fn register_periodic_callback(
        &self,
        callback: Arc<dyn StatusCallback>,
        interval: Duration,
    ) -> TaskResult<()>;

    /// Announce the descriptor to the engine's internal tracker.
    async fn register_tracker_entry(&self, descriptor: &Descriptor) -> TaskResult<()>;

    /// Start (or refuse as duplicate) the task for `descriptor`.
    ///
    /// Returns [`crate::TaskError::Duplicate`] when a task with the same
    /// identity is already tracked.
    async fn start_task(
        &self,
        descriptor: Descriptor,
        destination: &Path,
        caps: RateCaps,
    ) -> TaskResult<TaskHandle>;

    /// Ask the engine to shut down; completion is reported asynchronously.
    async fn request_shutdown(&self) -> TaskResult<()>;

    /// Whether a previously requested shutdown has finished.
    fn is_shutdown_complete(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DEFAULT_STATUS_INTERVAL;

    #[test]
    fn closures_act_as_status_callbacks() {
        let callback = |snapshots: &[TaskStatus]| {
            assert_eq!(snapshots.len(), 1);
            ContinuationRequest::keep_polling(DEFAULT_STATUS_INTERVAL)
        };
        let shared: Arc<dyn StatusCallback> = Arc::new(callback);
        let request = shared.on_status(&[TaskStatus::default()]);
        assert!(!request.stop);
    }
}
