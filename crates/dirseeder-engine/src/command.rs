use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dirseeder_core::{Descriptor, InfoHash, RateCaps, StatusCallback, TaskHandle, TaskResult};
use tokio::sync::oneshot;

/// Commands accepted by the session worker.
pub(crate) enum EngineCommand {
    /// Re-admit tasks persisted by a previous session.
    RestoreCheckpoint {
        /// Channel used to return the number of restored tasks.
        respond_to: oneshot::Sender<TaskResult<usize>>,
    },
    /// Install (or replace) the periodic status callback.
    RegisterCallback {
        /// Consumer of task snapshots.
        callback: Arc<dyn StatusCallback>,
        /// Delay before the first invocation.
        interval: Duration,
        /// Acknowledgement channel.
        respond_to: oneshot::Sender<TaskResult<()>>,
    },
    /// Announce a descriptor identity to the internal tracker.
    RegisterTracker {
        /// Identity to register.
        info_hash: InfoHash,
        /// Acknowledgement channel.
        respond_to: oneshot::Sender<TaskResult<()>>,
    },
    /// Admit a task for a descriptor.
    StartTask {
        /// Descriptor moved into the engine.
        descriptor: Box<Descriptor>,
        /// Directory holding the payload.
        destination: PathBuf,
        /// Caps applied to the task.
        caps: RateCaps,
        /// Channel used to return the task handle.
        respond_to: oneshot::Sender<TaskResult<TaskHandle>>,
    },
    /// Stop every task and end the worker.
    Shutdown,
}

impl fmt::Debug for EngineCommand {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RestoreCheckpoint { .. } => formatter.write_str("RestoreCheckpoint"),
            Self::RegisterCallback { interval, .. } => formatter
                .debug_struct("RegisterCallback")
                .field("interval", interval)
                .finish_non_exhaustive(),
            Self::RegisterTracker { info_hash, .. } => formatter
                .debug_struct("RegisterTracker")
                .field("info_hash", info_hash)
                .finish_non_exhaustive(),
            Self::StartTask {
                descriptor,
                destination,
                ..
            } => formatter
                .debug_struct("StartTask")
                .field("info_hash", &descriptor.info_hash)
                .field("destination", destination)
                .finish_non_exhaustive(),
            Self::Shutdown => formatter.write_str("Shutdown"),
        }
    }
}
