#![forbid(unsafe_code)]
#![warn(
    unused,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! In-process session engine implementing [`SeedingSession`].
//!
//! A background worker owns the task table, the internal tracker registry, and
//! the checkpoint store; handles talk to it over a command channel. Payloads
//! are verified by file length only and no network transfer takes place.

mod command;
/// Engine error types.
pub mod error;
mod probe;
/// Checkpoint persistence.
pub mod store;
mod tracker;
/// Session configuration inputs.
pub mod types;
mod worker;

pub use error::{EngineError, EngineResult};
pub use store::{CheckpointRecord, CheckpointStore};
pub use types::{CHECKPOINT_DIR, SessionConfig, Toggle};

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use command::EngineCommand;
use dirseeder_core::{
    Descriptor, RateCaps, SeedingSession, StatusCallback, TaskError, TaskHandle, TaskResult,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

const COMMAND_BUFFER: usize = 128;

/// Handle to the local session engine; clones share the same session.
#[derive(Clone)]
pub struct LocalEngine {
    commands: mpsc::Sender<EngineCommand>,
    shutdown_complete: Arc<AtomicBool>,
    config: Arc<SessionConfig>,
}

impl LocalEngine {
    /// Prepare the state directory and spawn the session worker.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid or the state
    /// directory cannot be created.
    pub fn new(config: SessionConfig) -> EngineResult<Self> {
        config.validate()?;
        fs::create_dir_all(&config.state_dir).map_err(|source| EngineError::StateDir {
            path: config.state_dir.clone(),
            source,
        })?;
        let store = CheckpointStore::new(config.checkpoint_dir());
        store.ensure_initialized()?;

        for feature in config.unsupported_features() {
            warn!(feature, "feature is not supported by the local engine; ignoring");
        }

        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        let shutdown_complete = Arc::new(AtomicBool::new(false));
        worker::spawn(&config, store, rx, Arc::clone(&shutdown_complete));
        info!(
            state_dir = %config.state_dir.display(),
            listen_port = config.listen_port,
            "local session engine started"
        );

        Ok(Self {
            commands,
            shutdown_complete,
            config: Arc::new(config),
        })
    }

    /// Configuration the session was created with.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    async fn send_command(
        &self,
        operation: &'static str,
        command: EngineCommand,
    ) -> TaskResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| TaskError::SessionClosed { operation })
    }

    async fn request<T>(
        &self,
        operation: &'static str,
        build: impl FnOnce(oneshot::Sender<TaskResult<T>>) -> EngineCommand,
    ) -> TaskResult<T> {
        let (respond_to, response) = oneshot::channel();
        self.send_command(operation, build(respond_to)).await?;
        response
            .await
            .map_err(|_| TaskError::SessionClosed { operation })?
    }
}

#[async_trait]
impl SeedingSession for LocalEngine {
    async fn restore_checkpoint(&self) -> TaskResult<usize> {
        self.request("restore_checkpoint", |respond_to| {
            EngineCommand::RestoreCheckpoint { respond_to }
        })
        .await
    }

    async fn register_periodic_callback(
        &self,
        callback: Arc<dyn StatusCallback>,
        interval: Duration,
    ) -> TaskResult<()> {
        self.request("register_periodic_callback", |respond_to| {
            EngineCommand::RegisterCallback {
                callback,
                interval,
                respond_to,
            }
        })
        .await
    }

    async fn register_tracker_entry(&self, descriptor: &Descriptor) -> TaskResult<()> {
        let info_hash = descriptor.info_hash;
        self.request("register_tracker_entry", |respond_to| {
            EngineCommand::RegisterTracker {
                info_hash,
                respond_to,
            }
        })
        .await
    }

    async fn start_task(
        &self,
        descriptor: Descriptor,
        destination: &Path,
        caps: RateCaps,
    ) -> TaskResult<TaskHandle> {
        let destination = destination.to_path_buf();
        self.request("start_task", |respond_to| EngineCommand::StartTask {
            descriptor: Box::new(descriptor),
            destination,
            caps,
            respond_to,
        })
        .await
    }

    async fn request_shutdown(&self) -> TaskResult<()> {
        self.send_command("request_shutdown", EngineCommand::Shutdown)
            .await
    }

    fn is_shutdown_complete(&self) -> bool {
        self.shutdown_complete.load(Ordering::Acquire)
    }
}
