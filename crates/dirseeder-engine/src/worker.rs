#![allow(clippy::redundant_pub_crate)]

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dirseeder_core::{
    Descriptor, InfoHash, RateCaps, StatusCallback, TaskError, TaskHandle, TaskRates, TaskResult,
    TaskState, TaskStatus,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::command::EngineCommand;
use crate::error::op_failed;
use crate::probe::{PayloadProbe, probe_payload};
use crate::store::{CheckpointRecord, CheckpointStore};
use crate::tracker::TrackerRegistry;
use crate::types::SessionConfig;

/// Floor applied to callback-requested intervals.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub(crate) fn spawn(
    config: &SessionConfig,
    store: CheckpointStore,
    mut commands: mpsc::Receiver<EngineCommand>,
    shutdown_complete: Arc<AtomicBool>,
) {
    let mut worker = Worker::new(config, store);
    tokio::spawn(async move {
        loop {
            let deadline = worker.next_poll();
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        debug!("all session handles dropped");
                        break;
                    };
                    if worker.handle(command).is_break() {
                        break;
                    }
                }
                () = wait_until(deadline) => worker.poll().await,
            }
        }
        commands.close();
        worker.shutdown();
        shutdown_complete.store(true, Ordering::Release);
    });
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn reply<T>(respond_to: oneshot::Sender<T>, value: T) {
    if respond_to.send(value).is_err() {
        debug!("caller dropped before the engine replied");
    }
}

struct PollRegistration {
    callback: Arc<dyn StatusCallback>,
    interval: Duration,
    next_due: Instant,
}

struct TaskEntry {
    id: Uuid,
    descriptor: Arc<Descriptor>,
    destination: PathBuf,
    caps: RateCaps,
    added_at: DateTime<Utc>,
    state: TaskState,
    progress: f64,
    error: Option<String>,
}

impl TaskEntry {
    fn admit(descriptor: Descriptor, destination: PathBuf, caps: RateCaps) -> Self {
        let mut entry = Self {
            id: Uuid::new_v4(),
            descriptor: Arc::new(descriptor),
            destination,
            caps,
            added_at: Utc::now(),
            state: TaskState::Queued,
            progress: 0.0,
            error: None,
        };
        entry.refresh();
        entry
    }

    fn resume(record: CheckpointRecord) -> Self {
        let mut entry = Self {
            id: record.task_id,
            descriptor: Arc::new(record.descriptor),
            destination: record.destination,
            caps: record.caps,
            added_at: record.added_at,
            state: TaskState::Queued,
            progress: 0.0,
            error: None,
        };
        entry.refresh();
        entry
    }

    fn refresh(&mut self) -> Option<TaskState> {
        let probe = probe_payload(&self.descriptor, &self.destination);
        self.apply(probe)
    }

    /// Record a probe result; returns the previous state when it changed.
    fn apply(&mut self, probe: PayloadProbe) -> Option<TaskState> {
        let PayloadProbe {
            state,
            progress,
            error,
        } = probe;
        let previous = self.state;
        self.state = state;
        self.progress = progress;
        self.error = error;
        (previous != state).then_some(previous)
    }

    fn snapshot(&self) -> TaskStatus {
        TaskStatus {
            id: self.id,
            name: self.descriptor.name.clone(),
            state: self.state,
            progress: self.progress,
            error: self.error.clone(),
            rates: TaskRates::default(),
        }
    }

    fn checkpoint(&self) -> CheckpointRecord {
        CheckpointRecord {
            task_id: self.id,
            descriptor: Descriptor::clone(&self.descriptor),
            destination: self.destination.clone(),
            caps: self.caps,
            state: self.state,
            added_at: self.added_at,
        }
    }
}

struct Worker {
    store: CheckpointStore,
    tracker: TrackerRegistry,
    tasks: HashMap<InfoHash, TaskEntry>,
    polling: Option<PollRegistration>,
}

impl Worker {
    fn new(config: &SessionConfig, store: CheckpointStore) -> Self {
        let tracker = TrackerRegistry::new(
            config.internal_tracker.is_enabled(),
            config.tracker_url(),
        );
        if tracker.is_enabled() {
            info!(announce_url = %tracker.announce_url(), "internal tracker enabled");
        }
        Self {
            store,
            tracker,
            tasks: HashMap::new(),
            polling: None,
        }
    }

    fn next_poll(&self) -> Option<Instant> {
        self.polling.as_ref().map(|registration| registration.next_due)
    }

    fn handle(&mut self, command: EngineCommand) -> ControlFlow<()> {
        match command {
            EngineCommand::RestoreCheckpoint { respond_to } => {
                reply(respond_to, self.restore());
            }
            EngineCommand::RegisterCallback {
                callback,
                interval,
                respond_to,
            } => {
                let interval = interval.max(MIN_POLL_INTERVAL);
                self.polling = Some(PollRegistration {
                    callback,
                    interval,
                    next_due: Instant::now() + interval,
                });
                debug!(interval = ?interval, "status callback registered");
                reply(respond_to, Ok(()));
            }
            EngineCommand::RegisterTracker {
                info_hash,
                respond_to,
            } => {
                let result = self.tracker.register(info_hash).map(|added| {
                    if added {
                        debug!(info_hash = %info_hash, "descriptor registered with internal tracker");
                    }
                });
                reply(respond_to, result);
            }
            EngineCommand::StartTask {
                descriptor,
                destination,
                caps,
                respond_to,
            } => {
                reply(respond_to, self.start_task(*descriptor, destination, caps));
            }
            EngineCommand::Shutdown => {
                info!("session shutdown requested");
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn start_task(
        &mut self,
        descriptor: Descriptor,
        destination: PathBuf,
        caps: RateCaps,
    ) -> TaskResult<TaskHandle> {
        let info_hash = descriptor.info_hash;
        if let Some(existing) = self.tasks.get(&info_hash) {
            debug!(
                task_id = %existing.id,
                info_hash = %info_hash,
                "task already tracked"
            );
            return Err(TaskError::Duplicate { info_hash });
        }

        let entry = TaskEntry::admit(descriptor, destination, caps);
        info!(
            task_id = %entry.id,
            info_hash = %info_hash,
            task_name = %entry.descriptor.name,
            state = %entry.state,
            upload_cap_kib = ?entry.caps.upload_kib_per_sec,
            tracked = self.tracker.contains(&info_hash),
            "task started"
        );
        let handle = TaskHandle::new(entry.id, info_hash);
        self.persist(&entry);
        self.tasks.insert(info_hash, entry);
        Ok(handle)
    }

    fn restore(&mut self) -> TaskResult<usize> {
        let loaded = self
            .store
            .load_all()
            .map_err(|err| op_failed("restore_checkpoint", None, err))?;
        for err in &loaded.corrupt {
            warn!(error = ?err, "skipping unreadable checkpoint record");
        }

        let mut restored = 0;
        for record in loaded.records {
            let info_hash = record.descriptor.info_hash;
            if self.tasks.contains_key(&info_hash) {
                debug!(info_hash = %info_hash, "checkpointed task already active");
                continue;
            }
            if self.tracker.is_enabled() {
                self.tracker.register(info_hash)?;
            }
            let entry = TaskEntry::resume(record);
            debug!(
                task_id = %entry.id,
                info_hash = %info_hash,
                state = %entry.state,
                "task restored from checkpoint"
            );
            self.persist(&entry);
            self.tasks.insert(info_hash, entry);
            restored += 1;
        }

        info!(
            restored,
            skipped = loaded.corrupt.len(),
            "checkpoint restore completed"
        );
        Ok(restored)
    }

    async fn poll(&mut self) {
        let Some(mut registration) = self.polling.take() else {
            return;
        };
        self.refresh_tasks().await;
        let snapshots = self.snapshots();
        let callback = Arc::clone(&registration.callback);

        match panic::catch_unwind(AssertUnwindSafe(|| callback.on_status(&snapshots))) {
            Ok(request) if request.stop => {
                debug!("status callback asked to stop polling");
                return;
            }
            Ok(request) => registration.interval = request.interval.max(MIN_POLL_INTERVAL),
            Err(_) => error!("status callback panicked; keeping previous interval"),
        }
        registration.next_due = Instant::now() + registration.interval;
        self.polling = Some(registration);
    }

    /// Re-probe every live task on the blocking pool.
    async fn refresh_tasks(&mut self) {
        let targets: Vec<(InfoHash, Arc<Descriptor>, PathBuf)> = self
            .tasks
            .iter()
            .filter(|(_, entry)| entry.state != TaskState::Stopped)
            .map(|(info_hash, entry)| {
                (
                    *info_hash,
                    Arc::clone(&entry.descriptor),
                    entry.destination.clone(),
                )
            })
            .collect();
        if targets.is_empty() {
            return;
        }

        let probed = task::spawn_blocking(move || {
            targets
                .into_iter()
                .map(|(info_hash, descriptor, destination)| {
                    (info_hash, probe_payload(&descriptor, &destination))
                })
                .collect::<Vec<_>>()
        })
        .await;
        let probes = match probed {
            Ok(probes) => probes,
            Err(err) => {
                error!(error = %err, "payload refresh task failed");
                return;
            }
        };

        for (info_hash, probe) in probes {
            let Some(entry) = self.tasks.get_mut(&info_hash) else {
                continue;
            };
            if let Some(previous) = entry.apply(probe) {
                info!(
                    task_id = %entry.id,
                    task_name = %entry.descriptor.name,
                    from = %previous,
                    to = %entry.state,
                    "task state changed"
                );
            }
        }
    }

    fn snapshots(&self) -> Vec<TaskStatus> {
        let mut entries: Vec<&TaskEntry> = self.tasks.values().collect();
        entries.sort_by_key(|entry| (entry.added_at, entry.id));
        entries.into_iter().map(TaskEntry::snapshot).collect()
    }

    fn persist(&self, entry: &TaskEntry) {
        if let Err(err) = self.store.write(&entry.checkpoint()) {
            warn!(
                error = ?err,
                info_hash = %entry.descriptor.info_hash,
                "failed to write checkpoint record"
            );
        }
    }

    fn shutdown(&mut self) {
        self.polling = None;
        for entry in self.tasks.values_mut() {
            entry.state = TaskState::Stopped;
        }
        for entry in self.tasks.values() {
            self.persist(entry);
        }
        info!(
            tasks = self.tasks.len(),
            tracker_entries = self.tracker.len(),
            "session stopped"
        );
    }
}
