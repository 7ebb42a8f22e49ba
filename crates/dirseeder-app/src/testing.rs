//! In-memory session double shared by the app crate's unit tests.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dirseeder_core::{
    Descriptor, InfoHash, RateCaps, SeedingSession, StatusCallback, TaskError, TaskHandle,
    TaskResult,
};
use uuid::Uuid;

/// Records every call and keeps a set of known identities.
#[derive(Default)]
pub(crate) struct RecordingSession {
    tasks: Mutex<HashSet<InfoHash>>,
    last_caps: Mutex<Option<RateCaps>>,
    callback: Mutex<Option<(Arc<dyn StatusCallback>, Duration)>>,
    failing_start: Option<String>,
    tracker_disabled: bool,
    restored: usize,
    restore_fails: bool,
    shutdown_request_fails: bool,
    checks_before_complete: usize,
    never_completes: bool,
    forced_complete: AtomicBool,
    start_calls: AtomicUsize,
    tracker_calls: AtomicUsize,
    restore_calls: AtomicUsize,
    shutdown_requests: AtomicUsize,
    completion_checks: AtomicUsize,
}

impl RecordingSession {
    pub(crate) fn failing_start_for(mut self, name: &str) -> Self {
        self.failing_start = Some(name.to_string());
        self
    }

    pub(crate) fn with_tracker_disabled(mut self) -> Self {
        self.tracker_disabled = true;
        self
    }

    pub(crate) fn with_restored(mut self, restored: usize) -> Self {
        self.restored = restored;
        self
    }

    pub(crate) fn failing_restore(mut self) -> Self {
        self.restore_fails = true;
        self
    }

    pub(crate) fn failing_shutdown_request(mut self) -> Self {
        self.shutdown_request_fails = true;
        self
    }

    pub(crate) fn completing_after(mut self, checks: usize) -> Self {
        self.checks_before_complete = checks;
        self
    }

    pub(crate) fn never_completing(mut self) -> Self {
        self.never_completes = true;
        self
    }

    pub(crate) fn complete_shutdown(&self) {
        self.forced_complete.store(true, Ordering::SeqCst);
    }

    pub(crate) fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn tracker_calls(&self) -> usize {
        self.tracker_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn restore_calls(&self) -> usize {
        self.restore_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn shutdown_requests(&self) -> usize {
        self.shutdown_requests.load(Ordering::SeqCst)
    }

    pub(crate) fn completion_checks(&self) -> usize {
        self.completion_checks.load(Ordering::SeqCst)
    }

    pub(crate) fn task_count(&self) -> usize {
        self.tasks.lock().expect("tasks lock").len()
    }

    pub(crate) fn last_caps(&self) -> Option<RateCaps> {
        *self.last_caps.lock().expect("caps lock")
    }

    pub(crate) fn registered_interval(&self) -> Option<Duration> {
        self.callback
            .lock()
            .expect("callback lock")
            .as_ref()
            .map(|(_, interval)| *interval)
    }
}

#[async_trait]
impl SeedingSession for RecordingSession {
    async fn restore_checkpoint(&self) -> TaskResult<usize> {
        self.restore_calls.fetch_add(1, Ordering::SeqCst);
        if self.restore_fails {
            return Err(TaskError::operation_failed(
                "restore_checkpoint",
                None,
                "checkpoint store unreadable",
            ));
        }
        Ok(self.restored)
    }

    async fn register_periodic_callback(
        &self,
        callback: Arc<dyn StatusCallback>,
        interval: Duration,
    ) -> TaskResult<()> {
        *self.callback.lock().expect("callback lock") = Some((callback, interval));
        Ok(())
    }

    async fn register_tracker_entry(&self, descriptor: &Descriptor) -> TaskResult<()> {
        self.tracker_calls.fetch_add(1, Ordering::SeqCst);
        if self.tracker_disabled {
            return Err(TaskError::TrackerDisabled {
                info_hash: descriptor.info_hash,
            });
        }
        Ok(())
    }

    async fn start_task(
        &self,
        descriptor: Descriptor,
        _destination: &Path,
        caps: RateCaps,
    ) -> TaskResult<TaskHandle> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_caps.lock().expect("caps lock") = Some(caps);
        if self.failing_start.as_deref() == Some(descriptor.name.as_str()) {
            return Err(TaskError::operation_failed(
                "start_task",
                Some(descriptor.info_hash),
                "payload rejected",
            ));
        }
        let mut tasks = self.tasks.lock().expect("tasks lock");
        if !tasks.insert(descriptor.info_hash) {
            return Err(TaskError::Duplicate {
                info_hash: descriptor.info_hash,
            });
        }
        Ok(TaskHandle::new(Uuid::new_v4(), descriptor.info_hash))
    }

    async fn request_shutdown(&self) -> TaskResult<()> {
        self.shutdown_requests.fetch_add(1, Ordering::SeqCst);
        if self.shutdown_request_fails {
            return Err(TaskError::SessionClosed {
                operation: "request_shutdown",
            });
        }
        Ok(())
    }

    fn is_shutdown_complete(&self) -> bool {
        let checks = self.completion_checks.fetch_add(1, Ordering::SeqCst) + 1;
        if self.forced_complete.load(Ordering::SeqCst) {
            return true;
        }
        !self.never_completes
            && self.shutdown_requests() > 0
            && checks > self.checks_before_complete
    }
}
