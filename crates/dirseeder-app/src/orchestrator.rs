//! Sequences one seeding run against an already constructed session.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dirseeder_core::{DescriptorLoader, RateCaps, SeedingSession, StatusCallback};
use dirseeder_telemetry::record_app_mode;
use tracing::{error, info, warn};

use crate::config::RunConfig;
use crate::error::AppResult;
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::scanner::scan_descriptors;
use crate::shutdown::{ShutdownSequencer, ShutdownTiming, StopCause};
use crate::status::StatusAggregator;

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Tasks resumed from the previous run's checkpoint.
    pub restored: usize,
    /// Counts from reconciling the scanned descriptors.
    pub report: ReconcileReport,
    /// What ended the seeding phase.
    pub stop_cause: StopCause,
}

/// Drives restore, scan, reconcile, wait, and teardown for one run.
pub struct SeedingOrchestrator {
    descriptor_dir: PathBuf,
    destination: PathBuf,
    caps: RateCaps,
    status: Arc<dyn StatusCallback>,
    status_interval: Duration,
    timing: ShutdownTiming,
}

impl SeedingOrchestrator {
    /// Orchestrator printing status lines to standard error.
    #[must_use]
    pub fn new(config: &RunConfig) -> Self {
        Self {
            descriptor_dir: config.descriptor_dir.clone(),
            destination: config.output_dir.clone(),
            caps: config.rate_caps(),
            status: Arc::new(StatusAggregator::new(config.status_interval)),
            status_interval: config.status_interval,
            timing: config.shutdown,
        }
    }

    /// Replace the periodic status consumer.
    #[must_use]
    pub fn with_status_callback(mut self, status: Arc<dyn StatusCallback>) -> Self {
        self.status = status;
        self
    }

    /// Replace the shutdown polling cadence.
    #[must_use]
    pub const fn with_shutdown_timing(mut self, timing: ShutdownTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Run until `stop_signal` resolves and the session has shut down.
    ///
    /// The session is torn down on every path out of this function, including
    /// a failed scan.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AppError::Io`] when the descriptor directory cannot be
    /// listed.
    pub async fn run<S, L, F>(
        &self,
        session: &S,
        loader: &L,
        stop_signal: F,
    ) -> AppResult<RunSummary>
    where
        S: SeedingSession + ?Sized,
        L: DescriptorLoader + ?Sized,
        F: Future<Output = StopCause>,
    {
        let mut sequencer = ShutdownSequencer::new(self.timing);

        if let Err(err) = session
            .register_periodic_callback(Arc::clone(&self.status), self.status_interval)
            .await
        {
            warn!(error = ?err, "status callback registration failed");
        }

        let restored = match session.restore_checkpoint().await {
            Ok(restored) => restored,
            Err(err) => {
                warn!(error = ?err, "checkpoint restore failed; continuing without it");
                0
            }
        };
        info!(restored, "checkpoint restore finished");

        let candidates = match scan_descriptors(&self.descriptor_dir) {
            Ok(candidates) => candidates,
            Err(err) => {
                error!(
                    error = ?err,
                    dir = %self.descriptor_dir.display(),
                    "descriptor scan failed"
                );
                sequencer.shutdown(session).await;
                return Err(err);
            }
        };

        let report = Reconciler::new(session, loader, &self.destination, self.caps)
            .reconcile(&candidates)
            .await;
        info!(
            candidates = candidates.len(),
            started = report.started,
            duplicates = report.duplicates,
            load_failures = report.load_failures,
            start_failures = report.start_failures,
            "descriptor reconciliation finished"
        );

        let stop_cause = stop_signal.await;
        record_app_mode("stopping");
        sequencer.request_stop(stop_cause);
        sequencer.shutdown(session).await;

        Ok(RunSummary {
            restored,
            report,
            stop_cause,
        })
    }
}
