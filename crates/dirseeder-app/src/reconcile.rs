//! Turns scanned descriptor files into engine tasks.

use std::path::{Path, PathBuf};

use dirseeder_core::{Descriptor, DescriptorLoader, RateCaps, SeedingSession, TaskError};
use tracing::{error, info, warn};

/// Per-pass outcome counts; handles are never retained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Tasks newly created by the engine.
    pub started: usize,
    /// Candidates whose identity was already tracked.
    pub duplicates: usize,
    /// Candidates that could not be loaded.
    pub load_failures: usize,
    /// Candidates the engine refused for reasons other than duplication.
    pub start_failures: usize,
}

impl ReconcileReport {
    /// Candidates that reached the engine.
    #[must_use]
    pub const fn start_attempts(&self) -> usize {
        self.started + self.duplicates + self.start_failures
    }
}

/// Registers each candidate descriptor with the session and starts its task.
pub struct Reconciler<'a, S: ?Sized, L: ?Sized> {
    session: &'a S,
    loader: &'a L,
    destination: &'a Path,
    caps: RateCaps,
}

impl<'a, S, L> Reconciler<'a, S, L>
where
    S: SeedingSession + ?Sized,
    L: DescriptorLoader + ?Sized,
{
    /// Reconciler writing payloads under `destination` with `caps` per task.
    pub const fn new(session: &'a S, loader: &'a L, destination: &'a Path, caps: RateCaps) -> Self {
        Self {
            session,
            loader,
            destination,
            caps,
        }
    }

    /// Process `candidates` in order. A failing candidate never aborts the pass.
    pub async fn reconcile(&self, candidates: &[PathBuf]) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        for path in candidates {
            let descriptor = match self.loader.load(path) {
                Ok(descriptor) => descriptor,
                Err(err) => {
                    warn!(error = ?err, path = %path.display(), "failed to load descriptor");
                    report.load_failures += 1;
                    continue;
                }
            };
            let name = descriptor.name.clone();

            match self.start(descriptor).await {
                Ok(()) => report.started += 1,
                Err(TaskError::Duplicate { info_hash }) => {
                    info!(
                        path = %path.display(),
                        task_name = %name,
                        info_hash = %info_hash,
                        "restarting existing task"
                    );
                    report.duplicates += 1;
                }
                Err(err) => {
                    error!(
                        error = ?err,
                        path = %path.display(),
                        task_name = %name,
                        "failed to start task"
                    );
                    report.start_failures += 1;
                }
            }
        }
        report
    }

    async fn start(&self, descriptor: Descriptor) -> Result<(), TaskError> {
        self.session.register_tracker_entry(&descriptor).await?;
        let handle = self
            .session
            .start_task(descriptor, self.destination, self.caps)
            .await?;
        info!(task_id = %handle.id(), info_hash = %handle.info_hash(), "task admitted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSession;
    use dirseeder_core::MetainfoLoader;
    use dirseeder_test_support::fixtures::{TorrentFixture, write_malformed_descriptor};
    use tempfile::TempDir;

    const CAPS: RateCaps = RateCaps::upload_only(256);

    #[tokio::test]
    async fn valid_and_malformed_candidates_are_counted_separately() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let mut candidates = Vec::new();
        for name in ["one", "two", "three"] {
            candidates.push(
                TorrentFixture::single_file(&format!("{name}.bin"), 8)
                    .write_to(temp.path(), &format!("{name}.torrent"))?,
            );
        }
        candidates.push(write_malformed_descriptor(temp.path(), "bad.torrent")?);
        candidates.push(temp.path().join("vanished.torrent"));

        let session = RecordingSession::default();
        let report = Reconciler::new(&session, &MetainfoLoader, temp.path(), CAPS)
            .reconcile(&candidates)
            .await;

        assert_eq!(
            report,
            ReconcileReport {
                started: 3,
                duplicates: 0,
                load_failures: 2,
                start_failures: 0,
            }
        );
        assert_eq!(report.start_attempts(), 3);
        assert_eq!(session.start_calls(), 3);
        assert_eq!(session.tracker_calls(), 3);
        assert_eq!(session.last_caps(), Some(CAPS));
        Ok(())
    }

    #[tokio::test]
    async fn second_pass_reports_duplicates_only() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let candidates = vec![
            TorrentFixture::single_file("a.bin", 1).write_to(temp.path(), "a.torrent")?,
            TorrentFixture::single_file("b.bin", 2).write_to(temp.path(), "b.torrent")?,
        ];
        let session = RecordingSession::default();
        let reconciler = Reconciler::new(&session, &MetainfoLoader, temp.path(), CAPS);

        let first = reconciler.reconcile(&candidates).await;
        let second = reconciler.reconcile(&candidates).await;

        assert_eq!(first.started, 2);
        assert_eq!(second.started, 0);
        assert_eq!(second.duplicates, 2);
        assert_eq!(session.task_count(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn engine_failures_do_not_abort_the_pass() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let candidates = vec![
            TorrentFixture::single_file("doomed.bin", 1).write_to(temp.path(), "doomed.torrent")?,
            TorrentFixture::single_file("fine.bin", 1).write_to(temp.path(), "fine.torrent")?,
        ];
        let session = RecordingSession::default().failing_start_for("doomed.bin");

        let report = Reconciler::new(&session, &MetainfoLoader, temp.path(), CAPS)
            .reconcile(&candidates)
            .await;

        assert_eq!(report.started, 1);
        assert_eq!(report.start_failures, 1);
        assert_eq!(report.start_attempts(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn tracker_rejection_is_a_start_failure() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let candidates =
            vec![TorrentFixture::single_file("x.bin", 1).write_to(temp.path(), "x.torrent")?];
        let session = RecordingSession::default().with_tracker_disabled();

        let report = Reconciler::new(&session, &MetainfoLoader, temp.path(), CAPS)
            .reconcile(&candidates)
            .await;

        assert_eq!(report.start_failures, 1);
        assert_eq!(session.start_calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn empty_candidate_list_is_a_no_op() {
        let session = RecordingSession::default();
        let report = Reconciler::new(&session, &MetainfoLoader, Path::new("/unused"), CAPS)
            .reconcile(&[])
            .await;
        assert_eq!(report, ReconcileReport::default());
        assert_eq!(session.start_calls(), 0);
    }
}
