//! End-to-end runs of the orchestrator against the local engine.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use dirseeder_app::{AppError, RunConfig, SeedingOrchestrator, ShutdownTiming, StopCause};
use dirseeder_core::{ContinuationRequest, MetainfoLoader, SeedingSession, TaskState, TaskStatus};
use dirseeder_engine::{CheckpointStore, LocalEngine};
use dirseeder_test_support::fixtures::{TorrentFixture, write_malformed_descriptor};
use tempfile::TempDir;

const FAST: ShutdownTiming = ShutdownTiming {
    poll_interval: Duration::from_millis(5),
    settle_delay: Duration::from_millis(1),
};

fn run_config(output: &Path, descriptors: &Path) -> RunConfig {
    let mut config = RunConfig::new(output, descriptors);
    config.status_interval = Duration::from_millis(20);
    config.shutdown = FAST;
    config
}

fn orchestrator(config: &RunConfig) -> SeedingOrchestrator {
    let quiet = |_: &[TaskStatus]| ContinuationRequest::keep_polling(Duration::from_millis(20));
    SeedingOrchestrator::new(config).with_status_callback(Arc::new(quiet))
}

fn checkpoint_states(config: &RunConfig) -> anyhow::Result<Vec<TaskState>> {
    let store = CheckpointStore::new(config.session_config().checkpoint_dir());
    let loaded = store.load_all()?;
    Ok(loaded.records.iter().map(|record| record.state).collect())
}

#[tokio::test]
async fn seeds_every_descriptor_and_stops_cleanly() -> anyhow::Result<()> {
    let output = TempDir::new()?;
    let descriptors = TempDir::new()?;
    for name in ["a", "b"] {
        let fixture = TorrentFixture::single_file(&format!("{name}.iso"), 4096);
        fixture.write_to(descriptors.path(), &format!("{name}.torrent"))?;
        fixture.write_payload(output.path())?;
    }
    std::fs::write(descriptors.path().join("notes.txt"), b"not a descriptor")?;

    let config = run_config(output.path(), descriptors.path());
    let engine = LocalEngine::new(config.session_config())?;
    let summary = orchestrator(&config)
        .run(&engine, &MetainfoLoader, async { StopCause::EndOfInput })
        .await?;

    assert_eq!(summary.restored, 0);
    assert_eq!(summary.report.started, 2);
    assert_eq!(summary.report.start_attempts(), 2);
    assert_eq!(summary.stop_cause, StopCause::EndOfInput);
    assert!(engine.is_shutdown_complete());

    let states = checkpoint_states(&config)?;
    assert_eq!(states, vec![TaskState::Stopped, TaskState::Stopped]);
    Ok(())
}

#[tokio::test]
async fn rerun_restores_and_treats_scanned_descriptors_as_duplicates() -> anyhow::Result<()> {
    let output = TempDir::new()?;
    let descriptors = TempDir::new()?;
    for name in ["first", "second"] {
        TorrentFixture::multi_file(name, &[("part1.bin", 100), ("part2.bin", 200)])
            .write_to(descriptors.path(), &format!("{name}.torrent"))?;
    }
    let config = run_config(output.path(), descriptors.path());

    let engine = LocalEngine::new(config.session_config())?;
    let first = orchestrator(&config)
        .run(&engine, &MetainfoLoader, async { StopCause::EndOfInput })
        .await?;
    assert_eq!(first.report.started, 2);

    let engine = LocalEngine::new(config.session_config())?;
    let second = orchestrator(&config)
        .run(&engine, &MetainfoLoader, async { StopCause::Interrupt })
        .await?;
    assert_eq!(second.restored, 2);
    assert_eq!(second.report.started, 0);
    assert_eq!(second.report.duplicates, 2);
    assert_eq!(second.stop_cause, StopCause::Interrupt);
    Ok(())
}

#[tokio::test]
async fn malformed_descriptors_are_skipped() -> anyhow::Result<()> {
    let output = TempDir::new()?;
    let descriptors = TempDir::new()?;
    TorrentFixture::single_file("good.bin", 10).write_to(descriptors.path(), "good.torrent")?;
    write_malformed_descriptor(descriptors.path(), "bad.torrent")?;
    write_malformed_descriptor(descriptors.path(), "worse.torrent")?;

    let config = run_config(output.path(), descriptors.path());
    let engine = LocalEngine::new(config.session_config())?;
    let summary = orchestrator(&config)
        .run(&engine, &MetainfoLoader, async { StopCause::EndOfInput })
        .await?;

    assert_eq!(summary.report.started, 1);
    assert_eq!(summary.report.load_failures, 2);
    assert_eq!(summary.report.start_failures, 0);
    Ok(())
}

#[tokio::test]
async fn unreadable_descriptor_dir_fails_after_engine_teardown() -> anyhow::Result<()> {
    let output = TempDir::new()?;
    let config = run_config(output.path(), &output.path().join("does-not-exist"));
    let engine = LocalEngine::new(config.session_config())?;

    let err = orchestrator(&config)
        .run(&engine, &MetainfoLoader, std::future::pending())
        .await
        .expect_err("missing descriptor directory");

    assert!(matches!(err, AppError::Io { .. }));
    assert_eq!(err.exit_code(), 1);
    assert!(engine.is_shutdown_complete());
    Ok(())
}
