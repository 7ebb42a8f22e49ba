//! Stop-signal detection and the ordered engine teardown.
//!
//! # Design
//! - The sequencer only moves forward through its phases; each session
//!   teardown request is issued at most once.
//! - Completion is observed by polling the session; there is no timeout.
//! - Input is read on a detached OS thread so a pending read never holds up
//!   runtime teardown.

use std::future::Future;
use std::io::{self, Read};
use std::thread;
use std::time::Duration;

use dirseeder_core::SeedingSession;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Lifecycle phase of the run as seen by the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    /// Seeding; no stop observed yet.
    Running,
    /// A stop was observed; the engine has not been asked to shut down yet.
    StopRequested,
    /// The engine was asked to shut down and has not reported completion.
    EngineShuttingDown,
    /// The engine reported completion and the settle delay elapsed.
    Terminated,
}

/// What ended the seeding phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    /// Standard input reached end of file.
    EndOfInput,
    /// Reading standard input failed.
    InputError,
    /// The process received an interrupt.
    Interrupt,
}

/// Cadence used while waiting for the engine to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownTiming {
    /// Delay between completion checks.
    pub poll_interval: Duration,
    /// Pause after completion before the run returns.
    pub settle_delay: Duration,
}

impl Default for ShutdownTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            settle_delay: Duration::from_secs(1),
        }
    }
}

/// Drives `Running → StopRequested → EngineShuttingDown → Terminated`.
#[derive(Debug)]
pub struct ShutdownSequencer {
    timing: ShutdownTiming,
    phase: ShutdownPhase,
    cause: Option<StopCause>,
}

impl ShutdownSequencer {
    /// Sequencer in the `Running` phase.
    #[must_use]
    pub const fn new(timing: ShutdownTiming) -> Self {
        Self {
            timing,
            phase: ShutdownPhase::Running,
            cause: None,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> ShutdownPhase {
        self.phase
    }

    /// Cause recorded by the first successful [`Self::request_stop`].
    #[must_use]
    pub const fn cause(&self) -> Option<StopCause> {
        self.cause
    }

    /// Record a stop. Only the first call while `Running` has any effect.
    pub fn request_stop(&mut self, cause: StopCause) -> bool {
        if self.phase != ShutdownPhase::Running {
            debug!(?cause, phase = ?self.phase, "stop already requested");
            return false;
        }
        info!(?cause, "stop requested");
        self.phase = ShutdownPhase::StopRequested;
        self.cause = Some(cause);
        true
    }

    /// Tear the session down and wait for it to finish.
    ///
    /// Resumes from whatever phase the sequencer is in; a `Running` sequencer
    /// is stopped first. Returns once the phase is `Terminated`.
    pub async fn shutdown<S>(&mut self, session: &S)
    where
        S: SeedingSession + ?Sized,
    {
        loop {
            match self.phase {
                ShutdownPhase::Running => {
                    self.request_stop(StopCause::EndOfInput);
                }
                ShutdownPhase::StopRequested => {
                    if let Err(err) = session.request_shutdown().await {
                        warn!(error = ?err, "engine shutdown request failed");
                    }
                    self.phase = ShutdownPhase::EngineShuttingDown;
                    info!("waiting for session engine shutdown");
                }
                ShutdownPhase::EngineShuttingDown => {
                    while !session.is_shutdown_complete() {
                        sleep(self.timing.poll_interval).await;
                    }
                    sleep(self.timing.settle_delay).await;
                    self.phase = ShutdownPhase::Terminated;
                    info!("session engine shutdown complete");
                }
                ShutdownPhase::Terminated => return,
            }
        }
    }
}

/// Read `reader` on a detached thread until it closes or fails.
///
/// The receiver yields the resulting cause. It reports an error if the thread
/// could not be started or ended without sending.
pub fn watch_input<R>(reader: R) -> oneshot::Receiver<StopCause>
where
    R: Read + Send + 'static,
{
    let (sender, receiver) = oneshot::channel();
    let spawned = thread::Builder::new()
        .name("dirseeder-input".to_string())
        .spawn(move || {
            let _ = sender.send(drain_until_closed(reader));
        });
    if let Err(err) = spawned {
        warn!(error = %err, "failed to start input watcher");
    }
    receiver
}

fn drain_until_closed<R: Read>(mut reader: R) -> StopCause {
    let mut buffer = [0_u8; 1024];
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => return StopCause::EndOfInput,
            Ok(read) => debug!(bytes = read, "ignoring standard input"),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => {
                warn!(error = %err, "standard input read failed");
                return StopCause::InputError;
            }
        }
    }
}

/// Resolve once `reader` closes or fails; any data read is ignored.
pub async fn wait_for_stop_signal<R>(reader: R) -> StopCause
where
    R: Read + Send + 'static,
{
    watch_input(reader).await.unwrap_or_else(|_| {
        warn!("input watcher ended without a result");
        StopCause::InputError
    })
}

/// Resolve on the first interrupt signal. Never resolves when the handler
/// cannot be installed.
pub async fn wait_for_interrupt() -> StopCause {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "interrupt handler unavailable");
        std::future::pending::<()>().await;
    }
    StopCause::Interrupt
}

/// Whichever of `input` and `interrupt` resolves first.
pub async fn first_stop_cause<I, T>(input: I, interrupt: T) -> StopCause
where
    I: Future<Output = StopCause>,
    T: Future<Output = StopCause>,
{
    tokio::select! {
        cause = input => cause,
        cause = interrupt => cause,
    }
}

/// Whichever of input closure and interrupt happens first.
pub async fn wait_for_stop_or_interrupt<R>(reader: R) -> StopCause
where
    R: Read + Send + 'static,
{
    first_stop_cause(wait_for_stop_signal(reader), wait_for_interrupt()).await
}
