#![forbid(unsafe_code)]
#![warn(
    unused,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! Directory seeding application wiring.
//!
//! Layout: `bootstrap.rs` (process wiring), `orchestrator.rs` (run sequencing),
//! `scanner.rs`, `reconcile.rs`, `status.rs`, `shutdown.rs`.

/// Process bootstrap.
pub mod bootstrap;
/// Command-line parsing.
pub mod cli;
/// Run configuration.
pub mod config;
/// Application error types.
pub mod error;
/// Run sequencing.
pub mod orchestrator;
/// Descriptor-to-task reconciliation.
pub mod reconcile;
/// Descriptor discovery.
pub mod scanner;
/// Stop signals and engine teardown.
pub mod shutdown;
/// Status line rendering.
pub mod status;

#[cfg(test)]
mod testing;

pub use bootstrap::run_app;
pub use cli::Cli;
pub use config::RunConfig;
pub use error::{AppError, AppResult};
pub use orchestrator::{RunSummary, SeedingOrchestrator};
pub use reconcile::{ReconcileReport, Reconciler};
pub use shutdown::{ShutdownPhase, ShutdownSequencer, ShutdownTiming, StopCause};
pub use status::{LineSink, StatusAggregator, StderrSink};
