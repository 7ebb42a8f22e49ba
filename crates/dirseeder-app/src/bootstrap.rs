//! Process wiring: logging, configuration, engine, and the seeding run.

use std::io::{self, Write};

use dirseeder_core::MetainfoLoader;
use dirseeder_engine::LocalEngine;
use dirseeder_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig};
use tracing::{info, warn};

use crate::cli::Cli;
use crate::error::{AppError, AppResult};
use crate::orchestrator::SeedingOrchestrator;
use crate::shutdown::{StopCause, wait_for_stop_or_interrupt};

/// Line telling the operator how to end the run.
pub const STOP_PROMPT: &str = "Close standard input (Ctrl-D) or press Ctrl-C to stop seeding";

/// Boot the application from parsed arguments and block until the run ends.
///
/// # Errors
///
/// Returns an [`AppError`] when logging cannot be installed, the configuration
/// is invalid, the engine cannot be constructed, or the descriptor directory
/// cannot be listed.
pub async fn run_app(cli: Cli) -> AppResult<()> {
    let format =
        LogFormat::from_env().map_err(|err| AppError::telemetry("telemetry.log_format", err))?;
    let logging = LoggingConfig {
        format,
        ..LoggingConfig::default()
    };
    dirseeder_telemetry::init_logging(&logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("seeding");

    let config = cli.into_run_config()?;
    config.validate()?;
    info!(
        port = config.listen_port,
        output_dir = %config.output_dir.display(),
        descriptor_dir = %config.descriptor_dir.display(),
        upload_limit_kib = config.upload_limit_kib,
        "dirseeder starting"
    );

    let engine = LocalEngine::new(config.session_config())
        .map_err(|err| AppError::engine("engine.new", err))?;

    let summary = SeedingOrchestrator::new(&config)
        .run(&engine, &MetainfoLoader, stop_signal())
        .await?;

    info!(
        restored = summary.restored,
        started = summary.report.started,
        duplicates = summary.report.duplicates,
        stop_cause = ?summary.stop_cause,
        "dirseeder finished"
    );
    Ok(())
}

async fn stop_signal() -> StopCause {
    if let Err(err) = writeln!(io::stderr(), "{STOP_PROMPT}") {
        warn!(error = %err, "failed to print stop prompt");
    }
    wait_for_stop_or_interrupt(io::stdin()).await
}
