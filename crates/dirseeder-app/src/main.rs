#![forbid(unsafe_code)]
#![warn(
    unused,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! Binary entrypoint that seeds every descriptor in a directory.

use std::process::ExitCode;

use clap::Parser;
use dirseeder_app::{Cli, run_app};

/// Parses arguments, runs until stopped, and maps failures to exit codes.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run_app(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            ExitCode::from(err.exit_code())
        }
    }
}
