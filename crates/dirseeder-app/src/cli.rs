//! Command-line surface of the `dirseeder` binary.

use std::env;
use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::{DEFAULT_LISTEN_PORT, DEFAULT_UPLOAD_LIMIT_KIB, RunConfig};
use crate::error::{AppError, AppResult};

/// Seed every `.torrent` descriptor in DIRECTORY from one shared session.
#[derive(Debug, Parser)]
#[command(name = "dirseeder", version, about, disable_version_flag = true)]
pub struct Cli {
    /// Listen port for the session and its internal tracker.
    #[arg(
        short = 'p',
        long = "port",
        env = "DIRSEEDER_PORT",
        default_value_t = DEFAULT_LISTEN_PORT,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub port: u16,
    /// Directory holding payloads and the session state (defaults to the
    /// current directory).
    #[arg(short = 'o', long = "output-dir", env = "DIRSEEDER_OUTPUT_DIR", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
    /// Upload cap applied to every task, in KiB/s.
    #[arg(
        long = "upload-limit",
        value_name = "KIB_PER_SEC",
        default_value_t = DEFAULT_UPLOAD_LIMIT_KIB,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub upload_limit: u32,
    /// Print version information.
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    pub version: Option<bool>,
    /// Directory scanned for descriptors (defaults to the current directory).
    #[arg(value_name = "DIRECTORY")]
    pub directory: Option<PathBuf>,
}

impl Cli {
    /// Resolve defaults and build the run configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] when a default requires the current directory
    /// and it cannot be determined.
    pub fn into_run_config(self) -> AppResult<RunConfig> {
        let cwd = || env::current_dir().map_err(|err| AppError::io("cli.current_dir", None, err));
        let output_dir = match self.output_dir {
            Some(dir) => dir,
            None => cwd()?,
        };
        let descriptor_dir = match self.directory {
            Some(dir) => dir,
            None => cwd()?,
        };

        let mut config = RunConfig::new(output_dir, descriptor_dir);
        config.listen_port = self.port;
        config.upload_limit_kib = self.upload_limit;
        Ok(config)
    }
}
