//! Run configuration assembled once at startup.

use std::path::PathBuf;
use std::time::Duration;

use dirseeder_core::{DEFAULT_STATUS_INTERVAL, RateCaps};
use dirseeder_engine::SessionConfig;

use crate::error::{AppError, AppResult};
use crate::shutdown::ShutdownTiming;

/// Port used when none is supplied.
pub const DEFAULT_LISTEN_PORT: u16 = 6969;
/// Upload cap (KiB/s) applied to every task when none is supplied.
pub const DEFAULT_UPLOAD_LIMIT_KIB: u32 = 256;
/// Name of the engine state directory created inside the output directory.
pub const STATE_DIR_NAME: &str = ".dirseeder";

/// Immutable settings for one seeding run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Port the session listens on.
    pub listen_port: u16,
    /// Directory payloads are read from; also hosts the state directory.
    pub output_dir: PathBuf,
    /// Directory scanned for descriptor files.
    pub descriptor_dir: PathBuf,
    /// Upload cap applied to every task, in KiB/s.
    pub upload_limit_kib: u32,
    /// Cadence of status lines.
    pub status_interval: Duration,
    /// Shutdown polling cadence and settle delay.
    pub shutdown: ShutdownTiming,
}

impl RunConfig {
    /// Configuration with default port, upload cap, and timings.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>, descriptor_dir: impl Into<PathBuf>) -> Self {
        Self {
            listen_port: DEFAULT_LISTEN_PORT,
            output_dir: output_dir.into(),
            descriptor_dir: descriptor_dir.into(),
            upload_limit_kib: DEFAULT_UPLOAD_LIMIT_KIB,
            status_interval: DEFAULT_STATUS_INTERVAL,
            shutdown: ShutdownTiming::default(),
        }
    }

    /// Reject values the run cannot start with.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidConfig`] for a zero port or zero upload cap.
    pub fn validate(&self) -> AppResult<()> {
        if self.listen_port == 0 {
            return Err(AppError::InvalidConfig {
                field: "listen_port",
                reason: "must be non-zero",
                value: Some(self.listen_port.to_string()),
            });
        }
        if self.upload_limit_kib == 0 {
            return Err(AppError::InvalidConfig {
                field: "upload_limit",
                reason: "must be non-zero",
                value: Some(self.upload_limit_kib.to_string()),
            });
        }
        Ok(())
    }

    /// Engine-owned state directory.
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.output_dir.join(STATE_DIR_NAME)
    }

    /// Session profile for a seeding run: p2p background features off,
    /// internal tracker on.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::seeding(self.state_dir(), self.listen_port)
    }

    /// Caps applied to each task: fixed upload cap, unlimited download.
    #[must_use]
    pub const fn rate_caps(&self) -> RateCaps {
        RateCaps::upload_only(self.upload_limit_kib)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_seeding_profile() {
        let config = RunConfig::new("/data", "/seeds");
        assert!(config.validate().is_ok());
        assert_eq!(config.state_dir(), PathBuf::from("/data/.dirseeder"));
        assert_eq!(config.rate_caps(), RateCaps::upload_only(256));

        let session = config.session_config();
        assert_eq!(session.listen_port, 6969);
        assert_eq!(session.state_dir, PathBuf::from("/data/.dirseeder"));
        assert!(session.internal_tracker.is_enabled());
        assert!(session.unsupported_features().is_empty());
    }

    #[test]
    fn validation_rejects_zero_values() {
        let mut config = RunConfig::new("/data", "/seeds");
        config.upload_limit_kib = 0;
        assert!(matches!(
            config.validate(),
            Err(AppError::InvalidConfig {
                field: "upload_limit",
                ..
            })
        ));

        let mut config = RunConfig::new("/data", "/seeds");
        config.listen_port = 0;
        assert!(matches!(
            config.validate(),
            Err(AppError::InvalidConfig {
                field: "listen_port",
                ..
            })
        ));
    }
}
