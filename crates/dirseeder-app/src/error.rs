//! # Design
//!
//! - Centralize application-level errors for bootstrap and orchestration.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use std::error::Error;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Optional path involved in the failure.
        path: Option<PathBuf>,
        /// Source IO error.
        #[source]
        source: io::Error,
    },
    /// Session engine construction or control failed.
    #[error("session engine operation failed")]
    Engine {
        /// Operation identifier.
        operation: &'static str,
        /// Source engine error.
        #[source]
        source: dirseeder_engine::EngineError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        #[source]
        source: dirseeder_telemetry::TelemetryError,
    },
    /// Configuration values were invalid.
    #[error("invalid configuration")]
    InvalidConfig {
        /// Field name that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Optional value associated with the failure.
        value: Option<String>,
    },
}

impl AppError {
    pub(crate) fn io(
        operation: &'static str,
        path: Option<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::Io {
            operation,
            path,
            source,
        }
    }

    pub(crate) const fn engine(
        operation: &'static str,
        source: dirseeder_engine::EngineError,
    ) -> Self {
        Self::Engine { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: dirseeder_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    /// Process exit code for the failure: 2 for invalid input, 1 otherwise.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidConfig { .. } => 2,
            Self::Io { .. } | Self::Engine { .. } | Self::Telemetry { .. } => 1,
        }
    }

    /// Single-line rendering of the error and every source beneath it.
    #[must_use]
    pub fn display_message(&self) -> String {
        let mut message = match self {
            Self::Io {
                operation,
                path: Some(path),
                ..
            } => format!("{self} ({operation}: {})", path.display()),
            Self::Io { operation, .. }
            | Self::Engine { operation, .. }
            | Self::Telemetry { operation, .. } => format!("{self} ({operation})"),
            Self::InvalidConfig {
                field,
                reason,
                value,
            } => match value {
                Some(value) => format!("{self}: {field} {reason} (got {value})"),
                None => format!("{self}: {field} {reason}"),
            },
        };
        let mut source = self.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_error_helpers_build_variants() {
        let io_err = AppError::io(
            "scanner.read_dir",
            Some(PathBuf::from("/seeds")),
            io::Error::other("denied"),
        );
        assert!(matches!(io_err, AppError::Io { path: Some(_), .. }));
        assert_eq!(io_err.exit_code(), 1);

        let engine = AppError::engine(
            "engine.new",
            dirseeder_engine::EngineError::InvalidConfig {
                field: "listen_port",
                reason: "must be non-zero",
            },
        );
        assert!(matches!(engine, AppError::Engine { .. }));

        let telemetry = AppError::telemetry(
            "telemetry.log_format",
            dirseeder_telemetry::TelemetryError::InvalidLogFormat {
                value: "xml".to_string(),
            },
        );
        assert!(matches!(telemetry, AppError::Telemetry { .. }));

        let invalid = AppError::InvalidConfig {
            field: "upload_limit",
            reason: "must be non-zero",
            value: Some("0".to_string()),
        };
        assert_eq!(invalid.exit_code(), 2);
    }

    #[test]
    fn display_message_includes_context_and_sources() {
        let err = AppError::io(
            "scanner.read_dir",
            Some(PathBuf::from("/seeds")),
            io::Error::other("permission denied"),
        );
        assert_eq!(
            err.display_message(),
            "io operation failed (scanner.read_dir: /seeds): permission denied"
        );

        let invalid = AppError::InvalidConfig {
            field: "upload_limit",
            reason: "must be non-zero",
            value: None,
        };
        assert_eq!(
            invalid.display_message(),
            "invalid configuration: upload_limit must be non-zero"
        );
    }
}
