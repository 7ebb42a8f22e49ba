//! # Design
//!
//! - Keep error messages constant; store operational context in fields.
//! - Convert into [`TaskError`] only at the session trait boundary.

use std::error::Error;
use std::io;
use std::path::PathBuf;

use dirseeder_core::{InfoHash, TaskError};
use thiserror::Error;

/// Internal error details raised by the local engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The state directory could not be created.
    #[error("failed to prepare state directory")]
    StateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A session configuration value was rejected.
    #[error("invalid session configuration")]
    InvalidConfig {
        /// Offending field.
        field: &'static str,
        /// Static reason describing the invalid value.
        reason: &'static str,
    },
    /// A checkpoint store IO operation failed.
    #[error("checkpoint store IO failure")]
    CheckpointIo {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A checkpoint record could not be encoded or decoded.
    #[error("checkpoint store parse failure")]
    CheckpointParse {
        /// Operation that triggered the parse failure.
        operation: &'static str,
        /// Path involved in the parse failure.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience alias for engine-internal results.
pub type EngineResult<T> = Result<T, EngineError>;

/// Build a task error with structured operation context.
pub fn op_failed(
    operation: &'static str,
    info_hash: Option<InfoHash>,
    source: impl Error + Send + Sync + 'static,
) -> TaskError {
    TaskError::OperationFailed {
        operation,
        info_hash,
        source: Box::new(source),
    }
}
