//! Error types for descriptor loading and task orchestration.

use std::error::Error;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::InfoHash;

/// Failure raised while turning a descriptor file into a [`crate::Descriptor`].
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The descriptor file could not be read.
    #[error("failed to read descriptor")]
    Io {
        /// Descriptor path that failed to load.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The descriptor file was read but its contents are not valid metainfo.
    #[error("malformed descriptor")]
    Malformed {
        /// Descriptor path that failed to parse.
        path: PathBuf,
        /// Human-readable description of the defect.
        reason: String,
    },
}

impl DescriptorError {
    /// Path of the descriptor associated with the failure.
    #[must_use]
    pub const fn path(&self) -> &PathBuf {
        match self {
            Self::Io { path, .. } | Self::Malformed { path, .. } => path,
        }
    }
}

/// Primary error type for session engine operations.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A task for this descriptor identity already exists in the session.
    #[error("task already exists")]
    Duplicate {
        /// Identity of the existing task.
        info_hash: InfoHash,
    },
    /// Tracker registration was requested while the internal tracker is off.
    #[error("internal tracker disabled")]
    TrackerDisabled {
        /// Identity that could not be announced.
        info_hash: InfoHash,
    },
    /// The session has shut down and no longer accepts commands.
    #[error("session closed")]
    SessionClosed {
        /// Operation identifier.
        operation: &'static str,
    },
    /// Operation failed in the underlying engine.
    #[error("task operation failed")]
    OperationFailed {
        /// Operation identifier.
        operation: &'static str,
        /// Task identity when available.
        info_hash: Option<InfoHash>,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl TaskError {
    /// Build an [`TaskError::OperationFailed`] from any error source.
    pub fn operation_failed(
        operation: &'static str,
        info_hash: Option<InfoHash>,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self::OperationFailed {
            operation,
            info_hash,
            source: source.into(),
        }
    }

    /// Whether the failure only signals that the task is already tracked.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

/// Convenience alias for session engine results.
pub type TaskResult<T> = Result<T, TaskError>;
