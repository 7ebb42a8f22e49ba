//! JSON checkpoint records, one file per task, keyed by info hash.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dirseeder_core::{Descriptor, InfoHash, RateCaps, TaskState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

const RECORD_EXTENSION: &str = "json";

/// Everything needed to resume a task in a later session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckpointRecord {
    /// Task identifier assigned when the task was first admitted.
    pub task_id: Uuid,
    /// Descriptor the task was created from.
    pub descriptor: Descriptor,
    /// Directory the payload lives in.
    pub destination: PathBuf,
    /// Rate caps applied at admission.
    pub caps: RateCaps,
    /// Last state observed before the record was written.
    pub state: TaskState,
    /// When the task was first admitted.
    pub added_at: DateTime<Utc>,
}

/// Records recovered from disk plus the entries that could not be parsed.
#[derive(Debug, Default)]
pub struct LoadedCheckpoints {
    /// Successfully decoded records, oldest first.
    pub records: Vec<CheckpointRecord>,
    /// Failures for individual record files.
    pub corrupt: Vec<EngineError>,
}

/// Filesystem-backed checkpoint store.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    root: PathBuf,
}

impl CheckpointStore {
    /// Store rooted at `root`; nothing is touched until first use.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the records.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the store directory when missing.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CheckpointIo`] when the directory cannot be created.
    pub fn ensure_initialized(&self) -> EngineResult<()> {
        fs::create_dir_all(&self.root).map_err(|source| EngineError::CheckpointIo {
            operation: "checkpoint.init",
            path: self.root.clone(),
            source,
        })
    }

    /// Path of the record for `info_hash`.
    #[must_use]
    pub fn record_path(&self, info_hash: InfoHash) -> PathBuf {
        self.root
            .join(format!("{info_hash}.{RECORD_EXTENSION}"))
    }

    /// Persist `record`, replacing any previous record for the same identity.
    ///
    /// # Errors
    ///
    /// Returns an error when the record cannot be encoded or written.
    pub fn write(&self, record: &CheckpointRecord) -> EngineResult<()> {
        let path = self.record_path(record.descriptor.info_hash);
        let serialised =
            serde_json::to_vec_pretty(record).map_err(|source| EngineError::CheckpointParse {
                operation: "checkpoint.serialize",
                path: path.clone(),
                source,
            })?;
        let staging = path.with_extension("tmp");
        fs::write(&staging, serialised).map_err(|source| EngineError::CheckpointIo {
            operation: "checkpoint.write",
            path: staging.clone(),
            source,
        })?;
        fs::rename(&staging, &path).map_err(|source| EngineError::CheckpointIo {
            operation: "checkpoint.rename",
            path,
            source,
        })
    }

    /// Load every record in the store; unreadable records are reported, not fatal.
    ///
    /// A missing store directory yields no records.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CheckpointIo`] when the directory cannot be listed.
    pub fn load_all(&self) -> EngineResult<LoadedCheckpoints> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(LoadedCheckpoints::default());
            }
            Err(source) => {
                return Err(EngineError::CheckpointIo {
                    operation: "checkpoint.read_dir",
                    path: self.root.clone(),
                    source,
                });
            }
        };

        let mut loaded = LoadedCheckpoints::default();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(source) => {
                    loaded.corrupt.push(EngineError::CheckpointIo {
                        operation: "checkpoint.read_entry",
                        path: self.root.clone(),
                        source,
                    });
                    continue;
                }
            };
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            match load_record(&path) {
                Ok(record) => loaded.records.push(record),
                Err(err) => loaded.corrupt.push(err),
            }
        }
        loaded.records.sort_by_key(|record| record.added_at);
        Ok(loaded)
    }
}

fn load_record(path: &Path) -> EngineResult<CheckpointRecord> {
    let raw = fs::read(path).map_err(|source| EngineError::CheckpointIo {
        operation: "checkpoint.read",
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| EngineError::CheckpointParse {
        operation: "checkpoint.parse",
        path: path.to_path_buf(),
        source,
    })
}
