//! Descriptor discovery in a single directory.

use std::fs;
use std::path::{Path, PathBuf};

use dirseeder_core::DESCRIPTOR_SUFFIX;
use tracing::{debug, trace, warn};

use crate::error::{AppError, AppResult};

/// List the descriptor files directly inside `dir`.
///
/// Only regular files (symlinks are followed) whose name ends with the
/// descriptor suffix are returned; nothing is recursed into. Entries that
/// cannot be inspected are logged and skipped. Order is unspecified.
///
/// # Errors
///
/// Returns [`AppError::Io`] when `dir` itself cannot be listed.
pub fn scan_descriptors(dir: &Path) -> AppResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .map_err(|err| AppError::io("scanner.read_dir", Some(dir.to_path_buf()), err))?;

    let mut found = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, dir = %dir.display(), "skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();
        let has_suffix = entry
            .file_name()
            .as_encoded_bytes()
            .ends_with(DESCRIPTOR_SUFFIX.as_bytes());
        if !has_suffix {
            trace!(path = %path.display(), "ignoring non-descriptor entry");
            continue;
        }
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => found.push(path),
            Ok(_) => trace!(path = %path.display(), "ignoring non-file descriptor entry"),
            Err(err) => {
                warn!(error = %err, path = %path.display(), "skipping unreadable descriptor entry");
            }
        }
    }

    debug!(dir = %dir.display(), count = found.len(), "descriptor scan completed");
    Ok(found)
}
