//! On-disk payload verification by file length.

use std::fs;
use std::path::Path;

use dirseeder_core::{Descriptor, TaskState};

/// Outcome of inspecting a task's payload.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PayloadProbe {
    pub(crate) state: TaskState,
    pub(crate) progress: f64,
    pub(crate) error: Option<String>,
}

/// Inspect the payload of `descriptor` beneath `destination`.
///
/// A file counts as present only when it is a regular file whose length
/// matches the descriptor.
pub(crate) fn probe_payload(descriptor: &Descriptor, destination: &Path) -> PayloadProbe {
    if !destination.is_dir() {
        return PayloadProbe {
            state: TaskState::Error,
            progress: 0.0,
            error: Some(format!(
                "destination directory {} is missing",
                destination.display()
            )),
        };
    }

    let mut present_bytes = 0_u64;
    let mut complete = true;
    for file in &descriptor.files {
        let matches = fs::metadata(destination.join(&file.path))
            .is_ok_and(|meta| meta.is_file() && meta.len() == file.length);
        if matches {
            present_bytes += file.length;
        } else {
            complete = false;
        }
    }

    let total = descriptor.total_size();
    let progress = if total == 0 {
        if complete { 1.0 } else { 0.0 }
    } else {
        ratio(present_bytes, total)
    };

    PayloadProbe {
        state: if complete {
            TaskState::Seeding
        } else {
            TaskState::Downloading
        },
        progress,
        error: None,
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "progress is a display fraction; precision loss above 2^53 bytes is acceptable"
)]
fn ratio(part: u64, whole: u64) -> f64 {
    part as f64 / whole as f64
}
