//! Core seeding domain types shared across the workspace.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use uuid::Uuid;

/// Default cadence at which the engine reports task snapshots.
pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_secs(1);

/// SHA-1 digest of a descriptor's raw `info` dictionary; the identity of a task.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InfoHash([u8; 20]);

impl InfoHash {
    /// Wrap a raw 20-byte digest.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parse a 40 character hexadecimal rendering (either case).
    #[must_use]
    pub fn from_hex(value: &str) -> Option<Self> {
        let raw = value.as_bytes();
        if raw.len() != 40 {
            return None;
        }
        let mut bytes = [0_u8; 20];
        for (slot, pair) in bytes.iter_mut().zip(raw.chunks_exact(2)) {
            let high = hex_nibble(pair[0])?;
            let low = hex_nibble(pair[1])?;
            *slot = (high << 4) | low;
        }
        Some(Self(bytes))
    }
}

const fn hex_nibble(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(formatter, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for InfoHash {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "InfoHash({self})")
    }
}

impl Serialize for InfoHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for InfoHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::from_hex(&value)
            .ok_or_else(|| de::Error::custom("info hash must be 40 hexadecimal characters"))
    }
}

/// A single payload file described by a descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DescriptorFile {
    /// Path relative to the destination directory (already prefixed with the
    /// descriptor name for multi-file payloads).
    pub path: PathBuf,
    /// Expected length in bytes.
    pub length: u64,
}

/// Immutable, loaded torrent descriptor.
///
/// Built once per descriptor file and moved into the session engine when the
/// corresponding task is started.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Descriptor {
    /// File the descriptor was loaded from.
    pub source: PathBuf,
    /// Suggested payload name.
    pub name: String,
    /// Identity of the content.
    pub info_hash: InfoHash,
    /// Tracker URLs advertised by the descriptor, primary first.
    #[serde(default)]
    pub trackers: Vec<String>,
    /// Bytes per piece.
    pub piece_length: u64,
    /// Payload files in descriptor order.
    pub files: Vec<DescriptorFile>,
    /// Whether the payload is a single file rather than a directory.
    pub single_file: bool,
    /// Private flag; peers must only be obtained from trackers.
    #[serde(default)]
    pub private: bool,
}

impl Descriptor {
    /// Sum of all payload file lengths.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|file| file.length).sum()
    }

    /// Location of the payload root beneath `destination`.
    #[must_use]
    pub fn payload_root(&self, destination: &Path) -> PathBuf {
        destination.join(&self.name)
    }
}

/// Opaque handle returned when the engine admits a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    id: Uuid,
    info_hash: InfoHash,
}

impl TaskHandle {
    /// Construct a handle; engines call this when admitting a task.
    #[must_use]
    pub const fn new(id: Uuid, info_hash: InfoHash) -> Self {
        Self { id, info_hash }
    }

    /// Engine-assigned task identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Identity of the descriptor the task was created from.
    #[must_use]
    pub const fn info_hash(&self) -> InfoHash {
        self.info_hash
    }
}

/// Lifecycle state of an engine task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Admitted but not yet checked.
    #[default]
    Queued,
    /// Payload incomplete; the task is fetching data.
    Downloading,
    /// Payload complete; the task is serving data.
    Seeding,
    /// Task halted (session shutdown or explicit stop).
    Stopped,
    /// Task failed; the snapshot carries the error text.
    Error,
}

impl TaskState {
    /// Stable lowercase label used in status output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Downloading => "downloading",
            Self::Seeding => "seeding",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Instantaneous transfer throughput.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TaskRates {
    /// Current upload rate in bytes per second.
    pub upload_bps: u64,
    /// Current download rate in bytes per second.
    pub download_bps: u64,
}

impl TaskRates {
    /// Upload rate in KiB per second.
    #[must_use]
    pub fn upload_kib_per_sec(&self) -> f64 {
        to_f64(self.upload_bps) / 1024.0
    }

    /// Download rate in KiB per second.
    #[must_use]
    pub fn download_kib_per_sec(&self) -> f64 {
        to_f64(self.download_bps) / 1024.0
    }
}

const fn to_f64(value: u64) -> f64 {
    #[expect(
        clippy::cast_precision_loss,
        reason = "u64 to f64 conversion is required for user-facing rate reporting"
    )]
    {
        value as f64
    }
}

/// Read-only per-cycle snapshot of a task, delivered through the status callback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatus {
    /// Engine-assigned task identifier.
    pub id: Uuid,
    /// Display name of the task.
    pub name: String,
    /// Current lifecycle state.
    pub state: TaskState,
    /// Completed fraction, nominally within `[0.0, 1.0]`.
    pub progress: f64,
    /// Error text when the engine reports a problem.
    pub error: Option<String>,
    /// Current transfer rates.
    pub rates: TaskRates,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            name: String::new(),
            state: TaskState::Queued,
            progress: 0.0,
            error: None,
            rates: TaskRates::default(),
        }
    }
}

/// Per-direction rate caps applied when a task starts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RateCaps {
    /// Maximum upload rate in KiB per second; `None` means unlimited.
    pub upload_kib_per_sec: Option<u32>,
    /// Maximum download rate in KiB per second; `None` means unlimited.
    pub download_kib_per_sec: Option<u32>,
}

impl RateCaps {
    /// Cap uploads only, leaving downloads unlimited.
    #[must_use]
    pub const fn upload_only(kib_per_sec: u32) -> Self {
        Self {
            upload_kib_per_sec: Some(kib_per_sec),
            download_kib_per_sec: None,
        }
    }
}

/// Value returned by a status callback telling the engine how to continue polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuationRequest {
    /// Delay before the next invocation.
    pub interval: Duration,
    /// Whether the engine should stop invoking the callback.
    pub stop: bool,
}

impl ContinuationRequest {
    /// Request another invocation after `interval`.
    #[must_use]
    pub const fn keep_polling(interval: Duration) -> Self {
        Self {
            interval,
            stop: false,
        }
    }

    /// Request that the engine stop invoking the callback.
    #[must_use]
    pub const fn halt() -> Self {
        Self {
            interval: Duration::ZERO,
            stop: true,
        }
    }
}
