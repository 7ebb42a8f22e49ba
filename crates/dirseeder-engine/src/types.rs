//! Strongly typed inputs accepted by the local engine.

use std::path::{Path, PathBuf};

use crate::error::{EngineError, EngineResult};

/// Directory (beneath the state directory) that holds checkpoint records.
pub const CHECKPOINT_DIR: &str = "checkpoints";

/// Wrapper for boolean flags to avoid pedantic lint churn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Toggle(pub bool);

impl Toggle {
    #[must_use]
    /// Whether the toggle is enabled.
    pub const fn is_enabled(self) -> bool {
        self.0
    }
}

impl From<bool> for Toggle {
    fn from(value: bool) -> Self {
        Self(value)
    }
}

impl From<Toggle> for bool {
    fn from(toggle: Toggle) -> Self {
        toggle.0
    }
}

/// Parameters fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Directory owned by the engine for checkpoints and bookkeeping.
    pub state_dir: PathBuf,
    /// Port the session listens on and the internal tracker is announced at.
    pub listen_port: u16,
    /// Shared piece cache across tasks.
    pub megacache: Toggle,
    /// Peer overlay network.
    pub overlay: Toggle,
    /// Reachability probing.
    pub dialback: Toggle,
    /// Background peer discovery (DHT, PEX, local discovery).
    pub peer_discovery: Toggle,
    /// Built-in tracker that answers announces for registered descriptors.
    pub internal_tracker: Toggle,
}

impl SessionConfig {
    /// Seeding profile: background p2p features off, internal tracker on.
    #[must_use]
    pub fn seeding(state_dir: impl Into<PathBuf>, listen_port: u16) -> Self {
        Self {
            state_dir: state_dir.into(),
            listen_port,
            megacache: Toggle(false),
            overlay: Toggle(false),
            dialback: Toggle(false),
            peer_discovery: Toggle(false),
            internal_tracker: Toggle(true),
        }
    }

    /// Location of checkpoint records.
    #[must_use]
    pub fn checkpoint_dir(&self) -> PathBuf {
        checkpoint_dir(&self.state_dir)
    }

    /// Announce URL served by the internal tracker.
    #[must_use]
    pub fn tracker_url(&self) -> String {
        format!("http://127.0.0.1:{}/announce", self.listen_port)
    }

    /// Reject configurations the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] for a zero listen port or an
    /// empty state directory.
    pub fn validate(&self) -> EngineResult<()> {
        if self.listen_port == 0 {
            return Err(EngineError::InvalidConfig {
                field: "listen_port",
                reason: "must be non-zero",
            });
        }
        if self.state_dir.as_os_str().is_empty() {
            return Err(EngineError::InvalidConfig {
                field: "state_dir",
                reason: "must not be empty",
            });
        }
        Ok(())
    }

    /// Enabled toggles this engine has no implementation for.
    #[must_use]
    pub fn unsupported_features(&self) -> Vec<&'static str> {
        [
            ("megacache", self.megacache),
            ("overlay", self.overlay),
            ("dialback", self.dialback),
            ("peer_discovery", self.peer_discovery),
        ]
        .into_iter()
        .filter(|(_, toggle)| toggle.is_enabled())
        .map(|(name, _)| name)
        .collect()
    }
}

pub(crate) fn checkpoint_dir(state_dir: &Path) -> PathBuf {
    state_dir.join(CHECKPOINT_DIR)
}
