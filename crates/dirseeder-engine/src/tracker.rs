//! Internal tracker registry.
//!
//! Holds the identities the session answers announces for. Registration is
//! idempotent and refused while the tracker is disabled.

use std::collections::BTreeSet;

use dirseeder_core::{InfoHash, TaskError, TaskResult};

#[derive(Debug)]
pub(crate) struct TrackerRegistry {
    enabled: bool,
    announce_url: String,
    entries: BTreeSet<InfoHash>,
}

impl TrackerRegistry {
    pub(crate) const fn new(enabled: bool, announce_url: String) -> Self {
        Self {
            enabled,
            announce_url,
            entries: BTreeSet::new(),
        }
    }

    pub(crate) const fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn announce_url(&self) -> &str {
        &self.announce_url
    }

    /// Returns `true` when the identity was not registered before.
    pub(crate) fn register(&mut self, info_hash: InfoHash) -> TaskResult<bool> {
        if !self.enabled {
            return Err(TaskError::TrackerDisabled { info_hash });
        }
        Ok(self.entries.insert(info_hash))
    }

    pub(crate) fn contains(&self, info_hash: &InfoHash) -> bool {
        self.entries.contains(info_hash)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
