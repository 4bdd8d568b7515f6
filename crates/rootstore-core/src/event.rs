//! # Events
//!
//! The audit trail. Every successful write produces exactly one event,
//! journaled in the same step as the write itself.

use crate::entry::EntryTerms;
use crate::logic::LogicVersion;
use crate::primitives::{BatchId, MerkleRoot, Timestamp};
use serde::{Deserialize, Serialize};

/// Something that happened to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryEvent {
    /// A new entry was created.
    RootSubmitted {
        idx: BatchId,
        merkle_root: MerkleRoot,
        terms: EntryTerms,
        metadata: String,
    },

    /// Metadata or lock time of an entry changed (update or lock).
    MetadataModified {
        idx: BatchId,
        lock_at: Timestamp,
        metadata: String,
    },

    /// The active logic implementation was swapped.
    LogicUpgraded { from: LogicVersion, to: LogicVersion },
}

impl RegistryEvent {
    /// Short event name, for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            RegistryEvent::RootSubmitted { .. } => "root_submitted",
            RegistryEvent::MetadataModified { .. } => "metadata_modified",
            RegistryEvent::LogicUpgraded { .. } => "logic_upgraded",
        }
    }

    /// The entry this event concerns, if any.
    #[must_use]
    pub fn idx(&self) -> Option<BatchId> {
        match self {
            RegistryEvent::RootSubmitted { idx, .. } | RegistryEvent::MetadataModified { idx, .. } => {
                Some(*idx)
            }
            RegistryEvent::LogicUpgraded { .. } => None,
        }
    }
}

/// A journaled event with its position and time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    /// Position in the journal, starting at 0.
    pub sequence: u64,
    /// Clock reading of the call that produced the event.
    pub at: Timestamp,
    pub event: RegistryEvent,
}
