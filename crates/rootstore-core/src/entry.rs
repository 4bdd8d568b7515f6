//! # Entry Model
//!
//! One record per batch key. The variant persisted for a key is its schema
//! generation and decides which fields exist, whichever logic version later
//! reads it.

use crate::primitives::{MerkleRoot, Timestamp};
use serde::{Deserialize, Serialize};

/// Generation-specific terms supplied at submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryTerms {
    /// Metadata stays mutable while `now < lock_at`.
    LockAt(Timestamp),
    /// External pointer to the batch data file. No lock window.
    DataRef(String),
}

impl EntryTerms {
    /// Name of the schema generation these terms belong to.
    #[must_use]
    pub const fn schema(&self) -> &'static str {
        match self {
            EntryTerms::LockAt(_) => EntryRecord::TIME_LOCKED,
            EntryTerms::DataRef(_) => EntryRecord::REFERENCED,
        }
    }
}

/// A stored registry entry.
///
/// `merkle_root` is write-once in both generations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryRecord {
    /// Written by logic 2.0.0.
    TimeLocked {
        merkle_root: MerkleRoot,
        metadata: String,
        lock_at: Timestamp,
    },
    /// Written by logic 1.0.0.
    Referenced {
        merkle_root: MerkleRoot,
        metadata: String,
        data_ref: String,
    },
}

impl EntryRecord {
    /// Schema name of [`EntryRecord::TimeLocked`].
    pub const TIME_LOCKED: &'static str = "time_locked";
    /// Schema name of [`EntryRecord::Referenced`].
    pub const REFERENCED: &'static str = "referenced";

    /// Build a record from submitted terms.
    #[must_use]
    pub fn from_terms(merkle_root: MerkleRoot, metadata: String, terms: EntryTerms) -> Self {
        match terms {
            EntryTerms::LockAt(lock_at) => EntryRecord::TimeLocked {
                merkle_root,
                metadata,
                lock_at,
            },
            EntryTerms::DataRef(data_ref) => EntryRecord::Referenced {
                merkle_root,
                metadata,
                data_ref,
            },
        }
    }

    /// The committed root.
    #[must_use]
    pub fn merkle_root(&self) -> MerkleRoot {
        match self {
            EntryRecord::TimeLocked { merkle_root, .. }
            | EntryRecord::Referenced { merkle_root, .. } => *merkle_root,
        }
    }

    /// Current metadata.
    #[must_use]
    pub fn metadata(&self) -> &str {
        match self {
            EntryRecord::TimeLocked { metadata, .. } | EntryRecord::Referenced { metadata, .. } => {
                metadata
            }
        }
    }

    /// Lock time, for time-locked entries.
    #[must_use]
    pub fn lock_at(&self) -> Option<Timestamp> {
        match self {
            EntryRecord::TimeLocked { lock_at, .. } => Some(*lock_at),
            EntryRecord::Referenced { .. } => None,
        }
    }

    /// Data reference, for referenced entries.
    #[must_use]
    pub fn data_ref(&self) -> Option<&str> {
        match self {
            EntryRecord::TimeLocked { .. } => None,
            EntryRecord::Referenced { data_ref, .. } => Some(data_ref),
        }
    }

    /// Schema generation name.
    #[must_use]
    pub const fn schema(&self) -> &'static str {
        match self {
            EntryRecord::TimeLocked { .. } => Self::TIME_LOCKED,
            EntryRecord::Referenced { .. } => Self::REFERENCED,
        }
    }

    /// Is the metadata frozen at `now`?
    ///
    /// Time-locked entries freeze once `now >= lock_at`. Referenced entries
    /// carry no lock window and are always frozen.
    #[must_use]
    pub fn is_frozen_at(&self, now: Timestamp) -> bool {
        match self {
            EntryRecord::TimeLocked { lock_at, .. } => now >= *lock_at,
            EntryRecord::Referenced { .. } => true,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn time_locked(lock_at: u64) -> EntryRecord {
        EntryRecord::from_terms(
            MerkleRoot::digest(b"root"),
            "{}".to_string(),
            EntryTerms::LockAt(Timestamp::from_secs(lock_at)),
        )
    }

    #[test]
    fn lock_boundary_is_inclusive() {
        let record = time_locked(100);

        assert!(!record.is_frozen_at(Timestamp::from_secs(99)));
        assert!(record.is_frozen_at(Timestamp::from_secs(100)));
        assert!(record.is_frozen_at(Timestamp::from_secs(101)));
    }

    #[test]
    fn referenced_entries_are_always_frozen() {
        let record = EntryRecord::from_terms(
            MerkleRoot::digest(b"root"),
            "{}".to_string(),
            EntryTerms::DataRef("https://example.com/datafile".to_string()),
        );

        assert!(record.is_frozen_at(Timestamp::from_secs(0)));
        assert_eq!(record.lock_at(), None);
        assert_eq!(record.data_ref(), Some("https://example.com/datafile"));
    }

    #[test]
    fn schema_follows_terms() {
        let terms = EntryTerms::LockAt(Timestamp::from_secs(1));
        let record = EntryRecord::from_terms(MerkleRoot::default(), String::new(), terms.clone());
        assert_eq!(record.schema(), terms.schema());
        assert_eq!(record.data_ref(), None);
    }
}
