//! # Registry Logic
//!
//! Versioned business rules for submit / update / lock / read.
//!
//! A logic version owns no state. It receives the caller context and the
//! registry's one storage handle on every call, which is what lets the
//! registry swap versions without touching stored data:
//!
//! ```text
//! caller ──► Registry ──► dyn RegistryLogic ──► AccessControl::require
//!                               │
//!                               └──────────► dyn RegistryStorage
//! ```
//!
//! Every mutating entry point authorizes before it reads or writes anything.

mod v1;
mod v2;

pub use v1::LogicV1;
pub use v2::LogicV2;

use crate::access::{AccessControl, Role};
use crate::entry::{EntryRecord, EntryTerms};
use crate::error::{RegistryError, RegistryResult};
use crate::event::RegistryEvent;
use crate::primitives::{BatchId, MerkleRoot, Principal, Timestamp};
use crate::storage::RegistryStorage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// VERSION IDENTIFIERS
// =============================================================================

/// A behaviorally distinct logic generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogicVersion {
    /// Referenced schema: root + metadata + data reference, immutable once
    /// written.
    #[serde(rename = "1.0.0")]
    V1,
    /// Time-locked schema: metadata mutable until `lock_at`.
    #[serde(rename = "2.0.0")]
    V2,
}

impl LogicVersion {
    /// Every known version, oldest first.
    pub const ALL: [LogicVersion; 2] = [LogicVersion::V1, LogicVersion::V2];

    /// The newest version.
    pub const LATEST: LogicVersion = LogicVersion::V2;

    /// Semantic version string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            LogicVersion::V1 => "1.0.0",
            LogicVersion::V2 => "2.0.0",
        }
    }

    /// Build the implementation for this version.
    #[must_use]
    pub fn instantiate(self) -> Box<dyn RegistryLogic> {
        match self {
            LogicVersion::V1 => Box::new(LogicV1),
            LogicVersion::V2 => Box::new(LogicV2),
        }
    }
}

impl fmt::Display for LogicVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicVersion {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('v') {
            "1.0.0" | "1" => Ok(LogicVersion::V1),
            "2.0.0" | "2" => Ok(LogicVersion::V2),
            _ => Err(RegistryError::UnknownVersion(s.to_string())),
        }
    }
}

// =============================================================================
// CALL CONTEXT
// =============================================================================

/// Who is calling, when, and under which role policy.
#[derive(Debug, Clone, Copy)]
pub struct Call<'a> {
    pub caller: Principal,
    pub now: Timestamp,
    pub access: &'a AccessControl,
}

impl Call<'_> {
    /// Reject unless the caller holds `role`.
    pub fn authorize(&self, role: Role) -> RegistryResult<()> {
        self.access.require(role, self.caller)
    }
}

/// A new entry to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub idx: BatchId,
    pub merkle_root: MerkleRoot,
    pub metadata: String,
    pub terms: EntryTerms,
}

impl Submission {
    /// A time-locked submission.
    #[must_use]
    pub fn time_locked(
        idx: BatchId,
        merkle_root: MerkleRoot,
        metadata: impl Into<String>,
        lock_at: Timestamp,
    ) -> Self {
        Self {
            idx,
            merkle_root,
            metadata: metadata.into(),
            terms: EntryTerms::LockAt(lock_at),
        }
    }

    /// A referenced submission.
    #[must_use]
    pub fn referenced(
        idx: BatchId,
        merkle_root: MerkleRoot,
        metadata: impl Into<String>,
        data_ref: impl Into<String>,
    ) -> Self {
        Self {
            idx,
            merkle_root,
            metadata: metadata.into(),
            terms: EntryTerms::DataRef(data_ref.into()),
        }
    }
}

// =============================================================================
// REGISTRYLOGIC TRAIT
// =============================================================================

/// One logic generation. Object safe so the registry can hold
/// `Box<dyn RegistryLogic>` and swap it.
pub trait RegistryLogic: Send + Sync {
    /// Which generation this is.
    fn version(&self) -> LogicVersion;

    /// Create a new entry. Requires [`Role::Operational`].
    fn submit(
        &self,
        call: &Call<'_>,
        storage: &mut dyn RegistryStorage,
        submission: Submission,
    ) -> RegistryResult<RegistryEvent>;

    /// Replace the metadata of an open entry, optionally moving its lock
    /// time. Requires [`Role::Operational`].
    fn update_metadata(
        &self,
        call: &Call<'_>,
        storage: &mut dyn RegistryStorage,
        idx: BatchId,
        metadata: String,
        new_lock_at: Option<Timestamp>,
    ) -> RegistryResult<RegistryEvent>;

    /// Freeze an entry now. Requires [`Role::Operational`].
    fn lock(
        &self,
        call: &Call<'_>,
        storage: &mut dyn RegistryStorage,
        idx: BatchId,
    ) -> RegistryResult<RegistryEvent>;

    /// Read an entry. No authorization. Absent keys fail `NotFound`.
    fn get(&self, storage: &dyn RegistryStorage, idx: &BatchId) -> RegistryResult<EntryRecord> {
        storage.get(idx)?.ok_or(RegistryError::NotFound { idx: *idx })
    }

    /// Number of distinct entries submitted.
    fn count(&self, storage: &dyn RegistryStorage) -> RegistryResult<u64> {
        Ok(storage.count()?)
    }
}

/// Shared create path: reject existing keys, persist, journal.
fn insert_new(
    call: &Call<'_>,
    storage: &mut dyn RegistryStorage,
    submission: Submission,
) -> RegistryResult<RegistryEvent> {
    let Submission {
        idx,
        merkle_root,
        metadata,
        terms,
    } = submission;

    if storage.get(&idx)?.is_some() {
        return Err(RegistryError::AlreadyExists { idx });
    }

    let record = EntryRecord::from_terms(merkle_root, metadata.clone(), terms.clone());
    let event = RegistryEvent::RootSubmitted {
        idx,
        merkle_root,
        terms,
        metadata,
    };
    storage.put(idx, &record, call.now, &event)?;
    Ok(event)
}

/// Shared read path for mutations: the current record or `NotFound`.
fn existing(storage: &dyn RegistryStorage, idx: BatchId) -> RegistryResult<EntryRecord> {
    storage.get(&idx)?.ok_or(RegistryError::NotFound { idx })
}

// =============================================================================
// TESTS
// =============================================================================
