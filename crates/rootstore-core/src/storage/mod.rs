//! # Storage Module
//!
//! The durable keyed collection of entries. Pure data access: no
//! authorization, no business rules.
//!
//! A registry owns exactly one storage instance for its whole lifetime.
//! Logic versions come and go; they all read and write through the same
//! [`RegistryStorage`] handle, so a swap never migrates or re-keys data.
//!
//! Two implementations:
//! - [`MemoryStore`]: `BTreeMap`-backed, for tests and ephemeral runs.
//! - [`RedbStore`]: redb embedded database (ACID transactions, crash-safe
//!   copy-on-write B-trees, exclusive file lock).

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::entry::EntryRecord;
use crate::error::StorageError;
use crate::event::{JournalRecord, RegistryEvent};
use crate::logic::LogicVersion;
use crate::primitives::{BatchId, Principal, Timestamp};
use serde::{Deserialize, Serialize};

// =============================================================================
// REGISTRYSTORAGE TRAIT
// =============================================================================

/// Persistence contract shared by every logic version.
///
/// Each mutating method is one atomic step: either everything it describes
/// is persisted or nothing is.
pub trait RegistryStorage: Send + Sync {
    /// Read the entry stored under `idx`.
    fn get(&self, idx: &BatchId) -> Result<Option<EntryRecord>, StorageError>;

    /// Number of distinct keys ever written. Never decreases.
    fn count(&self) -> Result<u64, StorageError>;

    /// Insert or overwrite the entry under `idx` and append `event` to the
    /// journal. The count grows only when `idx` is new.
    fn put(
        &mut self,
        idx: BatchId,
        record: &EntryRecord,
        at: Timestamp,
        event: &RegistryEvent,
    ) -> Result<PutOutcome, StorageError>;

    /// The journal, in sequence order.
    fn events(&self) -> Result<Vec<JournalRecord>, StorageError>;

    /// The stable address's own slot: roles and active logic.
    fn proxy_state(&self) -> Result<Option<ProxyState>, StorageError>;

    /// Replace the proxy slot, journaling `event` in the same step.
    fn set_proxy_state(
        &mut self,
        state: &ProxyState,
        event: Option<(Timestamp, &RegistryEvent)>,
    ) -> Result<(), StorageError>;
}

/// Whether a `put` created a key or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Inserted,
    Replaced,
}

/// Deployment record of the stable address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyState {
    /// Identity of the stable address itself.
    pub address: Principal,
    pub upgrade_admin: Principal,
    pub operational_admin: Principal,
    pub active: LogicVersion,
}
