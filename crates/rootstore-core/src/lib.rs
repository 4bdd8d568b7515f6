//! # Rootstore Core
//!
//! A registry of Merkle roots keyed by batch identifier.
//!
//! Each entry records a root and free-form metadata. Writes are gated by
//! role (an operational admin submits, updates and locks; an upgrade admin
//! swaps the logic). Under the time-locked schema metadata stays mutable
//! until the entry's lock time, then freezes for good.
//!
//! ## Layout
//!
//! - [`registry`]: the stable address callers hold on to.
//! - [`logic`]: versioned business rules behind the [`RegistryLogic`] trait.
//! - [`storage`]: the durable entry map behind the [`RegistryStorage`] trait.
//! - [`access`]: role membership.
//!
//! ## Determinism
//!
//! No `HashMap`, no floats, no wall-clock reads outside [`SystemClock`].

pub mod access;
pub mod clock;
pub mod entry;
pub mod error;
pub mod event;
pub mod logic;
pub mod primitives;
pub mod registry;
pub mod storage;

pub use access::{AccessControl, Role};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{EntryRecord, EntryTerms};
pub use error::{RegistryError, RegistryResult, StorageError};
pub use event::{JournalRecord, RegistryEvent};
pub use logic::{Call, LogicV1, LogicV2, LogicVersion, RegistryLogic, Submission};
pub use primitives::{BatchId, MerkleRoot, ParseIdError, Principal, Timestamp};
pub use registry::Registry;
pub use storage::{MemoryStore, ProxyState, PutOutcome, RedbStore, RegistryStorage};
