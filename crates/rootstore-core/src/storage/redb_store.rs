//! redb-backed storage.
//!
//! Records are postcard-encoded. Every mutating call is a single write
//! transaction covering the entry, the counters and the journal, so a crash
//! leaves either all of it or none of it on disk.

use super::{ProxyState, PutOutcome, RegistryStorage};
use crate::entry::EntryRecord;
use crate::error::StorageError;
use crate::event::{JournalRecord, RegistryEvent};
use crate::primitives::{BatchId, Timestamp};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// idx bytes -> postcard(EntryRecord)
const ENTRIES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("entries");

/// Counter name -> value
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

/// sequence -> postcard(StoredEvent)
const JOURNAL: TableDefinition<u64, &[u8]> = TableDefinition::new("journal");

/// Slot name -> postcard(ProxyState)
const PROXY: TableDefinition<&str, &[u8]> = TableDefinition::new("proxy");

const ENTRY_COUNT: &str = "entry_count";
const NEXT_SEQUENCE: &str = "next_sequence";
const PROXY_SLOT: &str = "state";

/// Journal value: the event plus the time it was recorded.
#[derive(Serialize, serde::Deserialize)]
struct StoredEvent {
    at: Timestamp,
    event: RegistryEvent,
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    Ok(postcard::to_allocvec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    Ok(postcard::from_bytes(bytes)?)
}

/// Registry storage in a redb database file.
pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").field("path", &self.path).finish()
    }
}

impl RedbStore {
    /// Open the database at `path`, creating it and its tables if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let db = Database::create(&path)?;

        // Create every table up front so read transactions never hit a
        // missing table.
        let txn = db.begin_write()?;
        {
            txn.open_table(ENTRIES)?;
            txn.open_table(META)?;
            txn.open_table(JOURNAL)?;
            txn.open_table(PROXY)?;
        }
        txn.commit()?;

        Ok(Self { db, path })
    }

    /// Location of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_counter(&self, name: &str) -> Result<u64, StorageError> {
        let txn = self.db.begin_read()?;
        let meta = txn.open_table(META)?;
        Ok(meta.get(name)?.map(|guard| guard.value()).unwrap_or(0))
    }

    /// Append `event` inside an open write transaction.
    fn append_event(
        txn: &WriteTransaction,
        at: Timestamp,
        event: &RegistryEvent,
    ) -> Result<(), StorageError> {
        let bytes = encode(&StoredEvent {
            at,
            event: event.clone(),
        })?;

        let mut meta = txn.open_table(META)?;
        let sequence = meta.get(NEXT_SEQUENCE)?.map(|guard| guard.value()).unwrap_or(0);
        meta.insert(NEXT_SEQUENCE, sequence.saturating_add(1))?;

        let mut journal = txn.open_table(JOURNAL)?;
        journal.insert(sequence, bytes.as_slice())?;
        Ok(())
    }
}

impl RegistryStorage for RedbStore {
    fn get(&self, idx: &BatchId) -> Result<Option<EntryRecord>, StorageError> {
        let txn = self.db.begin_read()?;
        let entries = txn.open_table(ENTRIES)?;
        match entries.get(idx.as_bytes().as_slice())? {
            Some(guard) => decode(guard.value()).map(Some),
            None => Ok(None),
        }
    }

    fn count(&self) -> Result<u64, StorageError> {
        self.read_counter(ENTRY_COUNT)
    }

    fn put(
        &mut self,
        idx: BatchId,
        record: &EntryRecord,
        at: Timestamp,
        event: &RegistryEvent,
    ) -> Result<PutOutcome, StorageError> {
        let bytes = encode(record)?;

        let txn = self.db.begin_write()?;
        let outcome = {
            let mut entries = txn.open_table(ENTRIES)?;
            let previous = entries.insert(idx.as_bytes().as_slice(), bytes.as_slice())?;
            let outcome = if previous.is_some() {
                PutOutcome::Replaced
            } else {
                PutOutcome::Inserted
            };
            drop(previous);

            if outcome == PutOutcome::Inserted {
                let mut meta = txn.open_table(META)?;
                let count = meta.get(ENTRY_COUNT)?.map(|guard| guard.value()).unwrap_or(0);
                meta.insert(ENTRY_COUNT, count.saturating_add(1))?;
            }
            outcome
        };
        Self::append_event(&txn, at, event)?;
        txn.commit()?;

        Ok(outcome)
    }

    fn events(&self) -> Result<Vec<JournalRecord>, StorageError> {
        let txn = self.db.begin_read()?;
        let journal = txn.open_table(JOURNAL)?;

        let mut records = Vec::new();
        for item in journal.iter()? {
            let (sequence, value) = item?;
            let stored: StoredEvent = decode(value.value())?;
            records.push(JournalRecord {
                sequence: sequence.value(),
                at: stored.at,
                event: stored.event,
            });
        }
        Ok(records)
    }

    fn proxy_state(&self) -> Result<Option<ProxyState>, StorageError> {
        let txn = self.db.begin_read()?;
        let proxy = txn.open_table(PROXY)?;
        match proxy.get(PROXY_SLOT)? {
            Some(guard) => decode(guard.value()).map(Some),
            None => Ok(None),
        }
    }

    fn set_proxy_state(
        &mut self,
        state: &ProxyState,
        event: Option<(Timestamp, &RegistryEvent)>,
    ) -> Result<(), StorageError> {
        let bytes = encode(state)?;

        let txn = self.db.begin_write()?;
        {
            let mut proxy = txn.open_table(PROXY)?;
            proxy.insert(PROXY_SLOT, bytes.as_slice())?;
        }
        if let Some((at, event)) = event {
            Self::append_event(&txn, at, event)?;
        }
        txn.commit()?;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
