//! In-memory storage. Uses `BTreeMap` for deterministic ordering.

use super::{ProxyState, PutOutcome, RegistryStorage};
use crate::entry::EntryRecord;
use crate::error::StorageError;
use crate::event::{JournalRecord, RegistryEvent};
use crate::primitives::{BatchId, Timestamp};
use std::collections::BTreeMap;

/// Volatile registry storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    /// Entry storage: idx -> record
    entries: BTreeMap<BatchId, EntryRecord>,

    /// Distinct keys ever written
    entry_count: u64,

    /// Append-only event journal
    journal: Vec<JournalRecord>,

    proxy: Option<ProxyState>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn append(&mut self, at: Timestamp, event: &RegistryEvent) {
        let sequence = self.journal.len() as u64;
        self.journal.push(JournalRecord {
            sequence,
            at,
            event: event.clone(),
        });
    }
}

impl RegistryStorage for MemoryStore {
    fn get(&self, idx: &BatchId) -> Result<Option<EntryRecord>, StorageError> {
        Ok(self.entries.get(idx).cloned())
    }

    fn count(&self) -> Result<u64, StorageError> {
        Ok(self.entry_count)
    }

    fn put(
        &mut self,
        idx: BatchId,
        record: &EntryRecord,
        at: Timestamp,
        event: &RegistryEvent,
    ) -> Result<PutOutcome, StorageError> {
        let outcome = match self.entries.insert(idx, record.clone()) {
            Some(_) => PutOutcome::Replaced,
            None => {
                self.entry_count = self.entry_count.saturating_add(1);
                PutOutcome::Inserted
            }
        };
        self.append(at, event);
        Ok(outcome)
    }

    fn events(&self) -> Result<Vec<JournalRecord>, StorageError> {
        Ok(self.journal.clone())
    }

    fn proxy_state(&self) -> Result<Option<ProxyState>, StorageError> {
        Ok(self.proxy.clone())
    }

    fn set_proxy_state(
        &mut self,
        state: &ProxyState,
        event: Option<(Timestamp, &RegistryEvent)>,
    ) -> Result<(), StorageError> {
        self.proxy = Some(state.clone());
        if let Some((at, event)) = event {
            self.append(at, event);
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entry::EntryTerms;
    use crate::primitives::MerkleRoot;

    fn record(metadata: &str) -> EntryRecord {
        EntryRecord::from_terms(
            MerkleRoot::digest(b"root"),
            metadata.to_string(),
            EntryTerms::LockAt(Timestamp::from_secs(10)),
        )
    }

    fn event(idx: BatchId) -> RegistryEvent {
        RegistryEvent::MetadataModified {
            idx,
            lock_at: Timestamp::from_secs(10),
            metadata: String::new(),
        }
    }

    #[test]
    fn put_then_get() {
        let mut store = MemoryStore::new();
        let idx = BatchId::from_name("a");

        let outcome = store.put(idx, &record("m"), Timestamp(1), &event(idx)).unwrap();

        assert_eq!(outcome, PutOutcome::Inserted);
        assert_eq!(store.get(&idx).unwrap(), Some(record("m")));
        assert_eq!(store.get(&BatchId::from_name("b")).unwrap(), None);
    }

    #[test]
    fn overwrite_does_not_increase_count() {
        let mut store = MemoryStore::new();
        let idx = BatchId::from_name("a");

        store.put(idx, &record("m1"), Timestamp(1), &event(idx)).unwrap();
        let outcome = store.put(idx, &record("m2"), Timestamp(2), &event(idx)).unwrap();

        assert_eq!(outcome, PutOutcome::Replaced);
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.events().unwrap().len(), 2);
    }

    #[test]
    fn journal_sequences_are_contiguous() {
        let mut store = MemoryStore::new();
        for name in ["a", "b", "c"] {
            let idx = BatchId::from_name(name);
            store.put(idx, &record(name), Timestamp(5), &event(idx)).unwrap();
        }

        let sequences: Vec<_> = store.events().unwrap().iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }
}
