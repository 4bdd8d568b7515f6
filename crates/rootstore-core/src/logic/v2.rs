//! Logic 2.0.0: time-locked schema.
//!
//! Per entry: `absent -> open -> locked`. An entry is open while
//! `now < lock_at`; `locked` is terminal.

use super::{Call, LogicVersion, RegistryLogic, Submission, existing, insert_new};
use crate::access::Role;
use crate::entry::{EntryRecord, EntryTerms};
use crate::error::{RegistryError, RegistryResult};
use crate::event::RegistryEvent;
use crate::primitives::{BatchId, Timestamp};
use crate::storage::RegistryStorage;

/// The time-locked logic generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogicV2;

impl RegistryLogic for LogicV2 {
    fn version(&self) -> LogicVersion {
        LogicVersion::V2
    }

    fn submit(
        &self,
        call: &Call<'_>,
        storage: &mut dyn RegistryStorage,
        submission: Submission,
    ) -> RegistryResult<RegistryEvent> {
        call.authorize(Role::Operational)?;

        if !matches!(submission.terms, EntryTerms::LockAt(_)) {
            return Err(RegistryError::SchemaMismatch {
                version: LogicVersion::V2.as_str(),
                expected: EntryRecord::TIME_LOCKED,
            });
        }
        insert_new(call, storage, submission)
    }

    fn update_metadata(
        &self,
        call: &Call<'_>,
        storage: &mut dyn RegistryStorage,
        idx: BatchId,
        metadata: String,
        new_lock_at: Option<Timestamp>,
    ) -> RegistryResult<RegistryEvent> {
        call.authorize(Role::Operational)?;

        let current = existing(&*storage, idx)?;
        let (merkle_root, lock_at) = match current {
            EntryRecord::TimeLocked {
                merkle_root,
                lock_at,
                ..
            } if call.now < lock_at => (merkle_root, lock_at),
            frozen => {
                return Err(RegistryError::Frozen {
                    idx,
                    lock_at: frozen.lock_at(),
                });
            }
        };

        let lock_at = new_lock_at.unwrap_or(lock_at);
        let record = EntryRecord::TimeLocked {
            merkle_root,
            metadata: metadata.clone(),
            lock_at,
        };
        let event = RegistryEvent::MetadataModified {
            idx,
            lock_at,
            metadata,
        };
        storage.put(idx, &record, call.now, &event)?;
        Ok(event)
    }

    fn lock(
        &self,
        call: &Call<'_>,
        storage: &mut dyn RegistryStorage,
        idx: BatchId,
    ) -> RegistryResult<RegistryEvent> {
        call.authorize(Role::Operational)?;

        // Re-locking an already frozen entry re-stamps lock_at with the
        // current time, which still satisfies now >= lock_at.
        let (merkle_root, metadata) = match existing(&*storage, idx)? {
            EntryRecord::TimeLocked {
                merkle_root,
                metadata,
                ..
            } => (merkle_root, metadata),
            EntryRecord::Referenced { .. } => {
                return Err(RegistryError::Frozen { idx, lock_at: None });
            }
        };

        let record = EntryRecord::TimeLocked {
            merkle_root,
            metadata: metadata.clone(),
            lock_at: call.now,
        };
        let event = RegistryEvent::MetadataModified {
            idx,
            lock_at: call.now,
            metadata,
        };
        storage.put(idx, &record, call.now, &event)?;
        Ok(event)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::access::AccessControl;
    use crate::primitives::{MerkleRoot, Principal};
    use crate::storage::MemoryStore;
    use proptest::prelude::*;

    const NOW: u64 = 1_700_000_000;

    fn access() -> AccessControl {
        AccessControl::new(Principal::from_label("safe"), Principal::from_label("operator"))
            .unwrap()
    }

    fn call_at<'a>(access: &'a AccessControl, caller: &str, now: u64) -> Call<'a> {
        Call {
            caller: Principal::from_label(caller),
            now: Timestamp::from_secs(now),
            access,
        }
    }

    fn operator(access: &AccessControl) -> Call<'_> {
        call_at(access, "operator", NOW)
    }

    fn submit_batch(store: &mut MemoryStore, access: &AccessControl, name: &str) -> BatchId {
        let idx = BatchId::from_name(name);
        LogicV2
            .submit(
                &operator(access),
                store,
                Submission::time_locked(
                    idx,
                    MerkleRoot::digest(name.as_bytes()),
                    format!(r#"{{"batch":"{name}"}}"#),
                    Timestamp::from_secs(NOW + 3_600),
                ),
            )
            .unwrap();
        idx
    }

    #[test]
    fn submit_emits_full_event_and_roundtrips() {
        let access = access();
        let mut store = MemoryStore::new();
        let idx = BatchId::from_name("merkle-root-5");
        let root = MerkleRoot::digest(b"merkle-root-5");
        let lock_at = Timestamp::from_secs(NOW + 3_600);

        let event = LogicV2
            .submit(
                &operator(&access),
                &mut store,
                Submission::time_locked(idx, root, r#"{"batch":"metadata5"}"#, lock_at),
            )
            .unwrap();

        assert_eq!(
            event,
            RegistryEvent::RootSubmitted {
                idx,
                merkle_root: root,
                terms: EntryTerms::LockAt(lock_at),
                metadata: r#"{"batch":"metadata5"}"#.to_string(),
            }
        );

        let record = LogicV2.get(&store, &idx).unwrap();
        assert_eq!(record.merkle_root(), root);
        assert_eq!(record.metadata(), r#"{"batch":"metadata5"}"#);
        assert_eq!(record.lock_at(), Some(lock_at));
    }

    #[test]
    fn duplicate_submit_is_rejected_and_count_unchanged() {
        let access = access();
        let mut store = MemoryStore::new();
        let idx = submit_batch(&mut store, &access, "batch-1");

        let err = LogicV2
            .submit(
                &operator(&access),
                &mut store,
                Submission::time_locked(idx, MerkleRoot::digest(b"other"), "{}", Timestamp(NOW + 1)),
            )
            .unwrap_err();

        assert!(matches!(err, RegistryError::AlreadyExists { .. }));
        assert_eq!(LogicV2.count(&store).unwrap(), 1);
        assert_eq!(
            LogicV2.get(&store, &idx).unwrap().merkle_root(),
            MerkleRoot::digest(b"batch-1")
        );
    }

    #[test]
    fn submit_rejects_referenced_terms() {
        let access = access();
        let mut store = MemoryStore::new();

        let err = LogicV2
            .submit(
                &operator(&access),
                &mut store,
                Submission::referenced(BatchId::from_name("x"), MerkleRoot::default(), "{}", "url"),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            RegistryError::SchemaMismatch {
                expected: EntryRecord::TIME_LOCKED,
                ..
            }
        ));
    }

    #[test]
    fn update_before_lock_replaces_metadata() {
        let access = access();
        let mut store = MemoryStore::new();
        let idx = submit_batch(&mut store, &access, "merkle-root-3");
        let lock_at = Timestamp::from_secs(NOW + 3_600);

        let event = LogicV2
            .update_metadata(
                &operator(&access),
                &mut store,
                idx,
                r#"{"batch":"updated-metadata3"}"#.to_string(),
                None,
            )
            .unwrap();

        assert_eq!(
            event,
            RegistryEvent::MetadataModified {
                idx,
                lock_at,
                metadata: r#"{"batch":"updated-metadata3"}"#.to_string(),
            }
        );
        let record = LogicV2.get(&store, &idx).unwrap();
        assert_eq!(record.metadata(), r#"{"batch":"updated-metadata3"}"#);
        assert_eq!(record.merkle_root(), MerkleRoot::digest(b"merkle-root-3"));
    }

    #[test]
    fn update_can_extend_lock_window() {
        let access = access();
        let mut store = MemoryStore::new();
        let idx = submit_batch(&mut store, &access, "batch");
        let extended = Timestamp::from_secs(NOW + 7_200);

        LogicV2
            .update_metadata(&operator(&access), &mut store, idx, "m2".into(), Some(extended))
            .unwrap();

        // Past the original lock time but before the extended one.
        LogicV2
            .update_metadata(
                &call_at(&access, "operator", NOW + 5_000),
                &mut store,
                idx,
                "m3".into(),
                None,
            )
            .unwrap();
        assert_eq!(LogicV2.get(&store, &idx).unwrap().lock_at(), Some(extended));
    }

    #[test]
    fn lock_freezes_entry() {
        let access = access();
        let mut store = MemoryStore::new();
        let idx = submit_batch(&mut store, &access, "merkle-root-4");

        let event = LogicV2.lock(&operator(&access), &mut store, idx).unwrap();
        assert_eq!(
            event,
            RegistryEvent::MetadataModified {
                idx,
                lock_at: Timestamp::from_secs(NOW),
                metadata: r#"{"batch":"merkle-root-4"}"#.to_string(),
            }
        );

        let err = LogicV2
            .update_metadata(&operator(&access), &mut store, idx, "x".into(), None)
            .unwrap_err();
        assert!(matches!(err, RegistryError::Frozen { .. }));
        assert_eq!(
            LogicV2.get(&store, &idx).unwrap().metadata(),
            r#"{"batch":"merkle-root-4"}"#
        );
    }

    #[test]
    fn frozen_entry_cannot_be_reopened_by_extension() {
        let access = access();
        let mut store = MemoryStore::new();
        let idx = submit_batch(&mut store, &access, "batch");
        LogicV2.lock(&operator(&access), &mut store, idx).unwrap();

        let err = LogicV2
            .update_metadata(
                &operator(&access),
                &mut store,
                idx,
                "x".into(),
                Some(Timestamp::from_secs(u64::MAX)),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::Frozen { .. }));
    }

    #[test]
    fn clock_passing_lock_at_freezes_implicitly() {
        let access = access();
        let mut store = MemoryStore::new();
        let idx = submit_batch(&mut store, &access, "batch");

        let err = LogicV2
            .update_metadata(
                &call_at(&access, "operator", NOW + 3_600),
                &mut store,
                idx,
                "late".into(),
                None,
            )
            .unwrap_err();

        match err {
            RegistryError::Frozen { lock_at, .. } => {
                assert_eq!(lock_at, Some(Timestamp::from_secs(NOW + 3_600)));
            }
            other => panic!("expected Frozen, got {other:?}"),
        }
    }

    #[test]
    fn relock_stays_frozen() {
        let access = access();
        let mut store = MemoryStore::new();
        let idx = submit_batch(&mut store, &access, "batch");

        LogicV2.lock(&operator(&access), &mut store, idx).unwrap();
        let later = call_at(&access, "operator", NOW + 10);
        LogicV2.lock(&later, &mut store, idx).unwrap();

        let err = LogicV2
            .update_metadata(&later, &mut store, idx, "x".into(), None)
            .unwrap_err();
        assert!(matches!(err, RegistryError::Frozen { .. }));
    }

    #[test]
    fn missing_entries_fail_not_found() {
        let access = access();
        let mut store = MemoryStore::new();
        let idx = BatchId::from_name("absent");

        assert!(matches!(
            LogicV2.lock(&operator(&access), &mut store, idx),
            Err(RegistryError::NotFound { .. })
        ));
        assert!(matches!(
            LogicV2.update_metadata(&operator(&access), &mut store, idx, "m".into(), None),
            Err(RegistryError::NotFound { .. })
        ));
        assert!(matches!(
            LogicV2.get(&store, &idx),
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[test]
    fn referenced_entries_are_frozen_under_v2() {
        let access = access();
        let mut store = MemoryStore::new();
        let idx = BatchId::from_name("legacy");
        super::super::LogicV1
            .submit(
                &operator(&access),
                &mut store,
                Submission::referenced(idx, MerkleRoot::digest(b"legacy"), "{}", "https://x"),
            )
            .unwrap();

        assert!(matches!(
            LogicV2.update_metadata(&operator(&access), &mut store, idx, "m".into(), None),
            Err(RegistryError::Frozen { lock_at: None, .. })
        ));
        assert!(matches!(
            LogicV2.lock(&operator(&access), &mut store, idx),
            Err(RegistryError::Frozen { lock_at: None, .. })
        ));
        assert_eq!(LogicV2.get(&store, &idx).unwrap().data_ref(), Some("https://x"));
    }

    #[test]
    fn outsiders_change_nothing() {
        let access = access();
        let mut store = MemoryStore::new();
        let idx = submit_batch(&mut store, &access, "batch");
        let before = LogicV2.get(&store, &idx).unwrap();
        let journal_len = store.events().unwrap().len();

        // The upgrade admin holds a role, just not the operational one.
        for caller in ["outsider", "safe"] {
            let call = call_at(&access, caller, NOW);
            assert!(matches!(
                LogicV2.update_metadata(&call, &mut store, idx, "x".into(), None),
                Err(RegistryError::Unauthorized { .. })
            ));
            assert!(matches!(
                LogicV2.lock(&call, &mut store, idx),
                Err(RegistryError::Unauthorized { .. })
            ));
            assert!(matches!(
                LogicV2.submit(
                    &call,
                    &mut store,
                    Submission::time_locked(
                        BatchId::from_name("new"),
                        MerkleRoot::default(),
                        "{}",
                        Timestamp(NOW + 1)
                    )
                ),
                Err(RegistryError::Unauthorized { .. })
            ));
        }

        assert_eq!(LogicV2.get(&store, &idx).unwrap(), before);
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.events().unwrap().len(), journal_len);
    }

    proptest! {
        #[test]
        fn count_tracks_distinct_keys(names in proptest::collection::vec("[a-e]{1,2}", 1..20)) {
            let access = access();
            let mut store = MemoryStore::new();
            let mut distinct = std::collections::BTreeSet::new();

            for name in &names {
                let idx = BatchId::from_name(name);
                let result = LogicV2.submit(
                    &operator(&access),
                    &mut store,
                    Submission::time_locked(idx, MerkleRoot::digest(name.as_bytes()), "{}", Timestamp(NOW + 60)),
                );
                prop_assert_eq!(result.is_ok(), distinct.insert(idx));
                prop_assert_eq!(LogicV2.count(&store).unwrap(), distinct.len() as u64);
            }
        }

        #[test]
        fn metadata_frozen_iff_now_reaches_lock_at(offset in 0u64..10_000, elapsed in 0u64..10_000) {
            let access = access();
            let mut store = MemoryStore::new();
            let idx = BatchId::from_name("p");
            let lock_at = Timestamp(NOW + offset);
            LogicV2.submit(
                &operator(&access),
                &mut store,
                Submission::time_locked(idx, MerkleRoot::default(), "m0", lock_at),
            ).unwrap();

            let call = call_at(&access, "operator", NOW + elapsed);
            let result = LogicV2.update_metadata(&call, &mut store, idx, "m1".into(), None);
            let frozen = Timestamp(NOW + elapsed) >= lock_at;

            prop_assert_eq!(result.is_err(), frozen);
            let expected = if frozen { "m0" } else { "m1" };
            let stored = LogicV2.get(&store, &idx).unwrap();
            prop_assert_eq!(stored.metadata(), expected);
        }
    }
}
