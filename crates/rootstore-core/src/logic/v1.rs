//! Logic 1.0.0: referenced schema.
//!
//! Entries carry a data reference instead of a lock window and are never
//! mutated after submission.

use super::{Call, LogicVersion, RegistryLogic, Submission, insert_new};
use crate::access::Role;
use crate::entry::{EntryRecord, EntryTerms};
use crate::error::{RegistryError, RegistryResult};
use crate::event::RegistryEvent;
use crate::primitives::{BatchId, Timestamp};
use crate::storage::RegistryStorage;

/// The first logic generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogicV1;

impl LogicV1 {
    fn unsupported(operation: &'static str) -> RegistryError {
        RegistryError::Unsupported {
            version: LogicVersion::V1.as_str(),
            operation,
        }
    }
}

impl RegistryLogic for LogicV1 {
    fn version(&self) -> LogicVersion {
        LogicVersion::V1
    }

    fn submit(
        &self,
        call: &Call<'_>,
        storage: &mut dyn RegistryStorage,
        submission: Submission,
    ) -> RegistryResult<RegistryEvent> {
        call.authorize(Role::Operational)?;

        if !matches!(submission.terms, EntryTerms::DataRef(_)) {
            return Err(RegistryError::SchemaMismatch {
                version: LogicVersion::V1.as_str(),
                expected: EntryRecord::REFERENCED,
            });
        }
        insert_new(call, storage, submission)
    }

    fn update_metadata(
        &self,
        call: &Call<'_>,
        _storage: &mut dyn RegistryStorage,
        _idx: BatchId,
        _metadata: String,
        _new_lock_at: Option<Timestamp>,
    ) -> RegistryResult<RegistryEvent> {
        call.authorize(Role::Operational)?;
        Err(Self::unsupported("update_metadata"))
    }

    fn lock(
        &self,
        call: &Call<'_>,
        _storage: &mut dyn RegistryStorage,
        _idx: BatchId,
    ) -> RegistryResult<RegistryEvent> {
        call.authorize(Role::Operational)?;
        Err(Self::unsupported("lock"))
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

    const DATA_REF: &str = "https://example.com/datafile";

    fn access() -> AccessControl {
        AccessControl::new(Principal::from_label("safe"), Principal::from_label("operator"))
            .unwrap()
    }

    fn call<'a>(access: &'a AccessControl, caller: &str) -> Call<'a> {
        Call {
            caller: Principal::from_label(caller),
            now: Timestamp::from_secs(1_000),
            access,
        }
    }

    #[test]
    fn submit_stores_data_reference() {
        let access = access();
        let mut store = MemoryStore::new();
        let idx = BatchId::from_name("merkle-root-1");
        let root = MerkleRoot::digest(b"merkle-root-1");

        let event = LogicV1
            .submit(
                &call(&access, "operator"),
                &mut store,
                Submission::referenced(idx, root, r#"{"batch":"metadata"}"#, DATA_REF),
            )
            .unwrap();

        assert_eq!(event.idx(), Some(idx));
        let record = LogicV1.get(&store, &idx).unwrap();
        assert_eq!(record.merkle_root(), root);
        assert_eq!(record.data_ref(), Some(DATA_REF));
        assert_eq!(record.lock_at(), None);
        assert_eq!(LogicV1.count(&store).unwrap(), 1);
    }

    #[test]
    fn submit_rejects_time_locked_terms() {
        let access = access();
        let mut store = MemoryStore::new();
        let submission = Submission::time_locked(
            BatchId::from_name("x"),
            MerkleRoot::digest(b"x"),
            "{}",
            Timestamp::from_secs(5_000),
        );

        let err = LogicV1
            .submit(&call(&access, "operator"), &mut store, submission)
            .unwrap_err();

        assert!(matches!(err, RegistryError::SchemaMismatch { .. }));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn submit_requires_operational_role() {
        let access = access();
        let mut store = MemoryStore::new();
        let submission =
            Submission::referenced(BatchId::from_name("x"), MerkleRoot::digest(b"x"), "{}", DATA_REF);

        let err = LogicV1
            .submit(&call(&access, "outsider"), &mut store, submission)
            .unwrap_err();

        match err {
            RegistryError::Unauthorized { account, role } => {
                assert_eq!(account, Principal::from_label("outsider"));
                assert_eq!(role, Role::Operational);
            }
            other => panic!("expected Unauthorized, got {other:?}"),
        }
        assert!(store.events().unwrap().is_empty());
    }

    #[test]
    fn mutations_are_unsupported_but_still_authorized() {
        let access = access();
        let mut store = MemoryStore::new();
        let idx = BatchId::from_name("x");

        let err = LogicV1
            .lock(&call(&access, "outsider"), &mut store, idx)
            .unwrap_err();
        assert!(matches!(err, RegistryError::Unauthorized { .. }));

        let err = LogicV1
            .update_metadata(&call(&access, "operator"), &mut store, idx, "m".into(), None)
            .unwrap_err();
        assert!(matches!(err, RegistryError::Unsupported { operation: "update_metadata", .. }));
    }
}
