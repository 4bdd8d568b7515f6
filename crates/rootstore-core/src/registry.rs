//! # Registry
//!
//! The stable address. Owns the one storage instance, the role policy, the
//! injected clock and the currently active logic version.
//!
//! All state sits behind a single `RwLock`. Writers hold the write lock for
//! the whole authorize-check-persist step, so state changes are atomic and
//! totally ordered in lock acquisition order. Readers take the read lock and
//! only ever see fully written entries.
//!
//! Swapping the logic (`upgrade_to`) replaces the boxed implementation and
//! the persisted version tag. It never touches entries.

use crate::access::{AccessControl, Role};
use crate::clock::Clock;
use crate::entry::EntryRecord;
use crate::error::{RegistryError, RegistryResult};
use crate::event::{JournalRecord, RegistryEvent};
use crate::logic::{Call, LogicVersion, RegistryLogic, Submission};
use crate::primitives::{BatchId, Principal, Timestamp};
use crate::storage::{ProxyState, RegistryStorage};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

struct Inner<S> {
    storage: S,
    access: AccessControl,
    logic: Box<dyn RegistryLogic>,
    state: ProxyState,
}

/// A deployed registry.
pub struct Registry<S: RegistryStorage> {
    inner: RwLock<Inner<S>>,
    clock: Arc<dyn Clock>,
}

impl<S: RegistryStorage> std::fmt::Debug for Registry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("state", &self.read().state)
            .finish()
    }
}

impl<S: RegistryStorage> Registry<S> {
    /// Deploy a registry at `address` on fresh storage.
    ///
    /// Fails with `Initialization` for a null address or null role
    /// principals and with `AlreadyInitialized` if the storage already
    /// carries a deployment.
    pub fn initialize(
        mut storage: S,
        clock: Arc<dyn Clock>,
        address: Principal,
        version: LogicVersion,
        upgrade_admin: Principal,
        operational_admin: Principal,
    ) -> RegistryResult<Self> {
        if address.is_null() {
            return Err(RegistryError::Initialization(
                "registry address must not be null".to_string(),
            ));
        }
        let access = AccessControl::new(upgrade_admin, operational_admin)?;
        if storage.proxy_state()?.is_some() {
            return Err(RegistryError::AlreadyInitialized);
        }

        let state = ProxyState {
            address,
            upgrade_admin,
            operational_admin,
            active: version,
        };
        storage.set_proxy_state(&state, None)?;

        Ok(Self::assemble(storage, clock, access, state))
    }

    /// Resume a registry from storage written by an earlier run.
    pub fn open(storage: S, clock: Arc<dyn Clock>) -> RegistryResult<Self> {
        let state = storage.proxy_state()?.ok_or(RegistryError::NotInitialized)?;
        let access = AccessControl::new(state.upgrade_admin, state.operational_admin)?;
        Ok(Self::assemble(storage, clock, access, state))
    }

    fn assemble(storage: S, clock: Arc<dyn Clock>, access: AccessControl, state: ProxyState) -> Self {
        let logic = state.active.instantiate();
        Self {
            inner: RwLock::new(Inner {
                storage,
                access,
                logic,
                state,
            }),
            clock,
        }
    }

    // A panicking writer cannot leave a torn entry behind: every storage
    // mutation is a single atomic put. Recovering the guard is safe.
    fn read(&self) -> RwLockReadGuard<'_, Inner<S>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner<S>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // WRITE PATHS
    // =========================================================================

    /// Create a new entry.
    pub fn submit(&self, caller: Principal, submission: Submission) -> RegistryResult<RegistryEvent> {
        let mut guard = self.write();
        let inner = &mut *guard;
        let call = Call {
            caller,
            now: self.clock.now(),
            access: &inner.access,
        };
        inner.logic.submit(&call, &mut inner.storage, submission)
    }

    /// Replace metadata of an open entry, optionally moving its lock time.
    pub fn update_metadata(
        &self,
        caller: Principal,
        idx: BatchId,
        metadata: impl Into<String>,
        new_lock_at: Option<Timestamp>,
    ) -> RegistryResult<RegistryEvent> {
        let mut guard = self.write();
        let inner = &mut *guard;
        let call = Call {
            caller,
            now: self.clock.now(),
            access: &inner.access,
        };
        inner
            .logic
            .update_metadata(&call, &mut inner.storage, idx, metadata.into(), new_lock_at)
    }

    /// Freeze an entry at the current time.
    pub fn lock(&self, caller: Principal, idx: BatchId) -> RegistryResult<RegistryEvent> {
        let mut guard = self.write();
        let inner = &mut *guard;
        let call = Call {
            caller,
            now: self.clock.now(),
            access: &inner.access,
        };
        inner.logic.lock(&call, &mut inner.storage, idx)
    }

    /// Swap the active logic. Requires [`Role::Upgrade`].
    ///
    /// The new version is persisted before it becomes active, so a failed
    /// write leaves the previous version serving calls.
    pub fn upgrade_to(&self, caller: Principal, target: LogicVersion) -> RegistryResult<RegistryEvent> {
        let mut guard = self.write();
        let inner = &mut *guard;
        inner.access.require(Role::Upgrade, caller)?;

        let event = RegistryEvent::LogicUpgraded {
            from: inner.logic.version(),
            to: target,
        };
        let next = ProxyState {
            active: target,
            ..inner.state.clone()
        };
        inner
            .storage
            .set_proxy_state(&next, Some((self.clock.now(), &event)))?;

        inner.logic = target.instantiate();
        inner.state = next;
        Ok(event)
    }

    // =========================================================================
    // READ PATHS
    // =========================================================================

    /// Read an entry. Absent keys fail `NotFound`.
    pub fn get(&self, idx: &BatchId) -> RegistryResult<EntryRecord> {
        let inner = self.read();
        inner.logic.get(&inner.storage, idx)
    }

    /// Number of distinct entries submitted.
    pub fn count(&self) -> RegistryResult<u64> {
        let inner = self.read();
        inner.logic.count(&inner.storage)
    }

    /// The active logic version.
    pub fn version(&self) -> LogicVersion {
        self.read().logic.version()
    }

    /// Does `principal` hold `role`?
    pub fn has_role(&self, role: Role, principal: Principal) -> bool {
        self.read().access.has_role(role, principal)
    }

    /// The audit trail, in sequence order.
    pub fn events(&self) -> RegistryResult<Vec<JournalRecord>> {
        Ok(self.read().storage.events()?)
    }

    /// The stable address this registry was deployed at.
    pub fn address(&self) -> Principal {
        self.read().state.address
    }

    /// The persisted deployment record.
    pub fn proxy_state(&self) -> ProxyState {
        self.read().state.clone()
    }

    /// Current clock reading, as the registry sees it.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Release the storage, e.g. to reopen it under another registry
    /// instance.
    pub fn into_storage(self) -> S {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .storage
    }
}

// =============================================================================
// TESTS
// =============================================================================
