//! # Access Control
//!
//! Two disjoint roles bound once at initialization. There is no grant or
//! revoke path: role administration beyond the initial assignment belongs to
//! whoever deploys the registry.

use crate::error::{RegistryError, RegistryResult};
use crate::primitives::Principal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// A capability recognized by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May submit entries, update metadata and lock entries.
    Operational,
    /// May replace the active logic implementation.
    Upgrade,
}

impl Role {
    /// All roles, in canonical order.
    pub const ALL: [Role; 2] = [Role::Operational, Role::Upgrade];

    /// Canonical role name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Role::Operational => "OPERATIONAL_ADMIN_ROLE",
            Role::Upgrade => "UPGRADE_ADMIN_ROLE",
        }
    }

    /// 32-byte role identifier: the BLAKE3 hash of the canonical name.
    #[must_use]
    pub fn id(self) -> [u8; 32] {
        *blake3::hash(self.name().as_bytes()).as_bytes()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "operational" | "operational_admin_role" => Ok(Role::Operational),
            "upgrade" | "upgrade_admin_role" => Ok(Role::Upgrade),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Role memberships for one registry.
///
/// Uses `BTreeMap`/`BTreeSet` so iteration order is deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessControl {
    members: BTreeMap<Role, BTreeSet<Principal>>,
}

impl AccessControl {
    /// Bind one principal to each role.
    ///
    /// Fails with [`RegistryError::Initialization`] if either principal is
    /// the null identity.
    pub fn new(upgrade_admin: Principal, operational_admin: Principal) -> RegistryResult<Self> {
        if upgrade_admin.is_null() {
            return Err(RegistryError::Initialization(
                "upgrade admin must not be the null identity".to_string(),
            ));
        }
        if operational_admin.is_null() {
            return Err(RegistryError::Initialization(
                "operational admin must not be the null identity".to_string(),
            ));
        }

        let mut members = BTreeMap::new();
        members.insert(Role::Upgrade, BTreeSet::from([upgrade_admin]));
        members.insert(Role::Operational, BTreeSet::from([operational_admin]));
        Ok(Self { members })
    }

    /// Does `principal` hold `role`?
    #[must_use]
    pub fn has_role(&self, role: Role, principal: Principal) -> bool {
        self.members
            .get(&role)
            .is_some_and(|holders| holders.contains(&principal))
    }

    /// Reject with [`RegistryError::Unauthorized`] unless `principal` holds
    /// `role`.
    pub fn require(&self, role: Role, principal: Principal) -> RegistryResult<()> {
        if self.has_role(role, principal) {
            Ok(())
        } else {
            Err(RegistryError::Unauthorized {
                account: principal,
                role,
            })
        }
    }

    /// Holders of `role`, in deterministic order.
    pub fn holders(&self, role: Role) -> impl Iterator<Item = &Principal> {
        self.members.get(&role).into_iter().flatten()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn fixture() -> (AccessControl, Principal, Principal) {
        let safe = Principal::from_label("safe");
        let operator = Principal::from_label("operator");
        let access = AccessControl::new(safe, operator).unwrap();
        (access, safe, operator)
    }

    #[test]
    fn roles_are_bound_at_construction() {
        let (access, safe, operator) = fixture();

        assert!(access.has_role(Role::Upgrade, safe));
        assert!(access.has_role(Role::Operational, operator));
    }

    #[test]
    fn roles_are_disjoint() {
        let (access, safe, operator) = fixture();

        assert!(!access.has_role(Role::Operational, safe));
        assert!(!access.has_role(Role::Upgrade, operator));
    }

    #[test]
    fn outsiders_hold_nothing() {
        let (access, _, _) = fixture();
        let outsider = Principal::from_label("outsider");

        for role in Role::ALL {
            assert!(!access.has_role(role, outsider));
        }
    }

    #[test]
    fn null_principals_fail_initialization() {
        let someone = Principal::from_label("someone");

        let err = AccessControl::new(Principal::NULL, someone).unwrap_err();
        assert!(matches!(err, RegistryError::Initialization(_)));

        let err = AccessControl::new(someone, Principal::NULL).unwrap_err();
        assert!(matches!(err, RegistryError::Initialization(_)));
    }

    #[test]
    fn require_reports_account_and_role() {
        let (access, _, _) = fixture();
        let outsider = Principal::from_label("outsider");

        match access.require(Role::Operational, outsider) {
            Err(RegistryError::Unauthorized { account, role }) => {
                assert_eq!(account, outsider);
                assert_eq!(role, Role::Operational);
            }
            other => panic!("expected Unauthorized, got {other:?}"),
        }
    }

    #[test]
    fn role_ids_are_distinct_and_stable() {
        assert_ne!(Role::Operational.id(), Role::Upgrade.id());
        assert_eq!(
            Role::Upgrade.id(),
            *blake3::hash(b"UPGRADE_ADMIN_ROLE").as_bytes()
        );
    }

    #[test]
    fn role_parsing() {
        assert_eq!("operational".parse::<Role>(), Ok(Role::Operational));
        assert_eq!("UPGRADE_ADMIN_ROLE".parse::<Role>(), Ok(Role::Upgrade));
        assert!("admin".parse::<Role>().is_err());
    }
}
