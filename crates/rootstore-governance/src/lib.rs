//! # Rootstore Governance
//!
//! The upgrade-admin principal of a registry is normally a threshold
//! multisig: a fixed owner set of which at least `threshold` must approve an
//! action before it is executed under the multisig's own address.
//!
//! Actions are identified by a digest over a domain-separated canonical
//! encoding. The digest covers the target registry's address, so approvals
//! collected for one registry are refused when executed against another.
//!
//! The registry core never sees any of this. Its only contact point is the
//! single [`Registry::upgrade_to`] call issued by [`Multisig::execute`].

use rootstore_core::{LogicVersion, Principal, Registry, RegistryError, RegistryStorage};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Prefix hashed ahead of every proposal encoding.
const UPGRADE_PROPOSAL_DOMAIN_SEPARATOR: &[u8] = b"rootstore:upgrade_proposal:v1\0";

/// 32-byte proposal identifier.
pub type ProposalDigest = [u8; 32];

/// Errors from the multisig.
#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("threshold {threshold} is outside 1..={owners}")]
    InvalidThreshold { threshold: usize, owners: usize },

    #[error("the null principal cannot be an owner")]
    NullOwner,

    #[error("{0} is not an owner")]
    NotAnOwner(Principal),

    #[error("no open proposal with digest {}", hex::encode(.0))]
    UnknownProposal(ProposalDigest),

    /// The proposal names a different registry than the one it is executed
    /// against.
    #[error("proposal targets registry {proposed}, not {actual}")]
    WrongRegistry { proposed: Principal, actual: Principal },

    #[error("{approvals} of {threshold} required approvals")]
    BelowThreshold { approvals: usize, threshold: usize },

    #[error("proposal encoding failed: {0}")]
    Encoding(#[from] postcard::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Swap a registry's logic to `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeProposal {
    /// Stable address of the registry to upgrade.
    pub registry: Principal,
    pub target: LogicVersion,
    /// Distinguishes otherwise identical proposals.
    pub nonce: u64,
}

impl UpgradeProposal {
    /// Canonical digest of this proposal.
    pub fn digest(&self) -> Result<ProposalDigest, GovernanceError> {
        let encoded = postcard::to_allocvec(self)?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(UPGRADE_PROPOSAL_DOMAIN_SEPARATOR);
        hasher.update(&encoded);
        Ok(*hasher.finalize().as_bytes())
    }
}

/// A threshold multisig acting as upgrade admin.
#[derive(Debug)]
pub struct Multisig {
    address: Principal,
    owners: BTreeSet<Principal>,
    threshold: usize,
    /// Open proposals: digest -> approving owners.
    pending: BTreeMap<ProposalDigest, BTreeSet<Principal>>,
}

impl Multisig {
    /// Build a multisig. Duplicate owners collapse into one.
    pub fn new(
        address: Principal,
        owners: impl IntoIterator<Item = Principal>,
        threshold: usize,
    ) -> Result<Self, GovernanceError> {
        let owners: BTreeSet<Principal> = owners.into_iter().collect();
        if address.is_null() || owners.iter().any(Principal::is_null) {
            return Err(GovernanceError::NullOwner);
        }
        if threshold == 0 || threshold > owners.len() {
            return Err(GovernanceError::InvalidThreshold {
                threshold,
                owners: owners.len(),
            });
        }
        Ok(Self {
            address,
            owners,
            threshold,
            pending: BTreeMap::new(),
        })
    }

    /// The principal the registry sees as caller.
    #[must_use]
    pub fn address(&self) -> Principal {
        self.address
    }

    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn owners(&self) -> impl Iterator<Item = &Principal> {
        self.owners.iter()
    }

    /// Open a proposal. Re-proposing an open digest keeps its approvals.
    pub fn propose(&mut self, proposal: &UpgradeProposal) -> Result<ProposalDigest, GovernanceError> {
        let digest = proposal.digest()?;
        self.pending.entry(digest).or_default();
        Ok(digest)
    }

    /// Record `owner`'s approval. Returns the approval count.
    pub fn approve(&mut self, owner: Principal, digest: &ProposalDigest) -> Result<usize, GovernanceError> {
        if !self.owners.contains(&owner) {
            return Err(GovernanceError::NotAnOwner(owner));
        }
        let approvals = self
            .pending
            .get_mut(digest)
            .ok_or(GovernanceError::UnknownProposal(*digest))?;
        approvals.insert(owner);
        Ok(approvals.len())
    }

    /// Approvals currently held for `digest`.
    #[must_use]
    pub fn approvals(&self, digest: &ProposalDigest) -> usize {
        self.pending.get(digest).map_or(0, BTreeSet::len)
    }

    /// Execute `proposal` once it has reached the threshold.
    ///
    /// The executor presents the full proposal; approvals are looked up by
    /// its recomputed digest, so only the exact approved action can run. The
    /// upgrade is issued under the multisig's address. On success the
    /// proposal is closed; on failure it stays open with its approvals.
    pub fn execute<S: RegistryStorage>(
        &mut self,
        proposal: &UpgradeProposal,
        registry: &Registry<S>,
    ) -> Result<LogicVersion, GovernanceError> {
        let digest = proposal.digest()?;
        let approvals = self
            .pending
            .get(&digest)
            .map(BTreeSet::len)
            .ok_or(GovernanceError::UnknownProposal(digest))?;

        let actual = registry.address();
        if proposal.registry != actual {
            return Err(GovernanceError::WrongRegistry {
                proposed: proposal.registry,
                actual,
            });
        }
        if approvals < self.threshold {
            return Err(GovernanceError::BelowThreshold {
                approvals,
                threshold: self.threshold,
            });
        }

        registry.upgrade_to(self.address, proposal.target)?;
        self.pending.remove(&digest);
        Ok(proposal.target)
    }
}

// =============================================================================
// TESTS
// =============================================================================
