//! # Error Taxonomy
//!
//! Every failure is a whole-operation rejection: when an operation returns
//! `Err`, no field of any entry has been written.

use crate::access::Role;
use crate::primitives::{BatchId, Principal, Timestamp};
use thiserror::Error;

/// Errors surfaced by registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The caller lacks the role the operation requires.
    #[error("account {account} is missing role {role}")]
    Unauthorized { account: Principal, role: Role },

    /// Metadata mutation attempted after the entry's lock time.
    #[error("entry {idx} is frozen (locked at {lock_at:?})")]
    Frozen {
        idx: BatchId,
        /// `None` for referenced entries, which carry no lock window.
        lock_at: Option<Timestamp>,
    },

    /// No entry has been submitted under this key.
    #[error("no entry for {idx}")]
    NotFound { idx: BatchId },

    /// An entry already exists under this key.
    #[error("entry {idx} already exists")]
    AlreadyExists { idx: BatchId },

    /// The submission terms belong to a different schema generation.
    #[error("logic {version} expects {expected} terms")]
    SchemaMismatch {
        version: &'static str,
        expected: &'static str,
    },

    /// The active logic generation does not implement this operation.
    #[error("logic {version} does not support {operation}")]
    Unsupported {
        version: &'static str,
        operation: &'static str,
    },

    /// Construction with missing or invalid role principals.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// The storage already carries a deployed registry.
    #[error("storage already holds an initialized registry")]
    AlreadyInitialized,

    /// The storage carries no deployed registry.
    #[error("storage holds no initialized registry")]
    NotInitialized,

    /// The persisted logic version is not known to this build.
    #[error("unknown logic version: {0}")]
    UnknownVersion(String),

    /// Persistence failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failure inside the embedded database.
    #[error("database error: {0}")]
    Database(#[from] redb::Error),

    /// A stored record could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] postcard::Error),
}

macro_rules! redb_into_storage {
    ($($err:ty),* $(,)?) => {
        $(
            impl From<$err> for StorageError {
                fn from(err: $err) -> Self {
                    Self::Database(err.into())
                }
            }
        )*
    };
}

redb_into_storage!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
