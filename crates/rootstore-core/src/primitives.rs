//! # Primitives
//!
//! Fixed-size identifiers and timestamps shared by every registry module.
//!
//! Identifiers serialize as `0x`-prefixed hex in human-readable formats
//! (JSON) and as raw byte arrays in binary formats (postcard), so the
//! on-disk layout stays compact while CLI and HTTP output stays legible.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of a batch key or commitment in bytes.
pub const DIGEST_LEN: usize = 32;

/// Length of a principal identity in bytes.
pub const PRINCIPAL_LEN: usize = 20;

/// Errors produced when parsing identifiers from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseIdError {
    /// The input is not valid hexadecimal.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// The input decoded to the wrong number of bytes.
    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

fn decode_fixed<const N: usize>(text: &str) -> Result<[u8; N], ParseIdError> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    let bytes = hex::decode(digits).map_err(|e| ParseIdError::InvalidHex(e.to_string()))?;
    let actual = bytes.len();
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| ParseIdError::InvalidLength {
        expected: N,
        actual,
    })
}

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Borrow the raw bytes.
            #[must_use]
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                decode_fixed::<$len>(s).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&self.to_string())
                } else {
                    self.0.serialize(serializer)
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                if deserializer.is_human_readable() {
                    let text = String::deserialize(deserializer)?;
                    text.parse().map_err(serde::de::Error::custom)
                } else {
                    <[u8; $len]>::deserialize(deserializer).map(Self)
                }
            }
        }
    };
}

fixed_bytes!(
    /// Opaque key addressing one registry entry.
    ///
    /// Usually the hash of a logical batch name, see [`BatchId::from_name`].
    BatchId,
    DIGEST_LEN
);

fixed_bytes!(
    /// Merkle root committing to an entire batch.
    MerkleRoot,
    DIGEST_LEN
);

fixed_bytes!(
    /// Identity of a caller (an account address).
    Principal,
    PRINCIPAL_LEN
);

impl BatchId {
    /// Derive a key by hashing a human-readable batch name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self(*blake3::hash(name.as_bytes()).as_bytes())
    }
}

impl MerkleRoot {
    /// Hash arbitrary bytes into a root value. Used by tooling and tests
    /// that need a stand-in commitment.
    #[must_use]
    pub fn digest(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }
}

impl Principal {
    /// The all-zero identity. Never a valid role holder.
    pub const NULL: Self = Self([0u8; PRINCIPAL_LEN]);

    /// Check for the all-zero identity.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; PRINCIPAL_LEN]
    }

    /// Deterministic identity derived from a label (the leading bytes of its
    /// BLAKE3 hash). Convenient for fixtures and local deployments.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let hash = blake3::hash(label.as_bytes());
        let mut bytes = [0u8; PRINCIPAL_LEN];
        bytes.copy_from_slice(&hash.as_bytes()[..PRINCIPAL_LEN]);
        Self(bytes)
    }
}

/// Seconds since the Unix epoch.
///
/// Integer only; ordering is the only arithmetic the lock logic needs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Create a timestamp from seconds since the epoch.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Seconds since the epoch.
    #[must_use]
    pub const fn as_secs(self) -> u64 {
        self.0
    }

    /// Offset forward by `secs`, saturating at the maximum.
    #[must_use]
    pub const fn saturating_add(self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// TESTS
// =============================================================================
