//! # Core Identifiers
//!
//! Identifiers shared by the staking protocol, the orchestrator and the tooling.
//!
//! ## Clusters
//!
//! - **Accounts**: `Address`
//! - **Ledger objects**: `AssetId`, `PoolId`
//! - **Progress**: `Round`, `GroupId`

use crate::errors::IdentifierError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// A 32-byte hash (SHA-256).
pub type Hash = [u8; 32];

/// Monotonic ledger round counter.
pub type Round = u64;

/// Identifier of a fungible asset registered on the ledger.
pub type AssetId = u64;

/// Account address.
///
/// For key-held accounts this is the Ed25519 public key. Rule-held accounts
/// (escrows) use the SHA-256 of their rule, so no private key exists for them.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// The all-zero address, never a valid signer.
    pub const ZERO: Address = Address([0u8; 32]);

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short form for log lines (first four bytes).
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Derive an address from a domain tag and payload.
    pub fn derive(tag: &[u8], payload: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(tag);
        hasher.update(payload);
        Address(hasher.finalize().into())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.short())
    }
}

impl FromStr for Address {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim()).map_err(|e| IdentifierError::InvalidHex(e.to_string()))?;
        let array: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| IdentifierError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Address(array))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifier of a deployed staking pool instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(pub u64);

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier binding the legs of one atomic group.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId(pub Hash);

impl GroupId {
    /// Hash a canonical encoding of the group legs.
    pub fn from_canonical_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"qs-group");
        hasher.update(bytes);
        GroupId(hasher.finalize().into())
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupId({})", hex::encode(&self.0[..4]))
    }
}

impl Serialize for GroupId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for GroupId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let array: Hash = bytes
            .as_slice()
            .try_into()
            .map_err(|_| serde::de::Error::custom("group id must be 32 bytes"))?;
        Ok(GroupId(array))
    }
}
