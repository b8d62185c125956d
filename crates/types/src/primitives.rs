//! Hashes and addresses

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 32-byte blake3 digest
pub type Hash = [u8; 32];

/// All-zero hash, used as the parent of genesis
pub const EMPTY_HASH: Hash = [0u8; 32];

/// Account address (coinbase, keystore entries)
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// Build an address from raw bytes handed over by the RPC layer.
    ///
    /// Returns `None` unless exactly 32 bytes are supplied.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for Address {
    fn from(raw: [u8; 32]) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// First four bytes of a hash as hex, for log lines
pub fn short_hex(hash: &Hash) -> String {
    hex::encode(&hash[..4])
}

/// Transaction root: blake3 over the ordered transaction hashes
pub fn tx_root<'a>(hashes: impl IntoIterator<Item = &'a Hash>) -> Hash {
    let mut hasher = blake3::Hasher::new();
    for hash in hashes {
        hasher.update(hash);
    }
    *hasher.finalize().as_bytes()
}
