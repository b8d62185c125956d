//! Block headers, templates and seals
//!
//! A [`BlockTemplate`] is the unsealed candidate handed to a producer. The producer computes a
//! [`Seal`] against the template's mine hash, and applying that seal yields an immutable
//! [`SealedBlock`] that can be submitted to the chain engine.

use crate::primitives::{short_hex, Address, Hash};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// How a block is sealed
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum SealType {
    /// Nonce + solution found by a miner
    ProofOfWork,
    /// Signature by a staker over the mine hash
    ProofOfStake,
}

impl SealType {
    /// Producer kind used in log lines
    pub fn label(&self) -> &'static str {
        match self {
            SealType::ProofOfWork => "mining",
            SealType::ProofOfStake => "staking",
        }
    }
}

/// A transaction carried by a block
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Transaction {
    /// blake3 of the payload
    pub hash: Hash,
    /// Opaque encoded transaction
    pub payload: Vec<u8>,
}

impl Transaction {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            hash: *blake3::hash(&payload).as_bytes(),
            payload,
        }
    }
}

/// Block header without its seal
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block height
    pub number: u64,
    /// Hash of the parent sealed block
    pub parent_hash: Hash,
    /// Reward recipient
    pub coinbase: Address,
    /// Unix seconds
    pub timestamp: u64,
    pub difficulty: u128,
    /// Root over the transaction hashes
    pub tx_root: Hash,
    pub seal_type: SealType,
    /// Staking seed; empty for mining blocks
    pub seed: Vec<u8>,
    /// Staker's ed25519 public key; empty for mining blocks
    pub signing_public_key: Vec<u8>,
}

impl BlockHeader {
    /// Hash identifying the unsealed header that a seal is computed against.
    ///
    /// Covers every header field and nothing of the seal.
    pub fn mine_hash(&self) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.number.to_le_bytes());
        hasher.update(&self.parent_hash);
        hasher.update(self.coinbase.as_bytes());
        hasher.update(&self.timestamp.to_le_bytes());
        hasher.update(&self.difficulty.to_le_bytes());
        hasher.update(&self.tx_root);
        hasher.update(&[self.seal_type as u8]);
        hasher.update(&(self.seed.len() as u64).to_le_bytes());
        hasher.update(&self.seed);
        hasher.update(&(self.signing_public_key.len() as u64).to_le_bytes());
        hasher.update(&self.signing_public_key);
        *hasher.finalize().as_bytes()
    }

    /// Timestamp in unix milliseconds
    pub fn timestamp_millis(&self) -> u64 {
        self.timestamp.saturating_mul(1000)
    }
}

/// Producer-supplied proof that finalizes a template
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum Seal {
    Work { nonce: Vec<u8>, solution: Vec<u8> },
    Stake { signature: Vec<u8> },
}

impl Seal {
    pub fn seal_type(&self) -> SealType {
        match self {
            Seal::Work { .. } => SealType::ProofOfWork,
            Seal::Stake { .. } => SealType::ProofOfStake,
        }
    }
}

/// Unsealed candidate block issued to a producer.
///
/// Templates are shared as `Arc<BlockTemplate>` between the engine's template cache and the
/// sealer. The header never changes; only the sealed flag flips.
#[derive(Debug)]
pub struct BlockTemplate {
    header: BlockHeader,
    transactions: Vec<Transaction>,
    mine_hash: Hash,
    sealed: AtomicBool,
}

impl BlockTemplate {
    pub fn new(header: BlockHeader, transactions: Vec<Transaction>) -> Self {
        let mine_hash = header.mine_hash();
        Self {
            header,
            transactions,
            mine_hash,
            sealed: AtomicBool::new(false),
        }
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn mine_hash(&self) -> Hash {
        self.mine_hash
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn timestamp(&self) -> u64 {
        self.header.timestamp
    }

    pub fn seal_type(&self) -> SealType {
        self.header.seal_type
    }

    pub fn seed(&self) -> &[u8] {
        &self.header.seed
    }

    pub fn signing_public_key(&self) -> &[u8] {
        &self.header.signing_public_key
    }

    pub fn coinbase(&self) -> &Address {
        &self.header.coinbase
    }

    /// Whether a seal has been applied to this template
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Apply a seal, marking the template sealed.
    ///
    /// The template itself stays usable, so a miner can retry with another nonce.
    pub fn seal(&self, seal: Seal) -> SealedBlock {
        self.sealed.store(true, Ordering::Release);
        self.to_sealed(seal)
    }

    /// Apply a seal unless the template was already sealed.
    ///
    /// Exactly one of any number of concurrent callers gets `Some`.
    pub fn seal_once(&self, seal: Seal) -> Option<SealedBlock> {
        self.sealed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(self.to_sealed(seal))
    }

    fn to_sealed(&self, seal: Seal) -> SealedBlock {
        SealedBlock {
            header: self.header.clone(),
            transactions: self.transactions.clone(),
            seal,
        }
    }
}

/// A template with its seal applied
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct SealedBlock {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
    pub seal: Seal,
}

impl SealedBlock {
    /// Block hash: mine hash plus the seal
    pub fn hash(&self) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.header.mine_hash());
        match &self.seal {
            Seal::Work { nonce, solution } => {
                hasher.update(&[0]);
                hasher.update(&(nonce.len() as u64).to_le_bytes());
                hasher.update(nonce);
                hasher.update(solution);
            }
            Seal::Stake { signature } => {
                hasher.update(&[1]);
                hasher.update(signature);
            }
        }
        *hasher.finalize().as_bytes()
    }

    pub fn short_hash(&self) -> String {
        short_hex(&self.hash())
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn timestamp(&self) -> u64 {
        self.header.timestamp
    }

    pub fn difficulty(&self) -> u128 {
        self.header.difficulty
    }

    pub fn seal_type(&self) -> SealType {
        self.header.seal_type
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Serialize for handing over to an import queue or RPC layer
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).expect("SealedBlock serialization should not fail")
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, borsh::io::Error> {
        borsh::from_slice(data)
    }
}

/// Where a canonical transaction was included
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInfo {
    pub block_hash: Hash,
    pub block_number: u64,
    /// Position within the block
    pub index: usize,
    pub transaction: Transaction,
}
