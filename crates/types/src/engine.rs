//! Contracts the sealer consumes from its surroundings
//!
//! The chain engine owns storage, fork choice, difficulty and rewards. The sealer only
//! asks it for templates, looks templates up by mine hash and submits sealed blocks.

use crate::block::{BlockHeader, BlockTemplate, SealedBlock, TransactionInfo};
use crate::import::ImportResult;
use crate::primitives::{Address, Hash};
use std::sync::Arc;

/// Chain storage and import engine
pub trait ChainEngine: Send + Sync {
    /// Build (or reuse) a mining template.
    ///
    /// `previous` is whatever template the caller issued last; the engine may hand it back
    /// unchanged if it is still current.
    fn new_mining_template(
        &self,
        previous: Option<&Arc<BlockTemplate>>,
        now_secs: u64,
    ) -> Arc<BlockTemplate>;

    /// Build a staking template, or `None` if the seed or key is not usable.
    fn new_staking_template(
        &self,
        seed: &[u8],
        signing_public_key: &[u8],
        coinbase: &Address,
    ) -> Option<Arc<BlockTemplate>>;

    /// Outstanding mining template issued under `mine_hash`
    fn cached_mining_template(&self, mine_hash: &Hash) -> Option<Arc<BlockTemplate>>;

    /// Outstanding staking template issued under `mine_hash`
    fn cached_staking_template(&self, mine_hash: &Hash) -> Option<Arc<BlockTemplate>>;

    /// Admit a sealed block. Internally synchronized.
    fn add_new_block(&self, block: &SealedBlock) -> ImportResult;

    /// Whether staking blocks are accepted at the next height
    fn is_staking_active(&self) -> bool;

    /// Seed the next staking block must build on
    fn seed(&self) -> Vec<u8>;

    fn best_block(&self) -> SealedBlock;

    fn block_by_number(&self, number: u64) -> Option<SealedBlock>;

    fn block_by_hash(&self, hash: &Hash) -> Option<SealedBlock>;

    fn best_mining_block(&self) -> Option<SealedBlock>;

    fn best_staking_block(&self) -> Option<SealedBlock>;

    /// Sum of difficulties from genesis up to and including the block `hash`
    fn total_difficulty_by_hash(&self, hash: &Hash) -> Option<u128>;

    /// Inclusion of transaction `tx_hash` on the canonical chain
    fn transaction_info(&self, tx_hash: &Hash) -> Option<TransactionInfo>;
}

/// Rejects headers whose timestamp lies too far in the future
pub trait FutureTimestampValidator: Send + Sync {
    fn validate(&self, header: &BlockHeader) -> bool;
}

/// Account and key management, passed through to the RPC layer untouched
pub trait AccountManager: Send + Sync {
    /// Unlock for `timeout_secs` seconds. Returns false on unknown account or bad password.
    fn unlock_account(&self, address: &Address, password: &str, timeout_secs: u64) -> bool;

    fn lock_account(&self, address: &Address, password: &str) -> bool;

    /// Create a new account protected by `password`
    fn create_account(&self, password: &str) -> Option<Address>;

    fn accounts(&self) -> Vec<Address>;

    fn address_exists(&self, address: &Address) -> bool;
}
