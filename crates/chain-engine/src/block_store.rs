//! In-memory block storage using DashMap for concurrent access

use dashmap::DashMap;
use parking_lot::RwLock;
use sealer_types::{Hash, SealType, SealedBlock, TransactionInfo};
use std::sync::Arc;

/// Thread-safe in-memory block storage
///
/// Every imported block is indexed by hash; the canonical chain is tracked as an ordered list
/// of hashes so lookups by number stay O(1).
#[derive(Clone)]
pub struct BlockStore {
    /// All known blocks, canonical or not
    blocks: Arc<DashMap<Hash, SealedBlock>>,
    /// Canonical chain, index == block number
    canonical: Arc<RwLock<Vec<Hash>>>,
    /// Running difficulty sum per stored block
    total_difficulty: Arc<DashMap<Hash, u128>>,
    /// Canonical transactions: tx hash -> (block hash, index in block)
    tx_index: Arc<DashMap<Hash, (Hash, usize)>>,
}

impl BlockStore {
    /// Create a store holding only `genesis`
    pub fn new(genesis: SealedBlock) -> Self {
        let hash = genesis.hash();
        let store = Self {
            blocks: Arc::new(DashMap::new()),
            canonical: Arc::new(RwLock::new(vec![hash])),
            total_difficulty: Arc::new(DashMap::new()),
            tx_index: Arc::new(DashMap::new()),
        };
        store.index_transactions(&genesis);
        store.store(genesis);
        store
    }

    /// Get a block by hash
    pub fn get_by_hash(&self, hash: &Hash) -> Option<SealedBlock> {
        self.blocks.get(hash).map(|r| r.value().clone())
    }

    /// Get a canonical block by number
    pub fn get_by_number(&self, number: u64) -> Option<SealedBlock> {
        let hash = *self.canonical.read().get(usize::try_from(number).ok()?)?;
        self.get_by_hash(&hash)
    }

    /// Check if a block exists
    pub fn contains(&self, hash: &Hash) -> bool {
        self.blocks.contains_key(hash)
    }

    /// Hash of the canonical tip
    pub fn best_hash(&self) -> Hash {
        let canonical = self.canonical.read();
        canonical[canonical.len() - 1]
    }

    /// Canonical tip. Genesis is always present.
    pub fn best(&self) -> SealedBlock {
        let hash = self.best_hash();
        self.blocks
            .get(&hash)
            .map(|r| r.value().clone())
            .unwrap_or_else(|| unreachable!("canonical hash {:?} missing from store", hash))
    }

    /// Extend the canonical chain
    ///
    /// Returns false (storing nothing) if `block` does not build on the current tip.
    pub fn push_best(&self, block: SealedBlock) -> bool {
        let mut canonical = self.canonical.write();
        if canonical.last() != Some(&block.header.parent_hash) {
            return false;
        }
        let hash = block.hash();
        self.index_transactions(&block);
        self.store(block);
        canonical.push(hash);
        true
    }

    /// Store a block off the canonical chain
    pub fn insert_side(&self, block: SealedBlock) {
        self.store(block);
    }

    /// Difficulty sum from genesis through `hash`
    pub fn total_difficulty(&self, hash: &Hash) -> Option<u128> {
        self.total_difficulty.get(hash).map(|r| *r.value())
    }

    /// Inclusion of a canonical transaction
    pub fn transaction_info(&self, tx_hash: &Hash) -> Option<TransactionInfo> {
        let (block_hash, index) = *self.tx_index.get(tx_hash)?;
        let block = self.get_by_hash(&block_hash)?;
        let transaction = block.transactions.get(index)?.clone();
        Some(TransactionInfo {
            block_hash,
            block_number: block.number(),
            index,
            transaction,
        })
    }

    fn store(&self, block: SealedBlock) {
        let hash = block.hash();
        let parent_total = self
            .total_difficulty(&block.header.parent_hash)
            .unwrap_or(0);
        self.total_difficulty
            .insert(hash, parent_total.saturating_add(block.difficulty()));
        self.blocks.insert(hash, block);
    }

    fn index_transactions(&self, block: &SealedBlock) {
        let hash = block.hash();
        for (index, tx) in block.transactions.iter().enumerate() {
            self.tx_index.insert(tx.hash, (hash, index));
        }
    }

    /// Most recent canonical block sealed with `seal_type`
    pub fn best_of_type(&self, seal_type: SealType) -> Option<SealedBlock> {
        let canonical = self.canonical.read();
        canonical
            .iter()
            .rev()
            .filter_map(|hash| self.blocks.get(hash))
            .find(|block| block.seal_type() == seal_type)
            .map(|r| r.value().clone())
    }

    /// Height of the canonical tip
    pub fn best_number(&self) -> u64 {
        (self.canonical.read().len() - 1) as u64
    }

    /// Number of stored blocks, canonical and side
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Only genesis is stored
    pub fn is_empty(&self) -> bool {
        self.blocks.len() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealer_types::{tx_root, Address, BlockHeader, Seal, Transaction, EMPTY_HASH};

    fn block(number: u64, parent_hash: Hash, seal_type: SealType) -> SealedBlock {
        let seal = match seal_type {
            SealType::ProofOfWork => Seal::Work {
                nonce: number.to_le_bytes().to_vec(),
                solution: vec![],
            },
            SealType::ProofOfStake => Seal::Stake {
                signature: number.to_le_bytes().to_vec(),
            },
        };
        SealedBlock {
            header: BlockHeader {
                number,
                parent_hash,
                coinbase: Address::default(),
                timestamp: 100 + number,
                difficulty: 1,
                tx_root: EMPTY_HASH,
                seal_type,
                seed: vec![],
                signing_public_key: vec![],
            },
            transactions: vec![],
            seal,
        }
    }

    #[test]
    fn test_push_best_and_lookup() {
        let genesis = block(0, EMPTY_HASH, SealType::ProofOfWork);
        let store = BlockStore::new(genesis.clone());
        assert!(store.is_empty());

        let one = block(1, genesis.hash(), SealType::ProofOfStake);
        assert!(store.push_best(one.clone()));

        assert_eq!(store.best_number(), 1);
        assert_eq!(store.best(), one);
        assert_eq!(store.get_by_number(0), Some(genesis));
        assert_eq!(store.get_by_hash(&one.hash()), Some(one));
        assert_eq!(store.get_by_number(2), None);
    }

    #[test]
    fn test_push_best_rejects_non_tip_parent() {
        let genesis = block(0, EMPTY_HASH, SealType::ProofOfWork);
        let store = BlockStore::new(genesis);

        let orphan = block(1, [9u8; 32], SealType::ProofOfWork);
        assert!(!store.push_best(orphan.clone()));
        assert!(!store.contains(&orphan.hash()));
    }

    #[test]
    fn test_best_of_type() {
        let genesis = block(0, EMPTY_HASH, SealType::ProofOfWork);
        let store = BlockStore::new(genesis.clone());
        assert_eq!(store.best_of_type(SealType::ProofOfStake), None);

        let one = block(1, genesis.hash(), SealType::ProofOfStake);
        let two = block(2, one.hash(), SealType::ProofOfWork);
        store.push_best(one.clone());
        store.push_best(two.clone());

        assert_eq!(store.best_of_type(SealType::ProofOfStake), Some(one));
        assert_eq!(store.best_of_type(SealType::ProofOfWork), Some(two));
    }

    #[test]
    fn test_side_blocks_are_not_canonical() {
        let genesis = block(0, EMPTY_HASH, SealType::ProofOfWork);
        let store = BlockStore::new(genesis.clone());

        let side = block(1, genesis.hash(), SealType::ProofOfStake);
        store.insert_side(side.clone());

        assert!(store.contains(&side.hash()));
        assert_eq!(store.best_number(), 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_total_difficulty_accumulates() {
        let genesis = block(0, EMPTY_HASH, SealType::ProofOfWork);
        let store = BlockStore::new(genesis.clone());
        let one = block(1, genesis.hash(), SealType::ProofOfStake);
        let side = block(1, genesis.hash(), SealType::ProofOfWork);
        store.push_best(one.clone());
        store.insert_side(side.clone());

        assert_eq!(store.total_difficulty(&genesis.hash()), Some(1));
        assert_eq!(store.total_difficulty(&one.hash()), Some(2));
        assert_eq!(store.total_difficulty(&side.hash()), Some(2));
        assert_eq!(store.total_difficulty(&[7u8; 32]), None);
    }

    #[test]
    fn test_transaction_info_for_canonical_blocks() {
        let genesis = block(0, EMPTY_HASH, SealType::ProofOfWork);
        let store = BlockStore::new(genesis.clone());

        let txs = vec![Transaction::new(vec![1]), Transaction::new(vec![2])];
        let mut one = block(1, genesis.hash(), SealType::ProofOfWork);
        one.header.tx_root = tx_root(txs.iter().map(|tx| &tx.hash));
        one.transactions = txs.clone();
        store.push_best(one.clone());

        let info = store.transaction_info(&txs[1].hash).unwrap();
        assert_eq!(info.block_hash, one.hash());
        assert_eq!(info.block_number, 1);
        assert_eq!(info.index, 1);
        assert_eq!(info.transaction, txs[1]);

        let side_tx = Transaction::new(vec![3]);
        let mut side = block(1, genesis.hash(), SealType::ProofOfStake);
        side.transactions = vec![side_tx.clone()];
        store.insert_side(side);
        assert_eq!(store.transaction_info(&side_tx.hash), None);
    }
}
