//! In-memory chain engine
//!
//! Produces mining and staking templates, keeps every outstanding template in a cache keyed by
//! mine hash, and imports sealed blocks after checking parent linkage, timestamps, the
//! transaction root and the seal itself.

use crate::block_store::BlockStore;
use crate::pow::meets_difficulty;
use crate::template_pool::TemplatePool;
use crate::{GENESIS_SEED, MAX_CACHED_TEMPLATES, MINING_TEMPLATE_TTL_SECS};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use parking_lot::{Mutex, RwLock};
use sealer_types::{
    tx_root, Address, BlockHeader, BlockTemplate, ChainEngine, Clock, Hash, ImportResult, Seal,
    SealType, SealedBlock, Transaction, TransactionInfo, EMPTY_HASH,
};
use serde::Serialize;
use std::sync::Arc;

/// In-memory chain configuration
#[derive(Clone, Debug)]
pub struct InMemoryChainConfig {
    /// Genesis timestamp in unix seconds
    pub genesis_timestamp: u64,
    /// Seed carried by genesis; the first staking seed signs over it
    pub genesis_seed: Vec<u8>,
    /// First height at which staking blocks are accepted (`None` = never)
    pub staking_fork_height: Option<u64>,
    pub mining_difficulty: u128,
    pub staking_difficulty: u128,
    /// Seconds a mining template is reused while its parent is still best
    pub mining_template_ttl_secs: u64,
    /// Maximum transactions per template
    pub max_txs_per_block: usize,
    /// Outstanding templates kept per seal type
    pub max_cached_templates: usize,
    /// Coinbase written into mining templates
    pub miner_coinbase: Address,
}

impl Default for InMemoryChainConfig {
    fn default() -> Self {
        Self {
            genesis_timestamp: 1_600_000_000,
            genesis_seed: GENESIS_SEED.to_vec(),
            staking_fork_height: None,
            mining_difficulty: 1,
            staking_difficulty: 1,
            mining_template_ttl_secs: MINING_TEMPLATE_TTL_SECS,
            max_txs_per_block: 64,
            max_cached_templates: MAX_CACHED_TEMPLATES,
            miner_coinbase: Address::default(),
        }
    }
}

/// Counters exposed for tests and monitoring
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineStats {
    pub mining_templates_built: u64,
    pub staking_templates_built: u64,
    pub blocks_submitted: u64,
    pub blocks_imported: u64,
}

/// Chain engine backed by in-memory storage
pub struct InMemoryChain {
    config: InMemoryChainConfig,
    clock: Arc<dyn Clock>,
    blocks: BlockStore,
    /// Transactions waiting for a template
    pending_txs: Mutex<Vec<Transaction>>,
    /// Outstanding mining templates by mine hash
    mining_templates: TemplatePool,
    /// Outstanding staking templates by mine hash
    staking_templates: TemplatePool,
    /// Serializes imports
    import_lock: Mutex<()>,
    stats: RwLock<EngineStats>,
}

impl InMemoryChain {
    /// Create a chain holding only genesis
    pub fn new(config: InMemoryChainConfig, clock: Arc<dyn Clock>) -> Self {
        let blocks = BlockStore::new(Self::genesis_block(&config));
        Self {
            mining_templates: TemplatePool::new(config.max_cached_templates),
            staking_templates: TemplatePool::new(config.max_cached_templates),
            config,
            clock,
            blocks,
            pending_txs: Mutex::new(Vec::new()),
            import_lock: Mutex::new(()),
            stats: RwLock::new(EngineStats::default()),
        }
    }

    fn genesis_block(config: &InMemoryChainConfig) -> SealedBlock {
        SealedBlock {
            header: BlockHeader {
                number: 0,
                parent_hash: EMPTY_HASH,
                coinbase: Address::default(),
                timestamp: config.genesis_timestamp,
                difficulty: config.mining_difficulty,
                tx_root: tx_root([]),
                seal_type: SealType::ProofOfWork,
                seed: config.genesis_seed.clone(),
                signing_public_key: Vec::new(),
            },
            transactions: Vec::new(),
            seal: Seal::Work {
                nonce: Vec::new(),
                solution: Vec::new(),
            },
        }
    }

    /// Queue a transaction for the next templates
    pub fn submit_transaction(&self, tx: Transaction) {
        self.pending_txs.lock().push(tx);
    }

    /// Number of queued transactions
    pub fn pending_transaction_count(&self) -> usize {
        self.pending_txs.lock().len()
    }

    /// Get current stats
    pub fn stats(&self) -> EngineStats {
        self.stats.read().clone()
    }

    pub fn config(&self) -> &InMemoryChainConfig {
        &self.config
    }

    /// Number of outstanding (mining, staking) templates
    pub fn cached_template_counts(&self) -> (usize, usize) {
        (self.mining_templates.len(), self.staking_templates.len())
    }

    fn staking_active_at(&self, number: u64) -> bool {
        self.config
            .staking_fork_height
            .is_some_and(|fork| number >= fork)
    }

    /// Template timestamp: now, but always after the parent
    fn next_timestamp(parent: &SealedBlock, now_secs: u64) -> u64 {
        now_secs.max(parent.timestamp() + 1)
    }

    fn template_transactions(&self) -> Vec<Transaction> {
        self.pending_txs
            .lock()
            .iter()
            .take(self.config.max_txs_per_block)
            .cloned()
            .collect()
    }

    fn build_template(
        &self,
        parent: &SealedBlock,
        coinbase: Address,
        seal_type: SealType,
        seed: Vec<u8>,
        signing_public_key: Vec<u8>,
        now_secs: u64,
    ) -> Arc<BlockTemplate> {
        let transactions = self.template_transactions();
        let difficulty = match seal_type {
            SealType::ProofOfWork => self.config.mining_difficulty,
            SealType::ProofOfStake => self.config.staking_difficulty,
        };
        let header = BlockHeader {
            number: parent.number() + 1,
            parent_hash: parent.hash(),
            coinbase,
            timestamp: Self::next_timestamp(parent, now_secs),
            difficulty,
            tx_root: tx_root(transactions.iter().map(|tx| &tx.hash)),
            seal_type,
            seed,
            signing_public_key,
        };
        Arc::new(BlockTemplate::new(header, transactions))
    }

    fn validate(&self, block: &SealedBlock, parent: &SealedBlock) -> bool {
        let header = &block.header;
        if header.number != parent.number() + 1 {
            tracing::debug!("Block {} does not follow parent {}", header.number, parent.number());
            return false;
        }
        if header.timestamp <= parent.timestamp() {
            tracing::debug!("Block {} timestamp not after parent", header.number);
            return false;
        }
        if block.seal.seal_type() != header.seal_type {
            tracing::debug!("Block {} seal does not match its seal type", header.number);
            return false;
        }
        if tx_root(block.transactions.iter().map(|tx| &tx.hash)) != header.tx_root {
            tracing::debug!("Block {} transaction root mismatch", header.number);
            return false;
        }

        let mine_hash = header.mine_hash();
        match &block.seal {
            Seal::Work { nonce, solution } => {
                meets_difficulty(&mine_hash, nonce, solution, header.difficulty)
            }
            Seal::Stake { signature } => {
                self.staking_active_at(header.number)
                    && verify_signature(&header.signing_public_key, &mine_hash, signature)
            }
        }
    }

    /// Drop templates built on the old tip and transactions now on chain
    fn on_new_best(&self, block: &SealedBlock) {
        self.mining_templates.clear();
        self.staking_templates.clear();

        let mut pending = self.pending_txs.lock();
        pending.retain(|tx| !block.transactions.iter().any(|included| included.hash == tx.hash));
    }
}

impl ChainEngine for InMemoryChain {
    fn new_mining_template(
        &self,
        previous: Option<&Arc<BlockTemplate>>,
        now_secs: u64,
    ) -> Arc<BlockTemplate> {
        let best = self.blocks.best();
        let best_hash = best.hash();

        if let Some(previous) = previous {
            let age = now_secs.saturating_sub(previous.timestamp());
            if previous.header().parent_hash == best_hash
                && age < self.config.mining_template_ttl_secs
                && self.mining_templates.contains(&previous.mine_hash())
            {
                return previous.clone();
            }
        }

        let template = self.build_template(
            &best,
            self.config.miner_coinbase,
            SealType::ProofOfWork,
            Vec::new(),
            Vec::new(),
            now_secs,
        );
        self.mining_templates.insert(template.clone());
        self.stats.write().mining_templates_built += 1;

        tracing::debug!(
            "New mining template #{} ({} txs)",
            template.number(),
            template.transactions().len()
        );
        template
    }

    fn new_staking_template(
        &self,
        seed: &[u8],
        signing_public_key: &[u8],
        coinbase: &Address,
    ) -> Option<Arc<BlockTemplate>> {
        let best = self.blocks.best();
        if !self.staking_active_at(best.number() + 1) {
            return None;
        }
        if !verify_signature(signing_public_key, &self.seed(), seed) {
            tracing::debug!("Rejected staking seed: not signed over the current seed");
            return None;
        }

        let template = self.build_template(
            &best,
            *coinbase,
            SealType::ProofOfStake,
            seed.to_vec(),
            signing_public_key.to_vec(),
            self.clock.now_secs(),
        );
        self.staking_templates.insert(template.clone());
        self.stats.write().staking_templates_built += 1;

        tracing::debug!("New staking template #{}", template.number());
        Some(template)
    }

    fn cached_mining_template(&self, mine_hash: &Hash) -> Option<Arc<BlockTemplate>> {
        self.mining_templates.get(mine_hash)
    }

    fn cached_staking_template(&self, mine_hash: &Hash) -> Option<Arc<BlockTemplate>> {
        self.staking_templates.get(mine_hash)
    }

    fn add_new_block(&self, block: &SealedBlock) -> ImportResult {
        let _guard = self.import_lock.lock();
        self.stats.write().blocks_submitted += 1;

        if self.blocks.contains(&block.hash()) {
            return ImportResult::Exist;
        }
        let Some(parent) = self.blocks.get_by_hash(&block.header.parent_hash) else {
            return ImportResult::NoParent;
        };
        if !self.validate(block, &parent) {
            return ImportResult::Invalid;
        }

        let result = if self.blocks.push_best(block.clone()) {
            self.on_new_best(block);
            ImportResult::ImportedBest
        } else {
            self.blocks.insert_side(block.clone());
            ImportResult::ImportedNotBest
        };
        self.stats.write().blocks_imported += 1;
        result
    }

    fn is_staking_active(&self) -> bool {
        self.staking_active_at(self.blocks.best_number() + 1)
    }

    fn seed(&self) -> Vec<u8> {
        self.blocks
            .best_of_type(SealType::ProofOfStake)
            .map(|block| block.header.seed)
            .unwrap_or_else(|| self.config.genesis_seed.clone())
    }

    fn best_block(&self) -> SealedBlock {
        self.blocks.best()
    }

    fn block_by_number(&self, number: u64) -> Option<SealedBlock> {
        self.blocks.get_by_number(number)
    }

    fn block_by_hash(&self, hash: &Hash) -> Option<SealedBlock> {
        self.blocks.get_by_hash(hash)
    }

    fn best_mining_block(&self) -> Option<SealedBlock> {
        self.blocks.best_of_type(SealType::ProofOfWork)
    }

    fn best_staking_block(&self) -> Option<SealedBlock> {
        self.blocks.best_of_type(SealType::ProofOfStake)
    }

    fn total_difficulty_by_hash(&self, hash: &Hash) -> Option<u128> {
        self.blocks.total_difficulty(hash)
    }

    fn transaction_info(&self, tx_hash: &Hash) -> Option<TransactionInfo> {
        self.blocks.transaction_info(tx_hash)
    }
}

/// ed25519 check of `signature` over `message`; false on malformed inputs
fn verify_signature(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let Ok(raw) = <[u8; 32]>::try_from(public_key) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(&raw) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    key.verify(message, &signature).is_ok()
}
