//! Sealer Chain Engine - in-memory reference collaborators
//!
//! Implements the contracts consumed by the block sealer without a full node:
//! - `InMemoryChain`: block storage, template production and caching, block import
//! - `InMemoryKeystore`: ed25519 accounts with password-protected, time-limited unlocks
//!
//! Used to embed the sealer in tests and tooling.

pub mod block_store;
pub mod chain;
pub mod error;
pub mod keystore;
pub mod pow;
pub mod template_pool;

pub use block_store::BlockStore;
pub use chain::{EngineStats, InMemoryChain, InMemoryChainConfig};
pub use error::KeystoreError;
pub use keystore::InMemoryKeystore;
pub use pow::{meets_difficulty, work_hash};
pub use template_pool::TemplatePool;

/// Default seed of the genesis block; staking seeds chain from it
pub const GENESIS_SEED: [u8; 64] = [0u8; 64];

/// Seconds a mining template is reused while its parent is still the best block
pub const MINING_TEMPLATE_TTL_SECS: u64 = 1;

/// Outstanding templates the in-memory chain keeps per seal type
pub const MAX_CACHED_TEMPLATES: usize = 16;
