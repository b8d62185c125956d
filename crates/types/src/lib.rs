//! Sealer Types - shared block and template model
//!
//! This crate holds everything the sealing subsystem and a chain engine need to agree on:
//! - Block headers, templates, seals and sealed blocks
//! - Import results reported by the chain engine
//! - The engine, timestamp-rule and account-manager contracts
//! - A clock abstraction so time-based rules can be driven deterministically

pub mod block;
pub mod engine;
pub mod import;
pub mod primitives;
pub mod time;

pub use block::{
    BlockHeader, BlockTemplate, Seal, SealType, SealedBlock, Transaction, TransactionInfo,
};
pub use engine::{AccountManager, ChainEngine, FutureTimestampValidator};
pub use import::ImportResult;
pub use primitives::{short_hex, tx_root, Address, Hash, EMPTY_HASH};
pub use time::{Clock, ManualClock, SystemClock};
