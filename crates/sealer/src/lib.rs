//! Block Sealer - template coordination for external block producers
//!
//! Sits between an RPC layer and the chain engine:
//! - Hands out mining templates and caches staking templates for a short freshness window
//! - Validates submitted seals against exactly the template they were computed for
//! - Admits sealed blocks immediately, or defers future-timestamped staking blocks
//!   to a single background worker

pub mod acceptor;
pub mod config;
pub mod error;
pub mod future_rule;
pub mod holder;
pub mod outcome;
pub mod scheduler;
pub mod template_cache;


pub use acceptor::SealAcceptor;
pub use config::SealerConfig;
pub use error::{Result, SealerError};
pub use future_rule::FutureBlockRule;
pub use holder::{ChainHolder, ChainHolderBuilder};
pub use outcome::{RejectReason, SealOutcome};
pub use scheduler::DeferredSubmitter;
pub use template_cache::TemplateCache;

/// How long a staking template is reused for identical requests (ms)
pub const STAKING_TEMPLATE_REFRESH_MS: u64 = 2000;

/// How far ahead of wall-clock a mined block's timestamp may be (seconds)
pub const FUTURE_BLOCK_TOLERANCE_SECS: u64 = 1;
