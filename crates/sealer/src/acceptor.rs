//! Seal Acceptor
//!
//! Validates submitted seals against the exact template they were computed for, then admits
//! the sealed block to the chain engine now or hands it to the deferred submitter.

use crate::error::{Result, SealerError};
use crate::outcome::{RejectReason, SealOutcome};
use crate::scheduler::DeferredSubmitter;
use sealer_types::{
    ChainEngine, Clock, FutureTimestampValidator, Hash, ImportResult, Seal, SealedBlock,
};
use std::sync::Arc;
use std::time::Duration;

/// Seal acceptor
pub struct SealAcceptor {
    engine: Arc<dyn ChainEngine>,
    validator: Arc<dyn FutureTimestampValidator>,
    clock: Arc<dyn Clock>,
    submitter: DeferredSubmitter,
}

impl SealAcceptor {
    /// Create an acceptor; spawns the deferred submitter on the current runtime
    pub fn new(
        engine: Arc<dyn ChainEngine>,
        validator: Arc<dyn FutureTimestampValidator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let submitter = DeferredSubmitter::spawn(engine.clone())?;
        Ok(Self {
            engine,
            validator,
            clock,
            submitter,
        })
    }

    /// Seal the cached mining template `seal_hash` with a proof of work and submit it
    pub fn submit_mining_seal(&self, nonce: &[u8], solution: &[u8], seal_hash: &Hash) -> SealOutcome {
        let Some(template) = self.engine.cached_mining_template(seal_hash) else {
            return SealOutcome::Rejected(RejectReason::UnknownTemplate);
        };

        let block = template.seal(Seal::Work {
            nonce: nonce.to_vec(),
            solution: solution.to_vec(),
        });

        if !self.validator.validate(&block.header) {
            log_rejected(&block, RejectReason::FutureTimestamp);
            return SealOutcome::Rejected(RejectReason::FutureTimestamp);
        }

        SealOutcome::from_import(import_block(self.engine.as_ref(), &block))
    }

    /// Seal the cached staking template `seal_hash` with a signature
    ///
    /// At most one signature is accepted per template. A block timestamped ahead of now is
    /// queued and reported as [`SealOutcome::Deferred`].
    pub fn submit_staking_signature(&self, signature: &[u8], seal_hash: &Hash) -> Result<SealOutcome> {
        if !self.engine.is_staking_active() {
            return Err(SealerError::StakingInactive);
        }

        let Some(template) = self.engine.cached_staking_template(seal_hash) else {
            return Ok(SealOutcome::Rejected(RejectReason::UnknownTemplate));
        };

        if template.is_sealed() {
            tracing::debug!("Staking template #{} already sealed", template.number());
            return Ok(SealOutcome::Rejected(RejectReason::AlreadySealed));
        }
        if template.mine_hash() != *seal_hash {
            tracing::debug!("Staking template #{} mine hash mismatch", template.number());
            return Ok(SealOutcome::Rejected(RejectReason::MineHashMismatch));
        }

        let Some(block) = template.seal_once(Seal::Stake {
            signature: signature.to_vec(),
        }) else {
            tracing::debug!("Staking template #{} sealed concurrently", template.number());
            return Ok(SealOutcome::Rejected(RejectReason::AlreadySealed));
        };

        let delay_millis = millis_until(block.header.timestamp_millis(), self.clock.now_millis());
        Ok(self.submit_or_defer(block, delay_millis))
    }

    /// Submit now when `delay_millis <= 0`, otherwise after `delay_millis`
    pub fn submit_or_defer(&self, block: SealedBlock, delay_millis: i64) -> SealOutcome {
        if delay_millis <= 0 {
            return SealOutcome::from_import(import_block(self.engine.as_ref(), &block));
        }

        let delay = Duration::from_millis(delay_millis as u64);
        let number = block.number();
        match self.submitter.schedule(block, delay) {
            Ok(()) => {
                tracing::info!(
                    "Staking block #{} scheduled for submission in {}ms",
                    number,
                    delay_millis
                );
                SealOutcome::Deferred { delay }
            }
            Err(e) => {
                tracing::warn!("Failed to schedule staking block #{}: {}", number, e);
                SealOutcome::Rejected(RejectReason::SubmitterClosed)
            }
        }
    }

    /// Whether a mining or staking template is cached under `seal_hash`
    pub fn can_seal(&self, seal_hash: &Hash) -> bool {
        self.engine.cached_mining_template(seal_hash).is_some()
            || self.engine.cached_staking_template(seal_hash).is_some()
    }

    /// Submit a sealed block to the chain engine
    pub fn add_new_block(&self, block: &SealedBlock) -> ImportResult {
        import_block(self.engine.as_ref(), block)
    }

    /// Cancel pending deferred submissions
    pub fn close(&self) {
        self.submitter.close();
    }

    pub fn is_closed(&self) -> bool {
        self.submitter.is_closed()
    }
}

/// Signed distance from `now_millis` to `target_millis`, saturating at the `i64` range
fn millis_until(target_millis: u64, now_millis: u64) -> i64 {
    let target = i64::try_from(target_millis).unwrap_or(i64::MAX);
    let now = i64::try_from(now_millis).unwrap_or(i64::MAX);
    target.saturating_sub(now)
}

/// Submit `block` and log the result
pub(crate) fn import_block(engine: &dyn ChainEngine, block: &SealedBlock) -> ImportResult {
    let result = engine.add_new_block(block);

    if result.is_successful() {
        tracing::info!(
            "{} block sealed to the blockchain DB <num={}, hash={}, diff={}, tx={}>",
            block.seal_type().label(),
            block.number(),
            block.short_hash(),
            block.difficulty(),
            block.transaction_count()
        );
    } else {
        tracing::debug!(
            "{} block cannot seal to the blockchain DB <num={}, hash={}, diff={}, tx={}>: {}",
            block.seal_type().label(),
            block.number(),
            block.short_hash(),
            block.difficulty(),
            block.transaction_count(),
            result
        );
    }
    result
}

fn log_rejected(block: &SealedBlock, reason: RejectReason) {
    tracing::debug!(
        "Rejected {} block <num={}, hash={}, diff={}, tx={}>: {}",
        block.seal_type().label(),
        block.number(),
        block.short_hash(),
        block.difficulty(),
        block.transaction_count(),
        reason
    );
}
