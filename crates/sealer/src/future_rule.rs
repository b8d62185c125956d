//! Future-timestamp rule

use sealer_types::{BlockHeader, Clock, FutureTimestampValidator};
use std::sync::Arc;

/// Rejects headers timestamped more than `tolerance_secs` after wall-clock now
pub struct FutureBlockRule {
    clock: Arc<dyn Clock>,
    tolerance_secs: u64,
}

impl FutureBlockRule {
    pub fn new(clock: Arc<dyn Clock>, tolerance_secs: u64) -> Self {
        Self {
            clock,
            tolerance_secs,
        }
    }
}

impl FutureTimestampValidator for FutureBlockRule {
    fn validate(&self, header: &BlockHeader) -> bool {
        let limit = self.clock.now_secs().saturating_add(self.tolerance_secs);
        if header.timestamp > limit {
            tracing::debug!(
                "Block #{} timestamp {} is past the allowed limit {}",
                header.number,
                header.timestamp,
                limit
            );
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealer_types::{Address, ManualClock, SealType, EMPTY_HASH};

    fn header(timestamp: u64) -> BlockHeader {
        BlockHeader {
            number: 1,
            parent_hash: EMPTY_HASH,
            coinbase: Address::default(),
            timestamp,
            difficulty: 1,
            tx_root: EMPTY_HASH,
            seal_type: SealType::ProofOfWork,
            seed: vec![],
            signing_public_key: vec![],
        }
    }

    #[test]
    fn test_tolerance_boundary() {
        let clock = Arc::new(ManualClock::new(100_000));
        let rule = FutureBlockRule::new(clock, 1);

        assert!(rule.validate(&header(50)));
        assert!(rule.validate(&header(100)));
        assert!(rule.validate(&header(101)));
        assert!(!rule.validate(&header(102)));
    }

    #[test]
    fn test_follows_clock() {
        let clock = Arc::new(ManualClock::new(100_000));
        let rule = FutureBlockRule::new(clock.clone(), 0);
        assert!(!rule.validate(&header(105)));

        clock.set(105_000);
        assert!(rule.validate(&header(105)));
    }
}
