//! Template Cache - the templates currently issued to producers
//!
//! Holds the last mining template and the last (issue time, staking template) pair. Both slots
//! are replaced whole, so a caller always sees a complete template, possibly one issued to a
//! concurrent caller.

use parking_lot::{Mutex, RwLock};
use sealer_types::{Address, BlockTemplate, ChainEngine, Clock, Hash};
use std::sync::Arc;
use std::time::Duration;

/// Most recent staking template and when it was issued
struct StakingSlot {
    /// Unix millis
    issued_at: u64,
    template: Option<Arc<BlockTemplate>>,
}

/// Caches the templates handed out to miners and stakers
pub struct TemplateCache {
    engine: Arc<dyn ChainEngine>,
    clock: Arc<dyn Clock>,
    /// Staking template freshness window in ms
    refresh_window_ms: u64,
    /// Held across the engine call so refreshes apply one at a time
    mining: Mutex<Option<Arc<BlockTemplate>>>,
    staking: RwLock<Option<StakingSlot>>,
}

impl TemplateCache {
    pub fn new(engine: Arc<dyn ChainEngine>, clock: Arc<dyn Clock>, refresh_window: Duration) -> Self {
        Self {
            engine,
            clock,
            refresh_window_ms: refresh_window.as_millis() as u64,
            mining: Mutex::new(None),
            staking: RwLock::new(None),
        }
    }

    /// Refresh the mining slot from its current value and return the result.
    ///
    /// The returned template is the one this caller must seal against.
    pub fn mining_template(&self) -> Arc<BlockTemplate> {
        let mut slot = self.mining.lock();
        let template = self
            .engine
            .new_mining_template(slot.as_ref(), self.clock.now_secs());
        *slot = Some(template.clone());
        template
    }

    /// Mining template issued last, without refreshing
    pub fn current_mining_template(&self) -> Option<Arc<BlockTemplate>> {
        self.mining.lock().clone()
    }

    /// Mine hash of a staking template for these parameters.
    ///
    /// Reuses the cached template while it matches and is within the freshness window,
    /// otherwise asks the engine for a new one. `None` when the engine produced no template.
    pub fn staking_template(
        &self,
        seed: &[u8],
        signing_public_key: &[u8],
        coinbase: &Address,
    ) -> Option<Hash> {
        if let Some(mine_hash) = self.fresh_staking_hash(seed, signing_public_key, coinbase) {
            return Some(mine_hash);
        }

        let template = self
            .engine
            .new_staking_template(seed, signing_public_key, coinbase);
        let mine_hash = template.as_ref().map(|t| t.mine_hash());

        *self.staking.write() = Some(StakingSlot {
            issued_at: self.clock.now_millis(),
            template,
        });

        if mine_hash.is_none() {
            tracing::debug!("Chain engine produced no staking template for the submitted seed");
        }
        mine_hash
    }

    fn fresh_staking_hash(
        &self,
        seed: &[u8],
        signing_public_key: &[u8],
        coinbase: &Address,
    ) -> Option<Hash> {
        let now = self.clock.now_millis();
        let slot = self.staking.read();
        let slot = slot.as_ref()?;
        let template = slot.template.as_ref()?;

        let same_request = template.seed() == seed
            && template.signing_public_key() == signing_public_key
            && template.coinbase() == coinbase;
        let fresh = now <= slot.issued_at.saturating_add(self.refresh_window_ms);

        (same_request && fresh).then(|| template.mine_hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use sealer_chain_engine::{InMemoryChain, InMemoryChainConfig};
    use sealer_types::ManualClock;

    const GENESIS_TS: u64 = 1_000_000;

    fn setup() -> (TemplateCache, Arc<InMemoryChain>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(GENESIS_TS * 1000 + 10_000));
        let chain = Arc::new(InMemoryChain::new(
            InMemoryChainConfig {
                genesis_timestamp: GENESIS_TS,
                staking_fork_height: Some(1),
                ..Default::default()
            },
            clock.clone(),
        ));
        let cache = TemplateCache::new(chain.clone(), clock.clone(), Duration::from_millis(2000));
        (cache, chain, clock)
    }

    fn staker(chain: &InMemoryChain) -> (Vec<u8>, Vec<u8>) {
        let key = SigningKey::from_bytes(&[11u8; 32]);
        let seed = key.sign(&chain.seed()).to_bytes().to_vec();
        (seed, key.verifying_key().to_bytes().to_vec())
    }

    #[test]
    fn test_staking_template_reused_within_window() {
        let (cache, chain, clock) = setup();
        let (seed, key) = staker(&chain);
        let coinbase = Address([1u8; 32]);

        let first = cache.staking_template(&seed, &key, &coinbase).unwrap();
        clock.advance(Duration::from_millis(1999));
        let second = cache.staking_template(&seed, &key, &coinbase).unwrap();
        clock.advance(Duration::from_millis(1));
        let third = cache.staking_template(&seed, &key, &coinbase).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, third);
        assert_eq!(chain.stats().staking_templates_built, 1);
    }

    #[test]
    fn test_staking_template_regenerated_after_window() {
        let (cache, chain, clock) = setup();
        let (seed, key) = staker(&chain);
        let coinbase = Address([1u8; 32]);

        cache.staking_template(&seed, &key, &coinbase).unwrap();
        clock.advance(Duration::from_millis(2001));
        let refreshed = cache.staking_template(&seed, &key, &coinbase).unwrap();
        assert_eq!(chain.stats().staking_templates_built, 2);

        // The refreshed template becomes the cached one
        assert_eq!(cache.staking_template(&seed, &key, &coinbase), Some(refreshed));
        assert_eq!(chain.stats().staking_templates_built, 2);
    }

    #[test]
    fn test_staking_template_regenerated_for_other_coinbase() {
        let (cache, chain, _) = setup();
        let (seed, key) = staker(&chain);

        let a = cache.staking_template(&seed, &key, &Address([1u8; 32])).unwrap();
        let b = cache.staking_template(&seed, &key, &Address([2u8; 32])).unwrap();

        assert_ne!(a, b);
        assert_eq!(chain.stats().staking_templates_built, 2);
    }

    #[test]
    fn test_missing_staking_template_is_not_cached() {
        let (cache, chain, _) = setup();
        let (_, key) = staker(&chain);
        let bad_seed = vec![0u8; 64];

        assert_eq!(cache.staking_template(&bad_seed, &key, &Address::default()), None);
        assert_eq!(cache.staking_template(&bad_seed, &key, &Address::default()), None);
        assert_eq!(chain.stats().staking_templates_built, 0);
    }

    #[test]
    fn test_mining_slot_tracks_latest_template() {
        let (cache, chain, clock) = setup();
        assert!(cache.current_mining_template().is_none());

        let first = cache.mining_template();
        let again = cache.mining_template();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(chain.stats().mining_templates_built, 1);

        clock.advance(Duration::from_secs(5));
        let refreshed = cache.mining_template();
        assert_ne!(refreshed.mine_hash(), first.mine_hash());

        let current = cache.current_mining_template().unwrap();
        assert!(Arc::ptr_eq(&current, &refreshed));
    }

    #[test]
    fn test_concurrent_mining_requests_share_one_template() {
        let (cache, chain, _) = setup();

        let cache = &cache;
        let hashes: Vec<Hash> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(move || cache.mining_template().mine_hash()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(hashes.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(chain.stats().mining_templates_built, 1);
    }
}
