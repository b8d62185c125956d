//! Bounded pool of outstanding templates keyed by mine hash

use dashmap::DashMap;
use parking_lot::Mutex;
use sealer_types::{BlockTemplate, Hash};
use std::collections::VecDeque;
use std::sync::Arc;

/// Outstanding templates, oldest evicted first once `capacity` is reached
pub struct TemplatePool {
    templates: DashMap<Hash, Arc<BlockTemplate>>,
    /// Insertion order of the keys in `templates`
    order: Mutex<VecDeque<Hash>>,
    capacity: usize,
}

impl TemplatePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            templates: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, mine_hash: &Hash) -> Option<Arc<BlockTemplate>> {
        self.templates.get(mine_hash).map(|r| r.value().clone())
    }

    pub fn contains(&self, mine_hash: &Hash) -> bool {
        self.templates.contains_key(mine_hash)
    }

    /// Add `template`, dropping templates built on another parent and then the oldest
    /// entries beyond capacity
    pub fn insert(&self, template: Arc<BlockTemplate>) {
        let parent_hash = template.header().parent_hash;
        let mine_hash = template.mine_hash();
        let mut order = self.order.lock();

        order.retain(|hash| {
            let same_parent = self
                .templates
                .get(hash)
                .is_some_and(|t| t.header().parent_hash == parent_hash);
            if !same_parent {
                self.templates.remove(hash);
            }
            same_parent
        });

        if self.templates.insert(mine_hash, template).is_none() {
            order.push_back(mine_hash);
        }
        while order.len() > self.capacity {
            if let Some(oldest) = order.pop_front() {
                self.templates.remove(&oldest);
            }
        }
    }

    pub fn clear(&self) {
        let mut order = self.order.lock();
        self.templates.clear();
        order.clear();
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealer_types::{Address, BlockHeader, SealType, EMPTY_HASH};

    fn template(parent_hash: Hash, timestamp: u64) -> Arc<BlockTemplate> {
        let header = BlockHeader {
            number: 1,
            parent_hash,
            coinbase: Address::default(),
            timestamp,
            difficulty: 1,
            tx_root: EMPTY_HASH,
            seal_type: SealType::ProofOfWork,
            seed: vec![],
            signing_public_key: vec![],
        };
        Arc::new(BlockTemplate::new(header, vec![]))
    }

    #[test]
    fn test_oldest_evicted_at_capacity() {
        let pool = TemplatePool::new(3);
        let templates: Vec<_> = (0..5).map(|ts| template([1u8; 32], ts)).collect();
        for t in &templates {
            pool.insert(t.clone());
        }

        assert_eq!(pool.len(), 3);
        assert!(!pool.contains(&templates[0].mine_hash()));
        assert!(!pool.contains(&templates[1].mine_hash()));
        assert!(pool.get(&templates[4].mine_hash()).is_some());
    }

    #[test]
    fn test_other_parent_evicted() {
        let pool = TemplatePool::new(8);
        let stale = template([1u8; 32], 1);
        let fresh = template([2u8; 32], 1);

        pool.insert(stale.clone());
        pool.insert(fresh.clone());

        assert_eq!(pool.len(), 1);
        assert!(!pool.contains(&stale.mine_hash()));
        assert!(pool.contains(&fresh.mine_hash()));
    }

    #[test]
    fn test_reinsert_does_not_duplicate() {
        let pool = TemplatePool::new(2);
        let t = template(EMPTY_HASH, 1);
        pool.insert(t.clone());
        pool.insert(t.clone());
        pool.insert(template(EMPTY_HASH, 2));

        assert_eq!(pool.len(), 2);
        assert!(pool.contains(&t.mine_hash()));

        pool.clear();
        assert!(pool.is_empty());
    }
}
