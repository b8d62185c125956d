//! Proof-of-work check used by the in-memory engine

use sealer_types::Hash;

/// Hash a miner's seal against the template it was computed for
pub fn work_hash(mine_hash: &Hash, nonce: &[u8], solution: &[u8]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(mine_hash);
    hasher.update(&(nonce.len() as u64).to_le_bytes());
    hasher.update(nonce);
    hasher.update(solution);
    *hasher.finalize().as_bytes()
}

/// A seal meets `difficulty` when the leading 128 bits of its work hash are at most
/// `u128::MAX / difficulty`. Difficulty 0 and 1 accept every seal.
pub fn meets_difficulty(mine_hash: &Hash, nonce: &[u8], solution: &[u8], difficulty: u128) -> bool {
    let work = work_hash(mine_hash, nonce, solution);
    let mut prefix = [0u8; 16];
    prefix.copy_from_slice(&work[..16]);
    u128::from_be_bytes(prefix) <= u128::MAX / difficulty.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trivial_difficulty_accepts_everything() {
        let mine_hash = [5u8; 32];
        for nonce in 0u64..16 {
            assert!(meets_difficulty(&mine_hash, &nonce.to_le_bytes(), &[], 1));
        }
    }

    #[test]
    fn test_max_difficulty_rejects_almost_everything() {
        let mine_hash = [5u8; 32];
        let accepted = (0u64..64)
            .filter(|nonce| meets_difficulty(&mine_hash, &nonce.to_le_bytes(), &[], u128::MAX))
            .count();
        assert_eq!(accepted, 0);
    }

    #[test]
    fn test_solution_is_part_of_work() {
        let mine_hash = [5u8; 32];
        assert_ne!(
            work_hash(&mine_hash, &[1], &[2]),
            work_hash(&mine_hash, &[1], &[3])
        );
    }
}
