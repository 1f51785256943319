//! Deterministic key samples for benchmarks.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Seed used by the standard suite.
pub const DEFAULT_SEED: u64 = 0xBEEF_F00D;

/// Seeded RNG so runs with the same seed see the same keys.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// The keys `0..size` in random order.
pub fn shuffled_sample(size: usize, rng: &mut ChaCha8Rng) -> Vec<i64> {
    let mut keys: Vec<i64> = (0..size as i64).collect();
    keys.shuffle(rng);
    keys
}

/// A key drawn uniformly from `keys`, or `None` if it is empty.
pub fn random_key<'a>(keys: &'a [i64], rng: &mut ChaCha8Rng) -> Option<&'a i64> {
    keys.choose(rng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shuffled_sample_is_permutation() {
        let mut keys = shuffled_sample(500, &mut seeded_rng(7));
        assert_ne!(keys, (0..500).collect::<Vec<i64>>());

        keys.sort_unstable();
        assert_eq!(keys, (0..500).collect::<Vec<i64>>());
    }

    #[test]
    fn test_same_seed_same_sample() {
        let a = shuffled_sample(100, &mut seeded_rng(DEFAULT_SEED));
        let b = shuffled_sample(100, &mut seeded_rng(DEFAULT_SEED));
        assert_eq!(a, b);
    }

    #[test]
    fn test_random_key() {
        let mut rng = seeded_rng(1);
        assert!(random_key(&[], &mut rng).is_none());

        let keys = [3, 5, 8];
        for _ in 0..20 {
            assert!(keys.contains(random_key(&keys, &mut rng).unwrap()));
        }
    }
}
