//! Property tests for the anomaly pool.
//!
//! Shuffles must only permute the catalog, and a shuffled pool hands every
//! definition out exactly once before reporting exhaustion.

use std::collections::BTreeSet;

use loopwatch_core::{AnomalyDefinition, AnomalyId, AnomalyKind};
use loopwatch_world::AnomalyPool;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn catalog(size: usize) -> Vec<AnomalyDefinition> {
    (0..size)
        .map(|index| AnomalyDefinition::new(format!("anomaly-{index}"), AnomalyKind::VoidMuseum))
        .collect()
}

proptest! {
    #[test]
    fn shuffle_is_a_permutation(size in 0..40usize, seed in any::<u64>(), rounds in 1..5usize) {
        let mut pool = AnomalyPool::new(catalog(size)).expect("catalog fits");
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        for _ in 0..rounds {
            pool.shuffle(&mut rng);
        }

        let mut order: Vec<u32> = pool.order().iter().map(AnomalyId::get).collect();
        order.sort_unstable();
        let expected: Vec<u32> = (0..size as u32).collect();
        prop_assert_eq!(order, expected);
    }

    #[test]
    fn generate_never_repeats_within_a_cycle(
        size in 0..20usize,
        extra in 1..10usize,
        seed in any::<u64>(),
    ) {
        let mut pool = AnomalyPool::new(catalog(size)).expect("catalog fits");
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        pool.shuffle(&mut rng);

        let mut seen = BTreeSet::new();
        for _ in 0..size {
            let id = pool.generate_next();
            prop_assert!(id.is_some());
            prop_assert!(seen.insert(id));
        }
        for _ in 0..extra {
            prop_assert_eq!(pool.generate_next(), None);
            prop_assert!(pool.active().is_none());
        }
    }

    #[test]
    fn generation_follows_the_shuffled_order(size in 1..20usize, seed in any::<u64>()) {
        let mut pool = AnomalyPool::new(catalog(size)).expect("catalog fits");
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        pool.shuffle(&mut rng);

        let order = pool.order();
        let handed: Vec<AnomalyId> = std::iter::from_fn(|| pool.generate_next()).collect();
        prop_assert_eq!(handed, order);
    }

    #[test]
    fn same_seed_yields_the_same_order(size in 0..30usize, seed in any::<u64>()) {
        let shuffled = |seed: u64| {
            let mut pool = AnomalyPool::new(catalog(size)).expect("catalog fits");
            pool.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
            pool.order()
        };
        prop_assert_eq!(shuffled(seed), shuffled(seed));
    }
}
