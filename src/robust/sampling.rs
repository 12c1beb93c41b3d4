//! Subset draws without replacement.
use rand::seq::index;
use rand::Rng;
use smallvec::SmallVec;

/// Indices of one preliminary subset.
pub(crate) type Subset = SmallVec<[usize; 8]>;

/// Draw `k` distinct indices out of `n`, uniformly.
pub(crate) fn uniform_subset(rng: &mut impl Rng, n: usize, k: usize) -> Option<Subset> {
    if k > n {
        return None;
    }
    Some(index::sample(rng, n, k).into_iter().collect())
}

/// Draw `k` distinct indices, each draw proportional to the weight of the remaining ones.
///
/// Returns `None` when fewer than `k` weights are strictly positive or a weight is invalid.
pub(crate) fn weighted_subset(rng: &mut impl Rng, weights: &[f64], k: usize) -> Option<Subset> {
    if k > weights.iter().filter(|w| **w > 0.0).count() {
        return None;
    }
    index::sample_weighted(rng, weights.len(), |i| weights[i], k)
        .ok()
        .map(|picked| picked.into_iter().collect())
}

#[cfg(test)]
mod sampling_test {
    use itertools::Itertools;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_uniform_subset_distinct() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let s = uniform_subset(&mut rng, 10, 4).unwrap();
            assert_eq!(s.len(), 4);
            assert!(s.iter().all_unique());
            assert!(s.iter().all(|i| *i < 10));
        }
        assert!(uniform_subset(&mut rng, 3, 4).is_none());
    }

    #[test]
    fn test_weighted_subset_prefers_heavy_indices() {
        let mut rng = StdRng::seed_from_u64(42);
        let weights = [100.0, 100.0, 100.0, 0.01, 0.01, 0.01];
        let mut heavy = 0;
        for _ in 0..200 {
            let s = weighted_subset(&mut rng, &weights, 3).unwrap();
            assert!(s.iter().all_unique());
            heavy += s.iter().filter(|i| **i < 3).count();
        }
        // light indices almost never make it in
        assert!(heavy > 580);
    }

    #[test]
    fn test_weighted_subset_needs_enough_positive_weights() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(weighted_subset(&mut rng, &[1.0, 0.0, 0.0], 2).is_none());
    }
}
