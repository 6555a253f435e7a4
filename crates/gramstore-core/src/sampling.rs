//! # Weighted Sampling
//!
//! Count-proportional selection over candidate continuations.
//!
//! The random source is a small trait so callers can pass a seeded generator
//! (any `rand::Rng`) or a scripted source for exact, reproducible draws.

use rand::Rng;

/// A provider of uniform integers.
pub trait UniformSource {
    /// Draw a value uniformly from `[0, bound)`. `bound` is never zero.
    fn uniform_below(&mut self, bound: u64) -> u64;
}

impl<R: Rng + ?Sized> UniformSource for R {
    fn uniform_below(&mut self, bound: u64) -> u64 {
        self.random_range(0..bound)
    }
}

/// Pick one candidate with probability proportional to its weight.
///
/// Draws `r` in `[0, total)` and returns the first candidate, in the given
/// order, whose cumulative weight exceeds `r`. Returns `None` when the total
/// weight is zero.
pub fn weighted_choice<T, S>(candidates: &[(T, u64)], source: &mut S) -> Option<T>
where
    T: Copy,
    S: UniformSource + ?Sized,
{
    let total = candidates
        .iter()
        .fold(0u64, |acc, (_, weight)| acc.saturating_add(*weight));
    if total == 0 {
        return None;
    }

    let draw = source.uniform_below(total);
    let mut cumulative = 0u64;
    for (candidate, weight) in candidates {
        cumulative = cumulative.saturating_add(*weight);
        if cumulative > draw {
            return Some(*candidate);
        }
    }

    // Unreachable while draw < total; kept total so the function never panics.
    candidates.last().map(|(candidate, _)| *candidate)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Replays a fixed list of draws.
    struct Scripted(Vec<u64>);

    impl UniformSource for Scripted {
        fn uniform_below(&mut self, bound: u64) -> u64 {
            let draw = self.0.remove(0);
            assert!(draw < bound);
            draw
        }
    }

    #[test]
    fn picks_by_cumulative_weight() {
        let candidates = [('a', 1), ('b', 3), ('c', 1)];
        let mut source = Scripted(vec![0, 1, 3, 4]);

        assert_eq!(weighted_choice(&candidates, &mut source), Some('a'));
        assert_eq!(weighted_choice(&candidates, &mut source), Some('b'));
        assert_eq!(weighted_choice(&candidates, &mut source), Some('b'));
        assert_eq!(weighted_choice(&candidates, &mut source), Some('c'));
    }

    #[test]
    fn zero_weight_candidates_never_chosen() {
        let candidates = [('a', 0), ('b', 2), ('c', 0)];
        let mut source = Scripted(vec![0, 1]);

        assert_eq!(weighted_choice(&candidates, &mut source), Some('b'));
        assert_eq!(weighted_choice(&candidates, &mut source), Some('b'));
    }

    #[test]
    fn empty_or_weightless_is_none() {
        let mut source = Scripted(Vec::new());
        assert_eq!(weighted_choice::<char, _>(&[], &mut source), None);
        assert_eq!(weighted_choice(&[('a', 0)], &mut source), None);
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let candidates = [("three", 1), ("four", 1)];
        let mut first = StdRng::seed_from_u64(0);
        let mut second = StdRng::seed_from_u64(0);

        let a: Vec<_> = (0..32)
            .map(|_| weighted_choice(&candidates, &mut first))
            .collect();
        let b: Vec<_> = (0..32)
            .map(|_| weighted_choice(&candidates, &mut second))
            .collect();

        assert_eq!(a, b);
        assert!(a.contains(&Some("three")));
        assert!(a.contains(&Some("four")));
    }
}
