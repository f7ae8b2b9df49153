use crate::RandSource;
use rand::{Rng, rng};

/// A `RandSource` that uses the thread-local RNG (`rand::rng()`).
///
/// Each OS thread has its own RNG instance, so calls from multiple worker
/// threads are contention-free. This type does **not** store the RNG itself;
/// it accesses the thread-local generator on each call, which keeps it `Send`
/// and `Sync` even though the underlying `ThreadRng` is neither.
///
/// The pipeline does not rely on the RNG being cryptographically secure.
#[derive(Default, Clone, Copy, Debug)]
pub struct ThreadRandom;

impl RandSource for ThreadRandom {
    fn index(&self, bound: usize) -> usize {
        rng().random_range(0..bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_random_stays_in_bounds() {
        let rng = ThreadRandom;
        for bound in [1, 2, 7, 94] {
            for _ in 0..1_000 {
                assert!(rng.index(bound) < bound);
            }
        }
    }

    #[test]
    fn thread_random_hits_every_index() {
        let rng = ThreadRandom;
        let mut seen = [false; 4];
        for _ in 0..10_000 {
            seen[rng.index(4)] = true;
        }
        assert!(seen.iter().all(|hit| *hit));
    }
}
