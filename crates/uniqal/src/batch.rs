use crate::{Exclusion, GeneratorConfig, RandSource, Value};
use std::collections::HashSet;

/// Generates `batch_size` mutually distinct values, none of which `exclude`
/// rejects.
///
/// Values are sampled with [`GeneratorConfig::sample`] and returned in the
/// order they were accepted. A candidate is discarded if it was already
/// produced by this call or is excluded.
///
/// There is no bound on the number of attempts. If fewer than `batch_size`
/// values remain outside `exclude` in the `alphabet^length` space, this call
/// never returns.
pub fn generate_batch<E, R>(
    batch_size: usize,
    config: &GeneratorConfig,
    exclude: &E,
    rng: &R,
) -> Vec<Value>
where
    E: Exclusion + ?Sized,
    R: RandSource + ?Sized,
{
    let mut batch = Vec::with_capacity(batch_size);
    let mut produced = HashSet::with_capacity(batch_size);

    while batch.len() < batch_size {
        let candidate = config.sample(&rng);
        if exclude.excludes(&candidate) || produced.contains(&candidate) {
            continue;
        }
        produced.insert(candidate.clone());
        batch.push(candidate);
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Alphabet, PrivateSet, ThreadRandom};
    use std::cell::Cell;
    use std::sync::Arc;

    /// Replays a fixed list of indices, wrapping around.
    struct Script {
        indices: Vec<usize>,
        pos: Cell<usize>,
    }

    impl Script {
        fn new(indices: &[usize]) -> Self {
            Self {
                indices: indices.to_vec(),
                pos: Cell::new(0),
            }
        }

        fn draws(&self) -> usize {
            self.pos.get()
        }
    }

    impl RandSource for Script {
        fn index(&self, bound: usize) -> usize {
            let i = self.pos.get();
            self.pos.set(i + 1);
            self.indices[i % self.indices.len()] % bound
        }
    }

    fn config(length: usize, alphabet: &str) -> GeneratorConfig {
        GeneratorConfig::try_new(length, Alphabet::try_from(alphabet).unwrap()).unwrap()
    }

    #[test]
    fn exact_fit_returns_whole_space() {
        let config = config(1, "ab");
        let batch = generate_batch(2, &config, &HashSet::<Value>::new(), &ThreadRandom);

        let got: HashSet<_> = batch.into_iter().collect();
        let want: HashSet<_> = ["a".to_owned(), "b".to_owned()].into();
        assert_eq!(got, want);
    }

    #[test]
    fn zero_batch_draws_nothing() {
        let rng = Script::new(&[0]);
        let batch = generate_batch(0, &config(4, "ab"), &HashSet::<Value>::new(), &rng);
        assert!(batch.is_empty());
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn skips_excluded_and_repeated_candidates() {
        // Candidates in draw order: "a", "a", "b", "c".
        let rng = Script::new(&[0, 0, 1, 2]);
        let exclude: HashSet<Value> = ["b".to_owned()].into();

        let batch = generate_batch(2, &config(1, "abc"), &exclude, &rng);
        assert_eq!(batch, vec!["a".to_owned(), "c".to_owned()]);
        assert_eq!(rng.draws(), 4);
    }

    #[test]
    fn values_have_configured_length_and_alphabet() {
        let config = config(12, "01");
        let batch = generate_batch(64, &config, &HashSet::<Value>::new(), &ThreadRandom);

        assert_eq!(batch.len(), 64);
        for value in &batch {
            assert_eq!(value.chars().count(), 12);
            assert!(value.chars().all(|c| c == '0' || c == '1'));
        }
        let unique: HashSet<_> = batch.iter().collect();
        assert_eq!(unique.len(), batch.len());
    }

    #[test]
    fn respects_private_snapshot() {
        let snapshot: HashSet<Value> = ["aa".to_owned(), "ab".to_owned()].into();
        let exclude = PrivateSet::new(Arc::new(snapshot));

        let batch = generate_batch(2, &config(2, "ab"), &exclude, &ThreadRandom);
        let got: HashSet<_> = batch.into_iter().collect();
        let want: HashSet<_> = ["ba".to_owned(), "bb".to_owned()].into();
        assert_eq!(got, want);
    }
}
