use crate::Value;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// A set of values that generation must avoid.
pub trait Exclusion {
    /// Returns `true` if `value` must not be produced.
    fn excludes(&self, value: &str) -> bool;
}

impl Exclusion for HashSet<Value> {
    fn excludes(&self, value: &str) -> bool {
        self.contains(value)
    }
}

impl Exclusion for BTreeSet<Value> {
    fn excludes(&self, value: &str) -> bool {
        self.contains(value)
    }
}

impl<E: Exclusion + ?Sized> Exclusion for &E {
    fn excludes(&self, value: &str) -> bool {
        (**self).excludes(value)
    }
}

/// A worker's private exclusion set.
///
/// Layers everything the worker has generated itself over a read-only
/// snapshot of the canonical set taken when the worker was spawned. The
/// snapshot is shared between workers and never refreshed, so values accepted
/// by the writer later in the run, or generated by other workers, are not
/// visible here. The writer re-validates every batch against the canonical
/// set.
#[derive(Debug, Clone, Default)]
pub struct PrivateSet {
    snapshot: Arc<HashSet<Value>>,
    generated: HashSet<Value>,
}

impl PrivateSet {
    pub fn new(snapshot: Arc<HashSet<Value>>) -> Self {
        Self {
            snapshot,
            generated: HashSet::new(),
        }
    }

    /// Records values produced by this worker. The set only grows.
    pub fn extend<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = Value>,
    {
        self.generated.extend(values);
    }

    /// Number of values this worker has generated so far.
    pub fn generated_len(&self) -> usize {
        self.generated.len()
    }

    pub fn snapshot_len(&self) -> usize {
        self.snapshot.len()
    }
}

impl Exclusion for PrivateSet {
    fn excludes(&self, value: &str) -> bool {
        self.generated.contains(value) || self.snapshot.contains(value)
    }
}
