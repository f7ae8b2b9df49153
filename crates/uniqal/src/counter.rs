use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared count of generated values.
///
/// Workers add the size of every batch they generate, before the writer has
/// deduplicated it, so the count is an upper bound on what reached the store.
/// Cloning yields another handle to the same counter.
#[derive(Debug, Clone, Default)]
pub struct Counter {
    inner: Arc<AtomicU64>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically adds `n` and returns the new total.
    pub fn add(&self, n: u64) -> u64 {
        self.inner.fetch_add(n, Ordering::Relaxed) + n
    }

    /// Plain snapshot read; not synchronized with the writer.
    pub fn get(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}
