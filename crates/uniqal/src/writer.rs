//! The single consumer of worker output.
//!
//! The [`Writer`] owns the canonical set and the store. It is the only
//! component that mutates either, so filtering a batch and appending the
//! survivors happen as one step with respect to every other message.

use crate::{Message, Result, Store, Value, WorkerId};
use std::collections::{BTreeSet, HashSet};
use tokio::sync::mpsc;

/// Whether the writer expects more messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Every expected worker has retired.
    Done,
}

/// Counters describing what the writer has handled so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Batches received.
    pub batches: u64,
    /// Values appended to the store.
    pub accepted: u64,
    /// Values dropped because the canonical set already held them.
    pub rejected: u64,
}

/// Deduplicates incoming batches against the canonical set and appends the
/// new values to a [`Store`].
#[derive(Debug)]
pub struct Writer<S> {
    canonical: HashSet<Value>,
    store: S,
    expected: usize,
    retired: BTreeSet<WorkerId>,
    stats: WriterStats,
}

impl<S: Store> Writer<S> {
    /// Creates a writer seeded with the values already present in `store`.
    ///
    /// `expected` is the number of distinct workers that must retire before
    /// [`Writer::handle`] reports [`Flow::Done`].
    pub fn new(canonical: HashSet<Value>, store: S, expected: usize) -> Self {
        Self {
            canonical,
            store,
            expected,
            retired: BTreeSet::new(),
            stats: WriterStats::default(),
        }
    }

    /// Handles one message.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Store`] if appending or flushing fails. The
    /// writer does not retry.
    pub fn handle(&mut self, message: Message) -> Result<Flow> {
        match message {
            Message::Batch { worker_id, values } => {
                self.accept(worker_id, values)?;
                Ok(Flow::Continue)
            }
            Message::Retire { worker_id } => Ok(self.retire(worker_id)),
        }
    }

    fn accept(&mut self, worker_id: WorkerId, values: Vec<Value>) -> Result<()> {
        self.stats.batches += 1;
        let received = values.len();

        let accepted: Vec<Value> = values
            .into_iter()
            .filter(|value| self.canonical.insert(value.clone()))
            .collect();

        let rejected = received - accepted.len();
        self.stats.rejected += rejected as u64;

        if rejected > 0 {
            tracing::debug!(worker_id, rejected, "Dropped values already in the canonical set");
        }

        if accepted.is_empty() {
            return Ok(());
        }

        self.store.append(&accepted)?;
        self.store.flush()?;
        self.stats.accepted += accepted.len() as u64;

        tracing::trace!(worker_id, accepted = accepted.len(), "Appended batch");
        Ok(())
    }

    fn retire(&mut self, worker_id: WorkerId) -> Flow {
        if !self.retired.insert(worker_id) {
            tracing::warn!("Worker {worker_id} retired more than once");
        } else {
            tracing::debug!(
                "Worker {worker_id} retired ({}/{})",
                self.retired.len(),
                self.expected
            );
        }

        if self.all_retired() {
            Flow::Done
        } else {
            Flow::Continue
        }
    }

    /// Handles every message already buffered in `rx` without waiting.
    ///
    /// # Errors
    ///
    /// Propagates the first store failure.
    pub fn drain(&mut self, rx: &mut mpsc::Receiver<Message>) -> Result<usize> {
        let mut drained = 0;
        while let Ok(message) = rx.try_recv() {
            self.handle(message)?;
            drained += 1;
        }
        Ok(drained)
    }

    /// Flushes the store.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Store`] if the flush fails.
    pub fn flush(&mut self) -> Result<()> {
        self.store.flush()
    }

    pub fn all_retired(&self) -> bool {
        self.retired.len() >= self.expected
    }

    pub fn retired(&self) -> &BTreeSet<WorkerId> {
        &self.retired
    }

    pub const fn expected(&self) -> usize {
        self.expected
    }

    pub const fn stats(&self) -> WriterStats {
        self.stats
    }

    pub fn canonical_len(&self) -> usize {
        self.canonical.len()
    }
}
