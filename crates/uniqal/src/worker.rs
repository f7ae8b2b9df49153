use crate::{
    Counter, Error, Exclusion, GeneratorConfig, Message, PrivateSet, RandSource, Result,
    ThreadRandom, WorkerId, generate_batch,
};
use core::time::Duration;
use std::thread;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Parameters shared by every worker of a run.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub generator: GeneratorConfig,
    pub batch_size: usize,
    /// Pause after each published batch.
    pub throttle: Duration,
}

/// What a worker did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: WorkerId,
    /// Batches published to the writer.
    pub batches: u64,
    /// Values generated, before writer-side deduplication.
    pub generated: u64,
    /// `true` if the worker stopped on cancellation and sent its retirement.
    pub retired: bool,
}

/// A producer that generates batches against its private exclusion set.
///
/// Each worker owns a [`PrivateSet`] seeded from the canonical snapshot taken
/// at spawn time. It never learns about values produced by other workers or
/// accepted by the writer afterwards; collisions between workers are
/// resolved by the [`Writer`](crate::Writer).
///
/// A worker runs on its own OS thread (see [`Worker::spawn`]) and loops until
/// it observes cancellation at the top of a round:
///
/// 1. generate a batch excluding the private set,
/// 2. merge the batch into the private set,
/// 3. add the batch size to the shared [`Counter`],
/// 4. publish [`Message::Batch`], blocking on channel backpressure,
/// 5. sleep for the throttle interval.
///
/// On cancellation it sends [`Message::Retire`] as its last message. A round
/// already in progress is not interrupted, and a round that stalls in
/// [`generate_batch`] never observes cancellation.
pub struct Worker<R = ThreadRandom> {
    worker_id: WorkerId,
    settings: WorkerSettings,
    seen: PrivateSet,
    counter: Counter,
    tx: mpsc::Sender<Message>,
    shutdown_token: CancellationToken,
    rng: R,
}

impl Worker<ThreadRandom> {
    pub fn new(
        worker_id: WorkerId,
        settings: WorkerSettings,
        seen: PrivateSet,
        counter: Counter,
        tx: mpsc::Sender<Message>,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self::with_rng(
            worker_id,
            settings,
            seen,
            counter,
            tx,
            shutdown_token,
            ThreadRandom,
        )
    }
}

impl<R> Worker<R>
where
    R: RandSource + Send + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn with_rng(
        worker_id: WorkerId,
        settings: WorkerSettings,
        seen: PrivateSet,
        counter: Counter,
        tx: mpsc::Sender<Message>,
        shutdown_token: CancellationToken,
        rng: R,
    ) -> Self {
        Self {
            worker_id,
            settings,
            seen,
            counter,
            tx,
            shutdown_token,
            rng,
        }
    }

    /// Starts the worker on a dedicated, named OS thread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerSpawn`] if the thread cannot be created.
    pub fn spawn(self) -> Result<thread::JoinHandle<WorkerReport>> {
        let worker_id = self.worker_id;
        thread::Builder::new()
            .name(format!("uniqal-worker-{worker_id}"))
            .spawn(move || self.run())
            .map_err(|source| Error::WorkerSpawn { worker_id, source })
    }

    /// Runs the generation loop on the current thread until cancelled or the
    /// writer goes away.
    ///
    /// Must not be called from within an async context, since publishing uses
    /// a blocking send.
    pub fn run(mut self) -> WorkerReport {
        let worker_id = self.worker_id;
        let mut report = WorkerReport {
            worker_id,
            ..WorkerReport::default()
        };

        tracing::trace!("Worker {worker_id} started");

        loop {
            if self.shutdown_token.is_cancelled() {
                tracing::debug!("Worker {worker_id} received shutdown signal");
                break;
            }

            let batch = generate_batch(
                self.settings.batch_size,
                &self.settings.generator,
                &self.seen,
                &self.rng,
            );
            let size = batch.len() as u64;

            self.seen.extend(batch.iter().cloned());
            self.counter.add(size);
            report.generated += size;

            let message = Message::Batch {
                worker_id,
                values: batch,
            };
            if self.tx.blocking_send(message).is_err() {
                tracing::warn!("Worker {worker_id} exiting: writer channel closed");
                return report;
            }
            report.batches += 1;

            if !self.settings.throttle.is_zero() {
                thread::sleep(self.settings.throttle);
            }
        }

        if self.tx.blocking_send(Message::Retire { worker_id }).is_err() {
            tracing::error!("Worker {worker_id} failed to send retirement");
        } else {
            report.retired = true;
        }

        tracing::trace!(
            "Worker {worker_id} stopped after {} batches ({} private values)",
            report.batches,
            self.seen.generated_len()
        );
        report
    }
}

impl<R> Worker<R> {
    pub const fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    /// Whether `value` would be skipped by this worker's next round.
    pub fn excludes(&self, value: &str) -> bool {
        self.seen.excludes(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Alphabet, Value};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn settings(length: usize, alphabet: &str, batch_size: usize) -> WorkerSettings {
        WorkerSettings {
            generator: GeneratorConfig::try_new(length, Alphabet::try_from(alphabet).unwrap())
                .unwrap(),
            batch_size,
            throttle: Duration::from_millis(1),
        }
    }

    #[test]
    fn cancelled_before_start_only_retires() {
        let (tx, mut rx) = mpsc::channel(4);
        let token = CancellationToken::new();
        token.cancel();

        let counter = Counter::new();
        let worker = Worker::new(
            7,
            settings(8, "ab", 4),
            PrivateSet::default(),
            counter.clone(),
            tx,
            token,
        );
        let report = worker.run();

        assert!(report.retired);
        assert_eq!(report.batches, 0);
        assert_eq!(counter.get(), 0);
        assert_eq!(rx.try_recv().unwrap(), Message::Retire { worker_id: 7 });
    }

    #[test]
    fn worker_never_repeats_its_own_values() {
        let (tx, mut rx) = mpsc::channel(16);
        let token = CancellationToken::new();
        let counter = Counter::new();
        let worker = Worker::new(
            0,
            settings(8, "ab", 4),
            PrivateSet::default(),
            counter.clone(),
            tx,
            token.clone(),
        );

        let handle = worker.spawn().unwrap();
        let mut seen: HashSet<Value> = HashSet::new();
        let mut rounds = 0;
        loop {
            match rx.blocking_recv().unwrap() {
                Message::Batch { values, .. } => {
                    assert_eq!(values.len(), 4);
                    for value in values {
                        assert!(seen.insert(value), "worker repeated a value");
                    }
                    rounds += 1;
                    if rounds == 3 {
                        token.cancel();
                    }
                }
                Message::Retire { worker_id } => {
                    assert_eq!(worker_id, 0);
                    break;
                }
            }
        }

        let report = handle.join().unwrap();
        assert!(report.retired);
        assert_eq!(report.batches, rounds);
        assert_eq!(counter.get(), report.generated);
        assert_eq!(counter.get(), seen.len() as u64);
    }

    #[test]
    fn closed_channel_stops_without_retiring() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let worker = Worker::new(
            1,
            settings(8, "abc", 2),
            PrivateSet::default(),
            Counter::new(),
            tx,
            CancellationToken::new(),
        );
        let report = worker.run();

        assert!(!report.retired);
        assert_eq!(report.batches, 0);
        assert_eq!(report.generated, 2);
    }

    #[test]
    fn snapshot_values_are_skipped() {
        let snapshot: HashSet<Value> = ["a".to_owned(), "b".to_owned()].into();
        let (tx, _rx) = mpsc::channel(1);
        let worker = Worker::new(
            0,
            settings(1, "abc", 1),
            PrivateSet::new(Arc::new(snapshot)),
            Counter::new(),
            tx,
            CancellationToken::new(),
        );

        assert!(worker.excludes("a"));
        assert!(!worker.excludes("c"));
    }
}
