//! Wiring and shutdown for a generation run.
//!
//! The [`Supervisor`] spawns the workers and the progress monitor, then drives
//! the [`Writer`] on the calling task until the run ends. Cancellation is
//! cooperative: resolving the `shutdown` future cancels a shared
//! [`CancellationToken`], each worker notices it between rounds and sends its
//! [`Message::Retire`], and the writer keeps consuming until every worker has
//! retired.

use crate::{
    Counter, Error, Flow, GeneratorConfig, Message, PrivateSet, ProgressMonitor, Result, Store,
    Value, Worker, WorkerId, WorkerReport, WorkerSettings, Writer,
};
use core::future::Future;
use core::time::Duration;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// Values per generation round unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 1000;
/// Worker pause between rounds unless configured otherwise.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(100);
/// Progress report period unless configured otherwise.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(10);
/// How long shutdown waits for retirements unless configured otherwise.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
/// Batches buffered between workers and the writer unless configured
/// otherwise.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Half the available parallelism, and at least one.
pub fn default_num_workers() -> usize {
    let cpus = std::thread::available_parallelism().map_or(1, |n| n.get());
    (cpus / 2).max(1)
}

/// Tuning for a [`Supervisor`] run.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub generator: GeneratorConfig,
    pub batch_size: usize,
    pub num_workers: usize,
    pub throttle: Duration,
    pub progress_interval: Duration,
    pub channel_capacity: usize,
    /// How long to wait for retirements after cancellation. `None` waits until
    /// every worker retires or the channel closes, which never happens if a
    /// worker is stuck in an exhausted value space.
    pub shutdown_timeout: Option<Duration>,
}

impl SupervisorConfig {
    /// Defaults for everything except the generator.
    pub fn new(generator: GeneratorConfig) -> Self {
        Self {
            generator,
            batch_size: DEFAULT_BATCH_SIZE,
            num_workers: default_num_workers(),
            throttle: DEFAULT_THROTTLE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            shutdown_timeout: Some(DEFAULT_SHUTDOWN_TIMEOUT),
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a count or period is zero.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::invalid_config("batch size must be greater than 0"));
        }
        if self.num_workers == 0 {
            return Err(Error::invalid_config(
                "number of workers must be greater than 0",
            ));
        }
        if self.channel_capacity == 0 {
            return Err(Error::invalid_config(
                "channel capacity must be greater than 0",
            ));
        }
        if self.progress_interval.is_zero() {
            return Err(Error::invalid_config(
                "progress interval must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Why the writer loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every worker sent its retirement.
    AllRetired,
    /// Every worker dropped its sender without retiring.
    ChannelClosed,
    /// `shutdown_timeout` elapsed with workers still running.
    TimedOut,
}

/// Final report of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Final [`Counter`] value: generated, not persisted.
    pub generated: u64,
    /// Values appended to the store.
    pub accepted: u64,
    /// Values the writer dropped as duplicates.
    pub rejected: u64,
    /// Batches the writer handled.
    pub batches: u64,
    /// Canonical set size at the end of the run.
    pub canonical: usize,
    pub workers: usize,
    /// Reports of the workers that were joined.
    pub reports: Vec<WorkerReport>,
    pub retired: BTreeSet<WorkerId>,
    pub stop: StopReason,
}

/// Runs workers, the progress monitor and the writer for one generation run.
pub struct Supervisor<S> {
    config: SupervisorConfig,
    canonical: HashSet<Value>,
    store: S,
    counter: Counter,
}

impl<S: Store> Supervisor<S> {
    /// `canonical` must hold every value already in `store`.
    pub fn new(config: SupervisorConfig, canonical: HashSet<Value>, store: S) -> Self {
        Self {
            config,
            canonical,
            store,
            counter: Counter::new(),
        }
    }

    /// A handle to the counter the workers of this run will update.
    pub fn counter(&self) -> Counter {
        self.counter.clone()
    }

    /// Runs until `shutdown` resolves and the workers have retired.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfig`] if the configuration is invalid.
    /// - [`Error::WorkerSpawn`] if a worker thread cannot be started.
    /// - [`Error::Store`] if the writer fails to append; workers are cancelled
    ///   and the run ends immediately.
    pub async fn run<F>(self, shutdown: F) -> Result<Summary>
    where
        F: Future<Output = ()>,
    {
        self.config.validate()?;

        let Self {
            config,
            canonical,
            store,
            counter,
        } = self;

        let shutdown_token = CancellationToken::new();
        // Any early return below stops the workers.
        let _cancel_on_exit = shutdown_token.clone().drop_guard();

        let (tx, mut rx) = mpsc::channel(config.channel_capacity);
        let snapshot = Arc::new(canonical.clone());
        let settings = WorkerSettings {
            generator: config.generator.clone(),
            batch_size: config.batch_size,
            throttle: config.throttle,
        };

        let mut handles = Vec::with_capacity(config.num_workers);
        for worker_id in 0..config.num_workers {
            let worker = Worker::new(
                worker_id,
                settings.clone(),
                PrivateSet::new(Arc::clone(&snapshot)),
                counter.clone(),
                tx.clone(),
                shutdown_token.clone(),
            );
            handles.push(worker.spawn()?);
        }
        drop(tx);
        drop(snapshot);

        tracing::info!(
            "Started {} workers (batch size {}, {} pre-existing values)",
            config.num_workers,
            config.batch_size,
            canonical.len()
        );

        let mut writer = Writer::new(canonical, store, config.num_workers);
        let monitor = ProgressMonitor::new(counter.clone(), config.progress_interval).spawn();

        let pumped = pump(
            &mut writer,
            &mut rx,
            shutdown,
            &shutdown_token,
            config.shutdown_timeout,
        )
        .await;
        monitor.abort();
        let stop = pumped?;

        let drained = writer.drain(&mut rx)?;
        if drained > 0 {
            tracing::debug!("Drained {drained} buffered messages");
        }
        writer.flush()?;
        // Unblocks any worker still waiting on a full channel.
        drop(rx);

        let retired = writer.retired().clone();
        let reports = {
            let retired = retired.clone();
            let join_all = stop == StopReason::ChannelClosed;
            tokio::task::spawn_blocking(move || join_workers(handles, &retired, join_all)).await?
        };

        let stats = writer.stats();
        let summary = Summary {
            generated: counter.get(),
            accepted: stats.accepted,
            rejected: stats.rejected,
            batches: stats.batches,
            canonical: writer.canonical_len(),
            workers: config.num_workers,
            reports,
            retired,
            stop,
        };

        tracing::info!(
            "Run finished ({:?}): {} generated, {} persisted, {} duplicates dropped",
            summary.stop,
            summary.generated,
            summary.accepted,
            summary.rejected
        );

        Ok(summary)
    }
}

/// Feeds the writer until every worker retires, the channel closes, or the
/// shutdown timeout elapses after cancellation.
async fn pump<S, F>(
    writer: &mut Writer<S>,
    rx: &mut mpsc::Receiver<Message>,
    shutdown: F,
    shutdown_token: &CancellationToken,
    shutdown_timeout: Option<Duration>,
) -> Result<StopReason>
where
    S: Store,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut cancelled = false;
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            () = &mut shutdown, if !cancelled => {
                tracing::info!(
                    "Cancellation requested, retiring {} workers",
                    writer.expected()
                );
                shutdown_token.cancel();
                cancelled = true;
                deadline = shutdown_timeout.map(|timeout| Instant::now() + timeout);
            }
            () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                let pending: Vec<WorkerId> = (0..writer.expected())
                    .filter(|id| !writer.retired().contains(id))
                    .collect();
                tracing::warn!(
                    "Shutdown timed out; workers {:?} never retired",
                    pending
                );
                return Ok(StopReason::TimedOut);
            }
            message = rx.recv() => match message {
                Some(message) => {
                    if writer.handle(message)? == Flow::Done {
                        return Ok(StopReason::AllRetired);
                    }
                }
                None => {
                    tracing::warn!("All workers stopped without retiring");
                    return Ok(StopReason::ChannelClosed);
                }
            },
        }
    }
}

/// Joins workers that are known to be done. Workers that neither retired nor
/// finished are left running detached.
fn join_workers(
    handles: Vec<JoinHandle<WorkerReport>>,
    retired: &BTreeSet<WorkerId>,
    join_all: bool,
) -> Vec<WorkerReport> {
    let mut reports = Vec::with_capacity(handles.len());

    for (worker_id, handle) in handles.into_iter().enumerate() {
        if !(join_all || retired.contains(&worker_id) || handle.is_finished()) {
            tracing::warn!("Worker {worker_id} is still generating; detaching");
            continue;
        }
        match handle.join() {
            Ok(report) => reports.push(report),
            Err(_) => tracing::error!("Worker {worker_id} panicked"),
        }
    }

    reports
}
