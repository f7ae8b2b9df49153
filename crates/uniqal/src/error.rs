//! Error types for the generation pipeline.
//!
//! Every fallible operation in the crate returns [`Result`]. There is no retry
//! anywhere in the core: errors surface to the caller and end the run.
//!
//! ## Error Cases
//! - `InvalidConfig`: a generation or supervisor parameter failed validation.
//! - `Store`: reading or appending to the durable store failed.
//! - `WorkerSpawn`: the OS refused to start a worker thread.
//! - `Join`: a blocking helper task panicked or was cancelled.

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the generation pipeline.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A configuration value is out of range or inconsistent.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The durable store could not be read, opened or appended to.
    #[error("Store error: {0}")]
    Store(#[from] std::io::Error),

    /// A worker thread could not be started.
    #[error("Failed to spawn worker {worker_id}: {source}")]
    WorkerSpawn {
        worker_id: usize,
        #[source]
        source: std::io::Error,
    },

    /// A blocking helper task failed to complete.
    #[error("Join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}
