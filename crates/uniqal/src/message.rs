use crate::Value;

/// Identifies a worker within a single run (`0..num_workers`).
pub type WorkerId = usize;

/// A message from a worker to the writer.
///
/// Each worker's messages arrive in the order it sent them, and `Retire` is
/// always the last one, so a retirement is only counted after every batch
/// from that worker has been handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// One generation round, in the order the values were produced.
    Batch {
        worker_id: WorkerId,
        values: Vec<Value>,
    },
    /// The worker has stopped producing.
    Retire { worker_id: WorkerId },
}
