#![doc = include_str!("../README.md")]

mod alphabet;
mod batch;
mod counter;
mod error;
mod exclusion;
mod message;
mod monitor;
mod rand;
mod random_native;
mod store;
mod supervisor;
mod worker;
mod writer;

pub use crate::alphabet::*;
pub use crate::batch::*;
pub use crate::counter::*;
pub use crate::error::*;
pub use crate::exclusion::*;
pub use crate::message::*;
pub use crate::monitor::*;
pub use crate::rand::*;
pub use crate::random_native::*;
pub use crate::store::*;
pub use crate::supervisor::*;
pub use crate::worker::*;
pub use crate::writer::*;

/// A single generated string.
///
/// Values are immutable once generated; every value in a run has the same
/// length and is drawn from the same [`Alphabet`].
pub type Value = String;
