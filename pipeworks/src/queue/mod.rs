//! Reference executor for operations.
//!
//! [`OperationQueue`] accepts type-erased operations, honours their declared
//! dependencies and runs everything else in parallel on the tokio runtime it
//! was created in.

mod config;
mod executor;

pub use config::QueueConfig;
pub use executor::OperationQueue;
