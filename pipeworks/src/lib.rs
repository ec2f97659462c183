//! # Pipeworks
//!
//! Composable asynchronous pipes with deterministic cancellation cascades.
//!
//! A [`Pipe`](pipe::Pipe) takes one typed input and reports exactly one
//! result through a completion callback, optionally handing back a
//! [`CancelSignal`](pipe::CancelSignal). Pipes compose two ways:
//!
//! - **Directly**: [`PipeExt::join`](pipe::PipeExt::join) (or `+` on
//!   [`AnyPipe`](pipe::AnyPipe)) fuses two pipes into one, short-circuiting on
//!   the first failure and routing cancellation to whichever half is running.
//! - **Through an executor**: each pipe is wrapped in a
//!   [`PipeOperation`](operation::PipeOperation), the operations are linked
//!   into a [`Pipeline`](pipeline::Pipeline), and an
//!   [`OperationQueue`](queue::OperationQueue) runs them in dependency order.
//!   A failure or cancellation anywhere upstream finishes every remaining
//!   operation with the identical error, and their pipes never run.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pipeworks::prelude::*;
//!
//! let pipeline = Pipeline::from_pipe(FnPipe::new(|s: String| Ok(s + "!")))
//!     .then_pipe(FnPipe::new(|s: String| Ok(s + "!")))?;
//! pipeline.set_input("Hello".to_string());
//!
//! let queue = OperationQueue::new(QueueConfig::default())?;
//! queue.add_operations(pipeline.operations().to_vec())?;
//! assert_eq!(pipeline.wait().await?, "Hello!!");
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod errors;
pub mod events;
pub mod observability;
pub mod operation;
pub mod pipe;
pub mod pipeline;
pub mod queue;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::errors::{PipeError, PipelineError, QueueError};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::{init_tracing, LogConfig};
    pub use crate::operation::{
        Inlet, Operation, OperationId, OperationState, Outlet, PipeOperation,
    };
    pub use crate::pipe::{
        AnyPipe, AsyncFnPipe, BlockPipe, CancelSignal, Completion, FnPipe, Pipe, PipeExt,
        PipeResult,
    };
    pub use crate::pipeline::{link, Edge, Pipeline};
    pub use crate::queue::{OperationQueue, QueueConfig};
}
