//! The stage contract and its composition.
//!
//! A [`Pipe`] takes one input and, some time later and on any thread, hands
//! exactly one [`PipeResult`] to the completion it was given. This module
//! provides:
//! - [`CancelSignal`], the optional best-effort abort handle a pipe returns
//! - [`AnyPipe`], an erased, shareable handle over any pipe
//! - closure adapters ([`BlockPipe`], [`FnPipe`], [`AsyncFnPipe`])
//! - [`Joint`], which fuses two pipes into one
//! - [`run`], which awaits a pipe's result as a future

mod adapters;
mod joint;
mod signal;

pub use adapters::{AsyncFnPipe, BlockPipe, FnPipe};
pub use joint::{Joint, PipeExt};
pub use signal::{CancelAction, CancelSignal};

use crate::errors::PipeError;
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;

/// The outcome of a pipe: exactly one of success or failure.
pub type PipeResult<T> = Result<T, PipeError>;

/// The callback a pipe invokes exactly once with its result.
pub type Completion<T> = Box<dyn FnOnce(PipeResult<T>) + Send + 'static>;

/// An asynchronous transformation from `Input` to `Output`.
///
/// Implementations must invoke `completion` exactly once per `begin` call,
/// either before returning or later from any thread. The returned signal,
/// if any, is a best-effort request to abort the in-flight work; a pipe that
/// honours it still owes its completion a result (typically `Cancelled`).
pub trait Pipe: Send + Sync {
    /// The value this pipe consumes.
    type Input: Send + 'static;
    /// The value this pipe produces on success.
    type Output: Send + 'static;

    /// Starts work on `input`.
    fn begin(&self, input: Self::Input, completion: Completion<Self::Output>) -> Option<CancelSignal>;
}

/// A type-erased, cheaply cloneable pipe handle.
pub struct AnyPipe<I, O> {
    inner: Arc<dyn Pipe<Input = I, Output = O>>,
}

impl<I, O> AnyPipe<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Erases a concrete pipe.
    pub fn new<P>(pipe: P) -> Self
    where
        P: Pipe<Input = I, Output = O> + 'static,
    {
        Self {
            inner: Arc::new(pipe),
        }
    }

    /// Wraps an already shared pipe.
    #[must_use]
    pub fn from_arc(pipe: Arc<dyn Pipe<Input = I, Output = O>>) -> Self {
        Self { inner: pipe }
    }
}

impl<I, O> Clone for AnyPipe<I, O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I, O> fmt::Debug for AnyPipe<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyPipe")
            .field("input", &std::any::type_name::<I>())
            .field("output", &std::any::type_name::<O>())
            .finish()
    }
}

impl<I, O> Pipe for AnyPipe<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    type Input = I;
    type Output = O;

    fn begin(&self, input: I, completion: Completion<O>) -> Option<CancelSignal> {
        self.inner.begin(input, completion)
    }
}

/// Runs a pipe to completion and returns its result.
///
/// A pipe that drops its completion without calling it resolves to
/// [`PipeError::Abandoned`].
pub async fn run<P>(pipe: &P, input: P::Input) -> PipeResult<P::Output>
where
    P: Pipe + ?Sized,
{
    let (tx, rx) = oneshot::channel();
    let _signal = pipe.begin(
        input,
        Box::new(move |result| {
            let _ = tx.send(result);
        }),
    );
    rx.await.unwrap_or(Err(PipeError::Abandoned))
}
