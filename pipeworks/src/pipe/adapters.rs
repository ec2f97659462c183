//! Closure-backed pipes.

use super::{CancelSignal, Completion, Pipe, PipeResult};
use crate::errors::PipeError;
use parking_lot::Mutex;
use std::fmt::{self, Debug};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// A pipe that hands its input and completion straight to a closure.
///
/// The closure decides when to complete and may return a cancel signal.
pub struct BlockPipe<I, O, F> {
    block: F,
    _types: PhantomData<fn(I) -> O>,
}

impl<I, O, F> BlockPipe<I, O, F>
where
    F: Fn(I, Completion<O>) -> Option<CancelSignal> + Send + Sync,
{
    /// Creates a new block pipe.
    pub fn new(block: F) -> Self {
        Self {
            block,
            _types: PhantomData,
        }
    }
}

impl<I, O, F> Debug for BlockPipe<I, O, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockPipe").finish_non_exhaustive()
    }
}

impl<I, O, F> Pipe for BlockPipe<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I, Completion<O>) -> Option<CancelSignal> + Send + Sync,
{
    type Input = I;
    type Output = O;

    fn begin(&self, input: I, completion: Completion<O>) -> Option<CancelSignal> {
        (self.block)(input, completion)
    }
}

/// A pipe backed by a synchronous function; it completes before `begin` returns.
pub struct FnPipe<I, O, F> {
    func: F,
    _types: PhantomData<fn(I) -> O>,
}

impl<I, O, F> FnPipe<I, O, F>
where
    F: Fn(I) -> PipeResult<O> + Send + Sync,
{
    /// Creates a new function pipe.
    pub fn new(func: F) -> Self {
        Self {
            func,
            _types: PhantomData,
        }
    }
}

impl<I, O, F> Debug for FnPipe<I, O, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPipe").finish_non_exhaustive()
    }
}

impl<I, O, F> Pipe for FnPipe<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> PipeResult<O> + Send + Sync,
{
    type Input = I;
    type Output = O;

    fn begin(&self, input: I, completion: Completion<O>) -> Option<CancelSignal> {
        completion((self.func)(input));
        None
    }
}

/// A pipe backed by an async function, spawned on the current tokio runtime.
///
/// Firing the returned signal aborts the task and completes with
/// `Cancelled`; whichever of the task and the signal gets there first
/// delivers the only result.
pub struct AsyncFnPipe<I, O, F, Fut> {
    func: F,
    _types: PhantomData<fn(I) -> (O, Fut)>,
}

impl<I, O, F, Fut> AsyncFnPipe<I, O, F, Fut>
where
    F: Fn(I) -> Fut + Send + Sync,
    Fut: Future<Output = PipeResult<O>> + Send + 'static,
{
    /// Creates a new async function pipe.
    pub fn new(func: F) -> Self {
        Self {
            func,
            _types: PhantomData,
        }
    }
}

impl<I, O, F, Fut> Debug for AsyncFnPipe<I, O, F, Fut> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncFnPipe").finish_non_exhaustive()
    }
}

impl<I, O, F, Fut> Pipe for AsyncFnPipe<I, O, F, Fut>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync,
    Fut: Future<Output = PipeResult<O>> + Send + 'static,
{
    type Input = I;
    type Output = O;

    fn begin(&self, input: I, completion: Completion<O>) -> Option<CancelSignal> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                completion(Err(PipeError::from(anyhow::anyhow!(
                    "async pipe started outside a tokio runtime: {e}"
                ))));
                return None;
            }
        };

        let slot = Arc::new(Mutex::new(Some(completion)));
        let fut = (self.func)(input);

        let task_slot = Arc::clone(&slot);
        let task = runtime.spawn(async move {
            let result = fut.await;
            let completion = task_slot.lock().take();
            if let Some(completion) = completion {
                completion(result);
            }
        });

        Some(CancelSignal::new(move || {
            task.abort();
            let completion = slot.lock().take();
            if let Some(completion) = completion {
                debug!("Async pipe aborted before completing");
                completion(Err(PipeError::cancelled()));
            }
        }))
    }
}
