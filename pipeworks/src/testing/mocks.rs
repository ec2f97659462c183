//! Mock pipes for testing.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::errors::PipeError;
use crate::pipe::{CancelSignal, Completion, Pipe, PipeResult};

/// A pipe that appends a fixed suffix to its input and counts invocations.
///
/// Clones share the invocation counter.
#[derive(Debug, Clone)]
pub struct AppendPipe {
    suffix: String,
    invocations: Arc<AtomicUsize>,
}

impl AppendPipe {
    /// Creates a pipe appending `suffix`.
    #[must_use]
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            invocations: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates a pipe appending `"Foo"`.
    #[must_use]
    pub fn foo() -> Self {
        Self::new("Foo")
    }

    /// Returns how many times `begin` was called.
    #[must_use]
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl Pipe for AppendPipe {
    type Input = String;
    type Output = String;

    fn begin(&self, input: String, completion: Completion<String>) -> Option<CancelSignal> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        completion(Ok(input + &self.suffix));
        None
    }
}

/// The error produced by [`FailingPipe::all_day_every_day`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FailsEveryTimeError {
    /// It always fails.
    #[error("fails all day, every day")]
    AllDayEveryDay,
}

/// A pipe that always fails with the same error instance.
pub struct FailingPipe<I = String, O = String> {
    error: PipeError,
    invocations: Arc<AtomicUsize>,
    _types: PhantomData<fn(I) -> O>,
}

impl<I, O> FailingPipe<I, O> {
    /// Creates a pipe that fails with `error`.
    #[must_use]
    pub fn new(error: PipeError) -> Self {
        Self {
            error,
            invocations: Arc::new(AtomicUsize::new(0)),
            _types: PhantomData,
        }
    }

    /// Returns the error every invocation fails with.
    #[must_use]
    pub fn error(&self) -> PipeError {
        self.error.clone()
    }

    /// Returns how many times `begin` was called.
    #[must_use]
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl FailingPipe<String, String> {
    /// Creates a string pipe failing with [`FailsEveryTimeError::AllDayEveryDay`].
    #[must_use]
    pub fn all_day_every_day() -> Self {
        Self::new(PipeError::stage(FailsEveryTimeError::AllDayEveryDay))
    }
}

impl<I, O> Clone for FailingPipe<I, O> {
    fn clone(&self) -> Self {
        Self {
            error: self.error.clone(),
            invocations: Arc::clone(&self.invocations),
            _types: PhantomData,
        }
    }
}

impl<I, O> std::fmt::Debug for FailingPipe<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailingPipe")
            .field("error", &self.error)
            .field("invocations", &self.invocations())
            .finish()
    }
}

impl<I, O> Pipe for FailingPipe<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    type Input = I;
    type Output = O;

    fn begin(&self, _input: I, completion: Completion<O>) -> Option<CancelSignal> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        completion(Err(self.error.clone()));
        None
    }
}

struct ManualState<I, O> {
    inputs: Vec<I>,
    pending: VecDeque<Completion<O>>,
}

/// A pipe whose completions are driven by the test.
///
/// Every `begin` records its input, parks its completion, and returns a
/// cancel signal that only counts how often it fired. Call
/// [`complete`](Self::complete) to deliver a result to the oldest parked
/// completion.
pub struct ManualPipe<I, O> {
    state: Arc<Mutex<ManualState<I, O>>>,
    cancels: Arc<AtomicUsize>,
}

impl<I, O> ManualPipe<I, O> {
    /// Creates a new manual pipe.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState {
                inputs: Vec::new(),
                pending: VecDeque::new(),
            })),
            cancels: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Delivers `result` to the oldest outstanding completion.
    ///
    /// Returns false if nothing was outstanding.
    pub fn complete(&self, result: PipeResult<O>) -> bool {
        let completion = self.state.lock().pending.pop_front();
        match completion {
            Some(completion) => {
                completion(result);
                true
            }
            None => false,
        }
    }

    /// Returns how many completions are outstanding.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Returns how many times a returned cancel signal fired.
    #[must_use]
    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    /// Returns the number of `begin` calls.
    #[must_use]
    pub fn invocations(&self) -> usize {
        self.state.lock().inputs.len()
    }
}

impl<I: Clone, O> ManualPipe<I, O> {
    /// Returns every input received so far.
    #[must_use]
    pub fn inputs(&self) -> Vec<I> {
        self.state.lock().inputs.clone()
    }
}

impl<I, O> Default for ManualPipe<I, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, O> Clone for ManualPipe<I, O> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            cancels: Arc::clone(&self.cancels),
        }
    }
}

impl<I, O> std::fmt::Debug for ManualPipe<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualPipe")
            .field("pending", &self.pending())
            .field("cancel_count", &self.cancel_count())
            .finish()
    }
}

impl<I, O> Pipe for ManualPipe<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    type Input = I;
    type Output = O;

    fn begin(&self, input: I, completion: Completion<O>) -> Option<CancelSignal> {
        {
            let mut state = self.state.lock();
            state.inputs.push(input);
            state.pending.push_back(completion);
        }
        let cancels = Arc::clone(&self.cancels);
        Some(CancelSignal::new(move || {
            cancels.fetch_add(1, Ordering::SeqCst);
        }))
    }
}
