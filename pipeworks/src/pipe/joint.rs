//! Sequential composition of two pipes.

use super::{AnyPipe, CancelSignal, Completion, Pipe};
use crate::errors::PipeError;
use parking_lot::Mutex;
use std::ops::Add;
use std::sync::Arc;
use tracing::debug;

/// Which leg of a joint currently owns the in-flight work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leg {
    First,
    Second,
}

/// Routing state for one `begin` call on a joint.
#[derive(Debug)]
struct Flight {
    leg: Leg,
    signal: Option<CancelSignal>,
    cancelled: bool,
}

impl Flight {
    fn new() -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self {
            leg: Leg::First,
            signal: None,
            cancelled: false,
        }))
    }

    /// Stores the signal returned by `leg`, unless control has moved past it.
    ///
    /// Returns the signal back if the joint was cancelled in the meantime and
    /// it should be fired now.
    fn attach(flight: &Mutex<Self>, leg: Leg, signal: CancelSignal) -> Option<CancelSignal> {
        let mut state = flight.lock();
        if state.leg != leg {
            return None;
        }
        if state.cancelled {
            return Some(signal);
        }
        state.signal = Some(signal);
        None
    }
}

/// Two pipes fused into one: the first's success feeds the second.
///
/// A failure from the first pipe is delivered as the joint's result and the
/// second pipe is never begun.
pub struct Joint<I, M, O> {
    first: AnyPipe<I, M>,
    second: AnyPipe<M, O>,
}

impl<I, M, O> Joint<I, M, O>
where
    I: Send + 'static,
    M: Send + 'static,
    O: Send + 'static,
{
    /// Creates a joint from two erased pipes.
    #[must_use]
    pub fn new(first: AnyPipe<I, M>, second: AnyPipe<M, O>) -> Self {
        Self { first, second }
    }
}

impl<I, M, O> Clone for Joint<I, M, O> {
    fn clone(&self) -> Self {
        Self {
            first: self.first.clone(),
            second: self.second.clone(),
        }
    }
}

impl<I, M, O> std::fmt::Debug for Joint<I, M, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Joint")
            .field("first", &self.first)
            .field("second", &self.second)
            .finish()
    }
}

impl<I, M, O> Pipe for Joint<I, M, O>
where
    I: Send + 'static,
    M: Send + 'static,
    O: Send + 'static,
{
    type Input = I;
    type Output = O;

    fn begin(&self, input: I, completion: Completion<O>) -> Option<CancelSignal> {
        let flight = Flight::new();
        let second = self.second.clone();
        let handoff = Arc::clone(&flight);

        let first_signal = self.first.begin(
            input,
            Box::new(move |result| {
                let value = match result {
                    Ok(value) => value,
                    Err(error) => {
                        completion(Err(error));
                        return;
                    }
                };

                {
                    let mut state = handoff.lock();
                    if state.cancelled {
                        drop(state);
                        debug!("Joint cancelled before second leg began");
                        completion(Err(PipeError::cancelled()));
                        return;
                    }
                    state.leg = Leg::Second;
                    state.signal = None;
                }

                if let Some(signal) = second.begin(value, completion) {
                    if let Some(late) = Flight::attach(&handoff, Leg::Second, signal) {
                        late.fire();
                    }
                }
            }),
        );

        if let Some(signal) = first_signal {
            if let Some(late) = Flight::attach(&flight, Leg::First, signal) {
                late.fire();
            }
        }

        Some(CancelSignal::new(move || {
            let current = {
                let mut state = flight.lock();
                state.cancelled = true;
                state.signal.take()
            };
            if let Some(signal) = current {
                signal.fire();
            }
        }))
    }
}

/// Composition helpers available on every pipe.
pub trait PipeExt: Pipe + Sized + 'static {
    /// Erases this pipe's concrete type.
    fn erase(self) -> AnyPipe<Self::Input, Self::Output> {
        AnyPipe::new(self)
    }

    /// Feeds this pipe's output into `next`.
    fn join<P>(self, next: P) -> Joint<Self::Input, Self::Output, P::Output>
    where
        P: Pipe<Input = Self::Output> + 'static,
    {
        Joint::new(AnyPipe::new(self), AnyPipe::new(next))
    }
}

impl<P> PipeExt for P where P: Pipe + Sized + 'static {}

impl<I, M, O> Add<AnyPipe<M, O>> for AnyPipe<I, M>
where
    I: Send + 'static,
    M: Send + 'static,
    O: Send + 'static,
{
    type Output = AnyPipe<I, O>;

    fn add(self, rhs: AnyPipe<M, O>) -> Self::Output {
        AnyPipe::new(Joint::new(self, rhs))
    }
}
