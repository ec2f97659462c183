//! Schedulable operations.
//!
//! A [`PipeOperation`] adapts one pipe into a stateful unit an executor can
//! run: it owns its input and result, moves through
//! [`OperationState`]'s `ready → executing → finished` exactly once, and can be
//! cancelled from any thread at any time. Executors see operations through
//! the object-safe [`Operation`] trait; the typed [`Inlet`] and [`Outlet`]
//! ports are what the pipeline linker uses to wire one operation's result
//! into the next one's input.

mod state;
mod unit;

pub use state::{OperationId, OperationState};
pub use unit::PipeOperation;

use crate::errors::{PipeError, PipelineError};
use crate::pipe::PipeResult;
use tokio::sync::oneshot;

/// Notification run once an operation is observably finished.
pub type FinishObserver = Box<dyn FnOnce() + Send>;

/// Logic run exactly once, with the result, as an operation finishes.
///
/// It runs before the operation reports `Finished`, so anything it does
/// (assigning the next input, cascading a failure) is visible to whoever
/// observes the transition.
pub type FinishHook<O> = Box<dyn FnOnce(&PipeResult<O>) + Send>;

/// The type-independent view of an operation used by executors.
pub trait Operation: Send + Sync {
    /// Returns the operation's identifier.
    fn id(&self) -> OperationId;

    /// Returns the operation's display name.
    fn name(&self) -> &str;

    /// Returns the externally observable state.
    fn state(&self) -> OperationState;

    /// Returns true once the operation is finished.
    fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Returns the operations that must finish before this one may start.
    fn dependencies(&self) -> Vec<OperationId>;

    /// Declares that `dependency` must finish before this operation starts.
    fn add_dependency(&self, dependency: OperationId);

    /// Starts the operation. Does nothing unless it is still ready.
    fn start(&self);

    /// Finishes the operation with `error` unless it already finished.
    ///
    /// Returns true if this call performed the transition.
    fn cancel_with(&self, error: PipeError) -> bool;

    /// Cancels with an optional reason. See [`cancel_with`](Self::cancel_with).
    fn cancel(&self, reason: Option<String>) -> bool {
        self.cancel_with(PipeError::Cancelled { reason })
    }

    /// Registers `observer` to run once finished, or runs it now if already finished.
    fn on_finished(&self, observer: FinishObserver);

    /// Returns the failure this operation finished with, if any.
    fn failure(&self) -> Option<PipeError>;
}

/// The receiving end of a link: an operation accepting input of type `I`.
pub trait Inlet<I>: Operation {
    /// Assigns the input. Returns false if the operation is no longer ready.
    fn set_input(&self, input: I) -> bool;
}

/// The producing end of a link: an operation yielding results of type `O`.
pub trait Outlet<O>: Operation {
    /// Installs the single finish hook.
    ///
    /// # Errors
    ///
    /// Fails if a hook was already installed or the operation has already
    /// begun finishing.
    fn set_finish_hook(&self, hook: FinishHook<O>) -> Result<(), PipelineError>;

    /// Returns a copy of the result once finished.
    fn result(&self) -> Option<PipeResult<O>>
    where
        O: Clone;
}

/// Resolves once `operation` is finished.
pub async fn finished<T>(operation: &T)
where
    T: Operation + ?Sized,
{
    let (tx, rx) = oneshot::channel();
    operation.on_finished(Box::new(move || {
        let _ = tx.send(());
    }));
    let _ = rx.await;
}
