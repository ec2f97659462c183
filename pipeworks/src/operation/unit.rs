//! The pipe-backed operation and its state machine.

use super::{FinishHook, FinishObserver, Inlet, Operation, OperationId, OperationState, Outlet};
use crate::errors::{PipeError, PipelineError};
use crate::events::{default_event_sink, EventSink};
use crate::pipe::{AnyPipe, CancelSignal, Pipe, PipeResult};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, error, warn};

struct Slot<I, O> {
    state: OperationState,
    /// Set by whichever caller claims the transition into `Finished`.
    finishing: bool,
    /// The claim came from a cancellation rather than the pipe's completion.
    forced: bool,
    input: Option<I>,
    output: Option<PipeResult<O>>,
    signal: Option<CancelSignal>,
    hook: Option<FinishHook<O>>,
    hooked: bool,
    observers: Vec<FinishObserver>,
    dependencies: Vec<OperationId>,
}

struct Shared<I, O> {
    id: OperationId,
    name: String,
    pipe: AnyPipe<I, O>,
    sink: RwLock<Arc<dyn EventSink>>,
    slot: Mutex<Slot<I, O>>,
}

/// A schedulable unit wrapping one pipe.
///
/// This is a cheap handle: clones refer to the same operation. The state and
/// result slot sit behind one mutex, and the transition into `Finished` is
/// claimed under it, so when the pipe's completion and a cancellation race,
/// exactly one of them decides the result and the finish hook runs once.
pub struct PipeOperation<I, O> {
    shared: Arc<Shared<I, O>>,
}

impl<I, O> PipeOperation<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Wraps `pipe` in a new ready operation.
    pub fn new<P>(pipe: P) -> Self
    where
        P: Pipe<Input = I, Output = O> + 'static,
    {
        Self::named("operation", pipe)
    }

    /// Wraps `pipe` in a new ready operation with a display name.
    pub fn named<P>(name: impl Into<String>, pipe: P) -> Self
    where
        P: Pipe<Input = I, Output = O> + 'static,
    {
        Self::from_any(name, AnyPipe::new(pipe))
    }

    /// Wraps an already erased pipe.
    pub fn from_any(name: impl Into<String>, pipe: AnyPipe<I, O>) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: OperationId::new(),
                name: name.into(),
                pipe,
                sink: RwLock::new(default_event_sink()),
                slot: Mutex::new(Slot {
                    state: OperationState::Ready,
                    finishing: false,
                    forced: false,
                    input: None,
                    output: None,
                    signal: None,
                    hook: None,
                    hooked: false,
                    observers: Vec::new(),
                    dependencies: Vec::new(),
                }),
            }),
        }
    }

    /// Assigns the input and returns the operation.
    #[must_use]
    pub fn with_input(self, input: I) -> Self {
        self.set_input(input);
        self
    }

    /// Routes this operation's lifecycle events to `sink`.
    #[must_use]
    pub fn with_event_sink(self, sink: Arc<dyn EventSink>) -> Self {
        *self.shared.sink.write() = sink;
        self
    }

    /// Returns the operation's identifier.
    #[must_use]
    pub fn id(&self) -> OperationId {
        self.shared.id
    }

    /// Returns the operation's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Returns the externally observable state.
    #[must_use]
    pub fn state(&self) -> OperationState {
        self.shared.slot.lock().state
    }

    /// Returns true once finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Assigns the input.
    ///
    /// Returns false, dropping `input`, if the operation has started or is
    /// finishing.
    pub fn set_input(&self, input: I) -> bool {
        let mut slot = self.shared.slot.lock();
        if slot.state != OperationState::Ready || slot.finishing {
            debug!(operation = %self.shared.id, "Input rejected; operation no longer ready");
            return false;
        }
        slot.input = Some(input);
        true
    }

    /// Returns true if an input is waiting to be consumed.
    #[must_use]
    pub fn has_input(&self) -> bool {
        self.shared.slot.lock().input.is_some()
    }

    /// Starts the wrapped pipe.
    ///
    /// Does nothing unless the operation is ready. Without an input the
    /// operation finishes with [`PipeError::NoInput`] and the pipe is never
    /// begun.
    pub fn start(&self) {
        Shared::start(&self.shared);
    }

    /// Cancels with an optional reason. See [`cancel_with`](Self::cancel_with).
    pub fn cancel(&self, reason: Option<String>) -> bool {
        self.cancel_with(PipeError::Cancelled { reason })
    }

    /// Finishes the operation with `error` unless it already finished.
    ///
    /// A ready operation finishes without its pipe ever being begun. An
    /// executing operation fires the pipe's cancel signal and finishes
    /// without waiting for the pipe's own completion, which is then ignored.
    /// Returns true if this call performed the transition.
    pub fn cancel_with(&self, error: PipeError) -> bool {
        self.shared.finish(Err(error), true)
    }

    /// Registers `observer` to run once finished, or runs it now if already finished.
    pub fn on_finished<F>(&self, observer: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.on_finished(Box::new(observer));
    }

    /// Returns the failure this operation finished with, if any.
    #[must_use]
    pub fn failure(&self) -> Option<PipeError> {
        match &self.shared.slot.lock().output {
            Some(Err(error)) => Some(error.clone()),
            _ => None,
        }
    }

    /// Installs the finish hook. See [`Outlet::set_finish_hook`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::AlreadyLinked`] if a hook was installed
    /// before, or [`PipelineError::AlreadyFinished`] if the operation has
    /// begun finishing.
    pub fn set_finish_hook(&self, hook: FinishHook<O>) -> Result<(), PipelineError> {
        let mut slot = self.shared.slot.lock();
        if slot.hooked {
            return Err(PipelineError::AlreadyLinked(self.shared.id));
        }
        if slot.finishing {
            return Err(PipelineError::AlreadyFinished(self.shared.id));
        }
        slot.hooked = true;
        slot.hook = Some(hook);
        Ok(())
    }

    /// Returns the operations that must finish before this one starts.
    #[must_use]
    pub fn dependencies(&self) -> Vec<OperationId> {
        self.shared.slot.lock().dependencies.clone()
    }

    /// Declares a predecessor.
    pub fn add_dependency(&self, dependency: OperationId) {
        let mut slot = self.shared.slot.lock();
        if !slot.dependencies.contains(&dependency) {
            slot.dependencies.push(dependency);
        }
    }
}

impl<I, O> PipeOperation<I, O>
where
    I: Send + 'static,
    O: Clone + Send + 'static,
{
    /// Returns a copy of the result once finished.
    #[must_use]
    pub fn result(&self) -> Option<PipeResult<O>> {
        self.shared.slot.lock().output.clone()
    }

    /// Waits for the operation to finish and returns its result.
    pub async fn wait(&self) -> PipeResult<O> {
        super::finished(self).await;
        self.result().unwrap_or(Err(PipeError::Abandoned))
    }
}

impl<I, O> Shared<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn start(this: &Arc<Self>) {
        let input = {
            let mut slot = this.slot.lock();
            if slot.state != OperationState::Ready || slot.finishing {
                debug!(operation = %this.id, state = %slot.state, "Start ignored");
                return;
            }
            let input = slot.input.take();
            if input.is_some() {
                slot.state = OperationState::Executing;
                // Emitted before releasing the claim so that no finish event
                // can overtake it.
                debug!(operation = %this.id, name = %this.name, "Operation started");
                this.emit("operation.started", None);
            }
            input
        };

        let Some(input) = input else {
            warn!(operation = %this.id, name = %this.name, "Operation started without an input");
            this.finish(Err(PipeError::NoInput), false);
            return;
        };

        let weak: Weak<Self> = Arc::downgrade(this);
        let signal = this.pipe.begin(
            input,
            Box::new(move |result| {
                if let Some(shared) = weak.upgrade() {
                    shared.finish(result, false);
                }
            }),
        );

        if let Some(signal) = signal {
            let late = {
                let mut slot = this.slot.lock();
                if !slot.finishing {
                    slot.signal = Some(signal);
                    None
                } else if slot.forced {
                    Some(signal)
                } else {
                    None
                }
            };
            // Cancelled before the pipe handed back its signal.
            if let Some(late) = late {
                late.fire();
            }
        }
    }

    /// Claims the transition into `Finished` and performs it.
    ///
    /// Returns false if another caller already claimed it.
    fn finish(&self, result: PipeResult<O>, forced: bool) -> bool {
        let (hook, signal) = {
            let mut slot = self.slot.lock();
            if slot.finishing {
                return false;
            }
            slot.finishing = true;
            slot.forced = forced;
            (slot.hook.take(), slot.signal.take())
        };

        if forced {
            if let Some(signal) = signal {
                signal.fire();
            }
        }

        if let Some(hook) = hook {
            if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| hook(&result))) {
                error!(
                    operation = %self.id,
                    name = %self.name,
                    failed = result.is_err(),
                    "Finish hook panicked; the successor may never see this result: {:?}",
                    e
                );
            }
        }

        let (event_type, error) = match &result {
            Ok(_) => ("operation.completed", None),
            Err(e) if e.is_cancelled() => ("operation.cancelled", Some(e.to_string())),
            Err(e) => ("operation.failed", Some(e.to_string())),
        };

        let observers = {
            let mut slot = self.slot.lock();
            slot.output = Some(result);
            slot.state = OperationState::Finished;
            std::mem::take(&mut slot.observers)
        };

        debug!(operation = %self.id, name = %self.name, forced, event_type, "Operation finished");
        self.emit(event_type, error);

        for observer in observers {
            if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(observer)) {
                warn!(operation = %self.id, "Finish observer panicked: {:?}", e);
            }
        }
        true
    }

    fn on_finished(&self, observer: FinishObserver) {
        {
            let mut slot = self.slot.lock();
            if slot.state != OperationState::Finished {
                slot.observers.push(observer);
                return;
            }
        }
        observer();
    }

    /// Sends a lifecycle event. May run under the slot lock, so the sink must
    /// not call back into this operation.
    fn emit(&self, event_type: &str, error: Option<String>) {
        let mut data = serde_json::json!({
            "operation_id": self.id,
            "name": self.name,
            "timestamp": Utc::now().to_rfc3339(),
        });
        if let Some(error) = error {
            data["error"] = serde_json::Value::String(error);
        }
        let sink = Arc::clone(&*self.sink.read());
        sink.try_emit(event_type, Some(data));
    }
}

impl<I, O> Clone for PipeOperation<I, O> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<I, O> fmt::Debug for PipeOperation<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.shared.slot.lock();
        f.debug_struct("PipeOperation")
            .field("id", &self.shared.id)
            .field("name", &self.shared.name)
            .field("state", &slot.state)
            .field("dependencies", &slot.dependencies)
            .finish()
    }
}

impl<I, O> Operation for PipeOperation<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn id(&self) -> OperationId {
        self.shared.id
    }

    fn name(&self) -> &str {
        &self.shared.name
    }

    fn state(&self) -> OperationState {
        Self::state(self)
    }

    fn dependencies(&self) -> Vec<OperationId> {
        Self::dependencies(self)
    }

    fn add_dependency(&self, dependency: OperationId) {
        Self::add_dependency(self, dependency);
    }

    fn start(&self) {
        Self::start(self);
    }

    fn cancel_with(&self, error: PipeError) -> bool {
        Self::cancel_with(self, error)
    }

    fn on_finished(&self, observer: FinishObserver) {
        self.shared.on_finished(observer);
    }

    fn failure(&self) -> Option<PipeError> {
        Self::failure(self)
    }
}

impl<I, O> Inlet<I> for PipeOperation<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn set_input(&self, input: I) -> bool {
        Self::set_input(self, input)
    }
}

impl<I, O> Outlet<O> for PipeOperation<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn set_finish_hook(&self, hook: FinishHook<O>) -> Result<(), PipelineError> {
        Self::set_finish_hook(self, hook)
    }

    fn result(&self) -> Option<PipeResult<O>>
    where
        O: Clone,
    {
        self.shared.slot.lock().output.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;
    use crate::pipe::Completion;
    use crate::testing::{AppendPipe, FailingPipe, ManualPipe};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    fn counting_hook<O>(counter: &Arc<AtomicUsize>) -> FinishHook<O> {
        let counter = Arc::clone(counter);
        Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_new_operation_is_ready() {
        let op = PipeOperation::new(AppendPipe::foo());
        assert_eq!(op.state(), OperationState::Ready);
        assert!(op.result().is_none());
        assert!(op.dependencies().is_empty());
    }

    #[test]
    fn test_natural_completion() {
        let op = PipeOperation::new(AppendPipe::foo()).with_input("a".to_string());
        op.start();

        assert_eq!(op.state(), OperationState::Finished);
        assert_eq!(op.result().unwrap().unwrap(), "aFoo");
    }

    #[test]
    fn test_missing_input_finishes_with_no_input() {
        let pipe = AppendPipe::foo();
        let op = PipeOperation::new(pipe.clone());
        op.start();

        assert!(op.is_finished());
        assert!(matches!(op.result(), Some(Err(PipeError::NoInput))));
        assert_eq!(pipe.invocations(), 0);
    }

    #[test]
    fn test_cancel_before_start() {
        let pipe = AppendPipe::foo();
        let op = PipeOperation::new(pipe.clone()).with_input("a".to_string());

        assert!(op.cancel(Some("shutdown".to_string())));
        op.start();

        assert!(op.is_finished());
        let err = op.failure().unwrap();
        assert_eq!(err.cancel_reason(), Some("shutdown"));
        assert_eq!(pipe.invocations(), 0);
    }

    #[test]
    fn test_recancel_is_noop() {
        let hooks = Arc::new(AtomicUsize::new(0));
        let op = PipeOperation::new(AppendPipe::foo());
        op.set_finish_hook(counting_hook(&hooks)).unwrap();

        assert!(op.cancel(Some("first".to_string())));
        assert!(!op.cancel(Some("second".to_string())));
        assert!(!op.cancel_with(PipeError::NoInput));

        assert_eq!(hooks.load(Ordering::SeqCst), 1);
        assert_eq!(op.failure().unwrap().cancel_reason(), Some("first"));
    }

    #[test]
    fn test_cancel_after_natural_finish_is_noop() {
        let op = PipeOperation::new(AppendPipe::foo()).with_input(String::new());
        op.start();

        assert!(!op.cancel(None));
        assert_eq!(op.result().unwrap().unwrap(), "Foo");
    }

    #[test]
    fn test_forced_cancel_while_executing() {
        let pipe: ManualPipe<String, String> = ManualPipe::new();
        let hooks = Arc::new(AtomicUsize::new(0));
        let op = PipeOperation::new(pipe.clone()).with_input("x".to_string());
        op.set_finish_hook(counting_hook(&hooks)).unwrap();

        op.start();
        assert_eq!(op.state(), OperationState::Executing);

        assert!(op.cancel(Some("timeout".to_string())));
        assert!(op.is_finished());
        assert_eq!(pipe.cancel_count(), 1);

        // The pipe's own late completion is ignored.
        assert!(pipe.complete(Ok("late".to_string())));
        assert_eq!(op.failure().unwrap().cancel_reason(), Some("timeout"));
        assert_eq!(hooks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_natural_completion_does_not_fire_signal() {
        let pipe: ManualPipe<String, String> = ManualPipe::new();
        let op = PipeOperation::new(pipe.clone()).with_input("x".to_string());

        op.start();
        pipe.complete(Ok("done".to_string()));

        assert_eq!(op.result().unwrap().unwrap(), "done");
        assert_eq!(pipe.cancel_count(), 0);
    }

    #[test]
    fn test_start_twice_begins_once() {
        let pipe: ManualPipe<String, String> = ManualPipe::new();
        let op = PipeOperation::new(pipe.clone()).with_input("x".to_string());

        op.start();
        op.start();

        assert_eq!(pipe.invocations(), 1);
    }

    #[test]
    fn test_set_input_rejected_after_start() {
        let pipe: ManualPipe<String, String> = ManualPipe::new();
        let op = PipeOperation::new(pipe).with_input("x".to_string());
        op.start();

        assert!(!op.set_input("y".to_string()));
    }

    #[test]
    fn test_hook_sees_result_before_finished_is_observable() {
        let op = PipeOperation::new(AppendPipe::foo()).with_input("a".to_string());
        let observed = Arc::new(parking_lot::Mutex::new(None));

        let watched = op.clone();
        let seen = observed.clone();
        op.set_finish_hook(Box::new(move |result: &PipeResult<String>| {
            *seen.lock() = Some((watched.state(), result.clone().unwrap()));
        }))
        .unwrap();
        op.start();

        let (state, value) = observed.lock().clone().unwrap();
        assert_eq!(state, OperationState::Executing);
        assert_eq!(value, "aFoo");
    }

    #[test]
    fn test_second_hook_rejected() {
        let op = PipeOperation::new(AppendPipe::foo());
        op.set_finish_hook(Box::new(|_| {})).unwrap();

        assert_eq!(
            op.set_finish_hook(Box::new(|_| {})),
            Err(PipelineError::AlreadyLinked(op.id()))
        );
    }

    #[test]
    fn test_hook_rejected_after_finish() {
        let op = PipeOperation::new(AppendPipe::foo());
        op.cancel(None);

        assert_eq!(
            op.set_finish_hook(Box::new(|_| {})),
            Err(PipelineError::AlreadyFinished(op.id()))
        );
    }

    #[test]
    fn test_observer_registered_after_finish_runs_immediately() {
        let op = PipeOperation::new(AppendPipe::foo());
        op.cancel(None);

        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = ran.clone();
        op.on_finished(move || {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stage_failure_passes_through() {
        let pipe = FailingPipe::all_day_every_day();
        let op = PipeOperation::new(pipe.clone()).with_input(String::new());
        op.start();

        assert!(op.failure().unwrap().same_as(&pipe.error()));
    }

    #[test]
    fn test_cancel_during_begin_fires_late_signal() {
        // The pipe reports its signal only after the operation was cancelled
        // from inside `begin`.
        let slot: Arc<parking_lot::Mutex<Option<PipeOperation<u8, u8>>>> =
            Arc::new(parking_lot::Mutex::new(None));
        let fired = Arc::new(AtomicUsize::new(0));

        let target = slot.clone();
        let fired_clone = fired.clone();
        let pipe = crate::pipe::BlockPipe::new(move |_input: u8, _completion: Completion<u8>| {
            if let Some(op) = target.lock().clone() {
                op.cancel(Some("mid-begin".to_string()));
            }
            let fired = fired_clone.clone();
            Some(CancelSignal::new(move || {
                fired.fetch_add(1, Ordering::SeqCst);
            }))
        });

        let op = PipeOperation::new(pipe).with_input(1);
        *slot.lock() = Some(op.clone());
        op.start();

        assert!(op.is_finished());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(op.failure().unwrap().cancel_reason(), Some("mid-begin"));
    }

    #[test]
    fn test_race_completion_against_cancel() {
        for _ in 0..200 {
            let pipe: ManualPipe<String, String> = ManualPipe::new();
            let hooks = Arc::new(AtomicUsize::new(0));
            let observers = Arc::new(AtomicUsize::new(0));
            let op = PipeOperation::new(pipe.clone()).with_input("in".to_string());
            op.set_finish_hook(counting_hook(&hooks)).unwrap();
            let observers_clone = observers.clone();
            op.on_finished(move || {
                observers_clone.fetch_add(1, Ordering::SeqCst);
            });
            op.start();

            let barrier = Arc::new(Barrier::new(2));
            let completer = {
                let barrier = barrier.clone();
                let pipe = pipe.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    pipe.complete(Ok("natural".to_string()));
                })
            };
            let canceller = {
                let barrier = barrier.clone();
                let op = op.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    op.cancel(Some("race".to_string()));
                })
            };
            completer.join().unwrap();
            canceller.join().unwrap();

            assert!(op.is_finished());
            assert_eq!(hooks.load(Ordering::SeqCst), 1);
            assert_eq!(observers.load(Ordering::SeqCst), 1);
            match op.result().unwrap() {
                Ok(value) => assert_eq!(value, "natural"),
                Err(err) => assert_eq!(err.cancel_reason(), Some("race")),
            }
        }
    }

    #[test]
    fn test_lifecycle_events() {
        let sink = Arc::new(CollectingEventSink::new());
        let ok = PipeOperation::named("ok", AppendPipe::foo())
            .with_event_sink(sink.clone())
            .with_input(String::new());
        let cancelled = PipeOperation::named("cancelled", AppendPipe::foo())
            .with_event_sink(sink.clone());
        let failed = PipeOperation::named("failed", FailingPipe::all_day_every_day())
            .with_event_sink(sink.clone())
            .with_input(String::new());

        ok.start();
        cancelled.cancel(None);
        failed.start();

        assert_eq!(
            sink.event_types(),
            vec![
                "operation.started",
                "operation.completed",
                "operation.cancelled",
                "operation.started",
                "operation.failed",
            ]
        );
        let (_, data) = &sink.events_of_type("operation.failed")[0];
        let data = data.as_ref().unwrap();
        assert_eq!(data["name"], "failed");
        assert_eq!(data["error"], "fails all day, every day");
    }

    #[test]
    fn test_started_event_precedes_racing_cancel() {
        for _ in 0..200 {
            let sink = Arc::new(CollectingEventSink::new());
            let pipe: ManualPipe<String, String> = ManualPipe::new();
            let op = PipeOperation::new(pipe)
                .with_event_sink(sink.clone())
                .with_input("in".to_string());

            let barrier = Arc::new(Barrier::new(2));
            let starter = {
                let barrier = barrier.clone();
                let op = op.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    op.start();
                })
            };
            let canceller = {
                let barrier = barrier.clone();
                let op = op.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    op.cancel(None);
                })
            };
            starter.join().unwrap();
            canceller.join().unwrap();

            let types = sink.event_types();
            assert_eq!(types.last().map(String::as_str), Some("operation.cancelled"));
            assert!(
                types == vec!["operation.cancelled"]
                    || types == vec!["operation.started", "operation.cancelled"]
            );
        }
    }

    #[test]
    fn test_panicking_hook_still_finishes() {
        let op = PipeOperation::new(FailingPipe::all_day_every_day()).with_input(String::new());
        op.set_finish_hook(Box::new(|_| panic!("hook refused"))).unwrap();
        op.start();

        assert!(op.is_finished());
        assert!(op.failure().is_some());
    }

    #[tokio::test]
    async fn test_wait_resolves_when_finished() {
        let pipe: ManualPipe<String, String> = ManualPipe::new();
        let op = PipeOperation::new(pipe.clone()).with_input("x".to_string());
        op.start();

        let waiter = {
            let op = op.clone();
            tokio::spawn(async move { op.wait().await })
        };
        tokio::task::yield_now().await;
        pipe.complete(Ok("y".to_string()));

        assert_eq!(waiter.await.unwrap().unwrap(), "y");
    }

    #[test]
    fn test_operation_trait_object() {
        let op = PipeOperation::named("dyn", AppendPipe::foo());
        let erased: Arc<dyn Operation> = Arc::new(op.clone());
        let predecessor = OperationId::new();

        erased.add_dependency(predecessor);
        erased.add_dependency(predecessor);
        assert_eq!(erased.dependencies(), vec![predecessor]);
        assert_eq!(erased.name(), "dyn");

        erased.cancel(None);
        assert!(op.is_finished());
        assert!(erased.failure().unwrap().is_cancelled());
    }
}
