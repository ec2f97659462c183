//! Predecessor → successor links between operations.

use crate::errors::{PipeError, PipelineError};
use crate::operation::{Inlet, OperationId, Outlet};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

/// A dependency edge: `to` may not start before `from` has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// The predecessor.
    pub from: OperationId,
    /// The successor.
    pub to: OperationId,
}

/// Links `upstream` to `downstream`.
///
/// Declares the dependency edge and installs `upstream`'s finish hook: on
/// success the value becomes `downstream`'s input, on failure `downstream`
/// is cancelled with the very same error. Since `downstream`'s own hook does
/// the same for its successor, a failure cascades to the end of the chain.
///
/// # Errors
///
/// Returns [`PipelineError::SelfLink`] when both ends are the same
/// operation, and propagates [`Outlet::set_finish_hook`] failures.
pub fn link<O>(upstream: &dyn Outlet<O>, downstream: Arc<dyn Inlet<O>>) -> Result<Edge, PipelineError>
where
    O: Clone + Send + 'static,
{
    let edge = Edge {
        from: upstream.id(),
        to: downstream.id(),
    };
    if edge.from == edge.to {
        return Err(PipelineError::SelfLink(edge.from));
    }

    let target = Arc::clone(&downstream);
    upstream.set_finish_hook(Box::new(move |result: &Result<O, PipeError>| match result {
        Ok(value) => {
            let handoff = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| value.clone()));
            match handoff {
                Ok(input) => {
                    if !target.set_input(input) {
                        debug!(operation = %target.id(), "Successor no longer ready; output dropped");
                    }
                }
                Err(_) => {
                    error!(from = %edge.from, to = %target.id(), "Output clone panicked; failing successor");
                    target.cancel_with(PipeError::from(anyhow!(
                        "output of operation {} could not be handed to its successor",
                        edge.from
                    )));
                }
            }
        }
        Err(error) => {
            debug!(from = %edge.from, to = %target.id(), "Cascading failure to successor");
            target.cancel_with(error.clone());
        }
    }))?;

    downstream.add_dependency(edge.from);
    Ok(edge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{OperationState, PipeOperation};
    use crate::pipe::FnPipe;
    use crate::testing::{AppendPipe, FailingPipe, FailsEveryTimeError, ManualPipe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    #[test]
    fn test_link_assigns_input_on_success() {
        let a = PipeOperation::new(AppendPipe::new("!")).with_input("hi".to_string());
        let b = PipeOperation::new(AppendPipe::new("?"));

        let edge = link::<String>(&a, Arc::new(b.clone())).unwrap();
        assert_eq!(edge, Edge { from: a.id(), to: b.id() });
        assert_eq!(b.dependencies(), vec![a.id()]);

        a.start();
        assert!(b.has_input());
        assert_eq!(b.state(), OperationState::Ready);

        b.start();
        assert_eq!(b.result().unwrap().unwrap(), "hi!?");
    }

    #[test]
    fn test_link_cascades_identical_error() {
        let failing = FailingPipe::all_day_every_day();
        let a = PipeOperation::new(failing.clone()).with_input(String::new());
        let b_pipe = AppendPipe::foo();
        let b = PipeOperation::new(b_pipe.clone());

        link::<String>(&a, Arc::new(b.clone())).unwrap();
        a.start();

        assert!(b.is_finished());
        assert!(b.failure().unwrap().same_as(&failing.error()));
        b.start();
        assert_eq!(b_pipe.invocations(), 0);
    }

    #[derive(Debug)]
    struct BrittleOutput;

    impl Clone for BrittleOutput {
        fn clone(&self) -> Self {
            panic!("clone refused");
        }
    }

    #[test]
    fn test_panicking_output_clone_fails_successor() {
        let a = PipeOperation::new(FnPipe::new(|(): ()| Ok(BrittleOutput))).with_input(());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let b = PipeOperation::new(FnPipe::new(move |_: BrittleOutput| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        link::<BrittleOutput>(&a, Arc::new(b.clone())).unwrap();
        a.start();

        assert!(a.is_finished());
        assert!(b.is_finished());
        let err = b.failure().unwrap();
        assert!(matches!(err, PipeError::Stage(_)));
        assert!(err.to_string().contains(&a.id().to_string()));
        b.start();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cascade_races_executing_successor() {
        for _ in 0..300 {
            let up_pipe: ManualPipe<String, String> = ManualPipe::new();
            let down_pipe: ManualPipe<String, String> = ManualPipe::new();
            let a = PipeOperation::new(up_pipe.clone()).with_input("a".to_string());
            let b = PipeOperation::new(down_pipe.clone()).with_input("b".to_string());
            link::<String>(&a, Arc::new(b.clone())).unwrap();

            a.start();
            b.start();
            assert_eq!(b.state(), OperationState::Executing);

            let upstream_error = PipeError::stage(FailsEveryTimeError::AllDayEveryDay);
            let barrier = Arc::new(Barrier::new(2));
            let failer = {
                let barrier = barrier.clone();
                let up_pipe = up_pipe.clone();
                let error = upstream_error.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    up_pipe.complete(Err(error));
                })
            };
            let finisher = {
                let barrier = barrier.clone();
                let down_pipe = down_pipe.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    down_pipe.complete(Ok("natural".to_string()));
                })
            };
            failer.join().unwrap();
            finisher.join().unwrap();

            assert!(a.failure().unwrap().same_as(&upstream_error));
            assert!(b.is_finished());
            match b.result().unwrap() {
                Ok(value) => {
                    assert_eq!(value, "natural");
                    assert_eq!(down_pipe.cancel_count(), 0);
                }
                Err(err) => {
                    assert!(err.same_as(&upstream_error));
                    assert_eq!(down_pipe.cancel_count(), 1);
                }
            }
        }
    }

    #[test]
    fn test_self_link_rejected() {
        let a = PipeOperation::new(AppendPipe::foo());
        assert_eq!(
            link::<String>(&a, Arc::new(a.clone())),
            Err(PipelineError::SelfLink(a.id()))
        );
    }

    #[test]
    fn test_second_successor_rejected() {
        let a = PipeOperation::new(AppendPipe::foo());
        let b = PipeOperation::new(AppendPipe::foo());
        let c = PipeOperation::new(AppendPipe::foo());

        link::<String>(&a, Arc::new(b)).unwrap();
        assert_eq!(
            link::<String>(&a, Arc::new(c.clone())),
            Err(PipelineError::AlreadyLinked(a.id()))
        );
        assert!(c.dependencies().is_empty());
    }

    #[test]
    fn test_link_from_finished_rejected() {
        let a = PipeOperation::new(AppendPipe::foo());
        a.cancel(None);

        let b = PipeOperation::new(AppendPipe::foo());
        assert_eq!(
            link::<String>(&a, Arc::new(b)),
            Err(PipelineError::AlreadyFinished(a.id()))
        );
    }
}
