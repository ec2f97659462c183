//! Best-effort cancel handle returned by a stage when it begins work.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// The action run when a cancel signal fires.
pub type CancelAction = Box<dyn FnOnce() + Send>;

struct SignalInner {
    fired: AtomicBool,
    action: Mutex<Option<CancelAction>>,
}

/// A handle that asks in-flight work to stop.
///
/// Firing is idempotent: the action runs on the first [`fire`](Self::fire)
/// only, across every clone of the signal.
#[derive(Clone)]
pub struct CancelSignal {
    inner: Arc<SignalInner>,
}

impl CancelSignal {
    /// Creates a signal that runs `action` when first fired.
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            inner: Arc::new(SignalInner {
                fired: AtomicBool::new(false),
                action: Mutex::new(Some(Box::new(action))),
            }),
        }
    }

    /// Creates a signal with no action, useful for stages that cannot abort.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Fires the signal.
    ///
    /// Returns true if this call ran the action. Panics in the action are
    /// logged and suppressed.
    pub fn fire(&self) -> bool {
        if self
            .inner
            .fired
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        let action = self.inner.action.lock().take();
        if let Some(action) = action {
            if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(action)) {
                warn!("Cancel signal action panicked: {:?}", e);
            }
        }
        true
    }

    /// Returns whether the signal has fired.
    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.inner.fired.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for CancelSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelSignal")
            .field("fired", &self.is_fired())
            .finish()
    }
}
