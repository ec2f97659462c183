//! Event sinks for operation lifecycle observability.
//!
//! Operations report `operation.started`, `operation.completed`,
//! `operation.failed` and `operation.cancelled`; queues report
//! `queue.submitted` and `queue.drained`. Each operation and queue captures
//! the default sink when it is created unless given one explicitly.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};

use parking_lot::RwLock;
use std::sync::Arc;

static DEFAULT_SINK: RwLock<Option<Arc<dyn EventSink>>> = RwLock::new(None);

/// Installs the sink that operations and queues created from now on report to.
pub fn set_default_event_sink(sink: Arc<dyn EventSink>) {
    *DEFAULT_SINK.write() = Some(sink);
}

/// Removes the installed default sink; later operations discard their events.
pub fn clear_default_event_sink() {
    DEFAULT_SINK.write().take();
}

/// The installed default sink, or a [`NoOpEventSink`].
pub fn default_event_sink() -> Arc<dyn EventSink> {
    match &*DEFAULT_SINK.read() {
        Some(sink) => Arc::clone(sink),
        None => Arc::new(NoOpEventSink),
    }
}
