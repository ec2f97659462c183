//! Dependency-aware operation queue on tokio.

use super::QueueConfig;
use crate::errors::{PipeError, QueueError};
use crate::events::{default_event_sink, EventSink};
use crate::operation::{finished, Operation, OperationId};
use dashmap::DashMap;
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Runs submitted operations once all their dependencies have finished.
///
/// Every submitted operation gets its own task: it waits for each declared
/// predecessor's finish notification, takes a concurrency permit if the queue
/// is bounded, starts the operation and keeps the permit until the operation
/// finishes. Operations without a dependency path between them run in
/// parallel with no ordering guarantee.
pub struct OperationQueue {
    config: QueueConfig,
    handle: Handle,
    operations: DashMap<OperationId, Arc<dyn Operation>>,
    permits: Option<Arc<Semaphore>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    sink: Arc<dyn EventSink>,
}

impl OperationQueue {
    /// Creates a queue bound to the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidConfig`] if `config` fails validation, or
    /// [`QueueError::NoRuntime`] when called outside a runtime.
    pub fn new(config: QueueConfig) -> Result<Self, QueueError> {
        config.validate()?;
        let handle = Handle::try_current().map_err(|_| QueueError::NoRuntime)?;
        let permits = config
            .max_concurrent_operations
            .map(|max| Arc::new(Semaphore::new(max)));

        Ok(Self {
            config,
            handle,
            operations: DashMap::new(),
            permits,
            tasks: Mutex::new(Vec::new()),
            sink: default_event_sink(),
        })
    }

    /// Routes queue events to `sink`.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the queue configuration.
    #[must_use]
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Returns the queue name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns how many operations were ever submitted.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    /// Returns how many submitted operations have not finished yet.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.operations.iter().filter(|op| !op.is_finished()).count()
    }

    /// Submits a batch of operations.
    ///
    /// The batch is validated as a whole before anything is scheduled: every
    /// declared dependency must be submitted earlier or within the batch, no
    /// operation may be submitted twice, and the batch's dependencies must be
    /// acyclic.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::AlreadySubmitted`],
    /// [`QueueError::UnknownDependency`] or [`QueueError::DependencyCycle`];
    /// nothing from a rejected batch is scheduled.
    pub fn add_operations<T>(&self, operations: T) -> Result<(), QueueError>
    where
        T: IntoIterator<Item = Arc<dyn Operation>>,
    {
        let batch: Vec<Arc<dyn Operation>> = operations.into_iter().collect();
        // Held from validation through scheduling so concurrent submissions
        // of the same operation cannot both pass the duplicate check.
        let mut tasks = self.tasks.lock();
        let graph = self.validate_batch(&batch)?;

        for op in &batch {
            self.operations.insert(op.id(), Arc::clone(op));
        }
        info!(
            queue = %self.config.name,
            operations = batch.len(),
            edges = graph.values().map(Vec::len).sum::<usize>(),
            "Operations submitted"
        );
        self.sink.try_emit(
            "queue.submitted",
            Some(serde_json::json!({
                "queue": self.config.name,
                "operations": batch.len(),
            })),
        );

        for op in batch {
            let dependencies: Vec<Arc<dyn Operation>> = graph
                .get(&op.id())
                .into_iter()
                .flatten()
                .filter_map(|dep| self.operations.get(dep).map(|entry| Arc::clone(entry.value())))
                .collect();
            tasks.push(self.spawn_operation(op, dependencies));
        }
        Ok(())
    }

    fn validate_batch(
        &self,
        batch: &[Arc<dyn Operation>],
    ) -> Result<HashMap<OperationId, Vec<OperationId>>, QueueError> {
        let mut graph: HashMap<OperationId, Vec<OperationId>> = HashMap::with_capacity(batch.len());
        for op in batch {
            let id = op.id();
            if self.operations.contains_key(&id) || graph.contains_key(&id) {
                return Err(QueueError::AlreadySubmitted(id));
            }
            graph.insert(id, op.dependencies());
        }

        for (id, dependencies) in &graph {
            for dependency in dependencies {
                if !graph.contains_key(dependency) && !self.operations.contains_key(dependency) {
                    return Err(QueueError::UnknownDependency {
                        operation: *id,
                        dependency: *dependency,
                    });
                }
            }
        }

        let mut visited = HashSet::new();
        let mut in_progress = HashSet::new();
        for op in batch {
            if let Some(id) = find_cycle(op.id(), &graph, &mut visited, &mut in_progress) {
                return Err(QueueError::DependencyCycle(id));
            }
        }
        Ok(graph)
    }

    fn spawn_operation(
        &self,
        op: Arc<dyn Operation>,
        dependencies: Vec<Arc<dyn Operation>>,
    ) -> JoinHandle<()> {
        let permits = self.permits.clone();
        self.handle.spawn(async move {
            for dependency in &dependencies {
                finished(dependency.as_ref()).await;
            }
            if op.is_finished() {
                debug!(operation = %op.id(), name = op.name(), "Operation finished before it was started");
                return;
            }

            let _permit = match permits {
                Some(semaphore) => match semaphore.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(e) => {
                        warn!(operation = %op.id(), "Concurrency permit unavailable: {}", e);
                        None
                    }
                },
                None => None,
            };

            op.start();
            finished(op.as_ref()).await;
        })
    }

    /// Waits until every submitted operation has finished.
    ///
    /// Operations submitted while waiting are waited for as well.
    pub async fn wait_until_finished(&self) {
        loop {
            let tasks = std::mem::take(&mut *self.tasks.lock());
            if tasks.is_empty() {
                break;
            }
            for joined in join_all(tasks).await {
                if let Err(e) = joined {
                    warn!(queue = %self.config.name, "Operation task failed: {}", e);
                }
            }
        }

        debug!(queue = %self.config.name, "Queue drained");
        self.sink
            .emit(
                "queue.drained",
                Some(serde_json::json!({
                    "queue": self.config.name,
                    "operations": self.operations.len(),
                })),
            )
            .await;
    }

    /// Cancels every unfinished operation with the same reason.
    ///
    /// Returns how many operations this call finished directly; the rest of
    /// their chains finish through the cascade.
    pub fn cancel_all(&self, reason: Option<String>) -> usize {
        let error = PipeError::Cancelled { reason };
        let operations: Vec<Arc<dyn Operation>> = self
            .operations
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let cancelled = operations
            .iter()
            .filter(|op| op.cancel_with(error.clone()))
            .count();
        info!(queue = %self.config.name, cancelled, "Cancelled all operations");
        cancelled
    }
}

fn find_cycle(
    node: OperationId,
    graph: &HashMap<OperationId, Vec<OperationId>>,
    visited: &mut HashSet<OperationId>,
    in_progress: &mut HashSet<OperationId>,
) -> Option<OperationId> {
    if in_progress.contains(&node) {
        return Some(node);
    }
    if !visited.insert(node) {
        return None;
    }
    in_progress.insert(node);
    if let Some(dependencies) = graph.get(&node) {
        for dependency in dependencies {
            if let Some(id) = find_cycle(*dependency, graph, visited, in_progress) {
                return Some(id);
            }
        }
    }
    in_progress.remove(&node);
    None
}

impl fmt::Debug for OperationQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationQueue")
            .field("name", &self.config.name)
            .field("operations", &self.operations.len())
            .field("max_concurrent_operations", &self.config.max_concurrent_operations)
            .finish()
    }
}
