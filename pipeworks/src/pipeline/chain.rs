//! Linear chains of linked operations.

use super::link::{link, Edge};
use crate::errors::{PipeError, PipelineError};
use crate::operation::{finished, Inlet, Operation, OperationId, Outlet, PipeOperation};
use crate::pipe::{Pipe, PipeResult};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// An ordered chain of operations representing one composed stage `I -> O`.
///
/// The pipeline owns every operation it was built from and records each
/// predecessor → successor link as an [`Edge`]. Feed the head with
/// [`set_input`](Self::set_input), submit [`operations`](Self::operations) to
/// an executor, and observe the last operation's result.
pub struct Pipeline<I, O> {
    head: Arc<dyn Inlet<I>>,
    last: Arc<dyn Outlet<O>>,
    operations: Vec<Arc<dyn Operation>>,
    edges: Vec<Edge>,
}

impl<I, O> Pipeline<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Creates a single-operation pipeline.
    #[must_use]
    pub fn new(operation: PipeOperation<I, O>) -> Self {
        Self {
            head: Arc::new(operation.clone()),
            last: Arc::new(operation.clone()),
            operations: vec![Arc::new(operation)],
            edges: Vec::new(),
        }
    }

    /// Creates a single-operation pipeline wrapping `pipe`.
    pub fn from_pipe<P>(pipe: P) -> Self
    where
        P: Pipe<Input = I, Output = O> + 'static,
    {
        Self::new(PipeOperation::new(pipe))
    }

    /// Returns the first operation, which takes the pipeline's input.
    #[must_use]
    pub fn head(&self) -> &Arc<dyn Inlet<I>> {
        &self.head
    }

    /// Returns the last operation, which yields the pipeline's output.
    #[must_use]
    pub fn last(&self) -> &Arc<dyn Outlet<O>> {
        &self.last
    }

    /// Returns every operation in chain order.
    #[must_use]
    pub fn operations(&self) -> &[Arc<dyn Operation>] {
        &self.operations
    }

    /// Consumes the pipeline, returning its operations for submission.
    #[must_use]
    pub fn into_operations(self) -> Vec<Arc<dyn Operation>> {
        self.operations
    }

    /// Returns the links between consecutive operations.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns the operation ids in chain order.
    #[must_use]
    pub fn ids(&self) -> Vec<OperationId> {
        self.operations.iter().map(|op| op.id()).collect()
    }

    /// Returns the number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns true if the pipeline has no operations. Never true for a
    /// constructed pipeline.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Returns true once the last operation has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.last.is_finished()
    }

    /// Assigns the pipeline's input to the head operation.
    ///
    /// Returns false if the head is no longer ready.
    pub fn set_input(&self, input: I) -> bool {
        self.head.set_input(input)
    }

    /// Cancels the earliest unfinished operation; the failure cascades to
    /// the rest of the chain.
    ///
    /// Returns false if every operation had already finished.
    pub fn cancel(&self, reason: Option<String>) -> bool {
        let error = PipeError::Cancelled { reason };
        self.operations
            .iter()
            .any(|op| op.cancel_with(error.clone()))
    }

    fn contains(&self, id: OperationId) -> bool {
        self.operations.iter().any(|op| op.id() == id)
    }
}

impl<I, O> Pipeline<I, O>
where
    I: Send + 'static,
    O: Clone + Send + 'static,
{
    /// Appends `next`, linking the current last operation to it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DuplicateOperation`] if `next` is already
    /// part of the chain, or any [`link`] failure.
    pub fn then<N>(mut self, next: PipeOperation<O, N>) -> Result<Pipeline<I, N>, PipelineError>
    where
        N: Send + 'static,
    {
        if self.contains(next.id()) {
            return Err(PipelineError::DuplicateOperation(next.id()));
        }
        let edge = link::<O>(&*self.last, Arc::new(next.clone()))?;
        debug!(from = %edge.from, to = %edge.to, "Appended operation to pipeline");

        self.operations.push(Arc::new(next.clone()));
        self.edges.push(edge);
        Ok(Pipeline {
            head: self.head,
            last: Arc::new(next),
            operations: self.operations,
            edges: self.edges,
        })
    }

    /// Appends a new operation wrapping `pipe`.
    ///
    /// # Errors
    ///
    /// See [`then`](Self::then).
    pub fn then_pipe<P, N>(self, pipe: P) -> Result<Pipeline<I, N>, PipelineError>
    where
        P: Pipe<Input = O, Output = N> + 'static,
        N: Send + 'static,
    {
        self.then(PipeOperation::new(pipe))
    }

    /// Fuses `other` onto the end of this pipeline.
    ///
    /// The last operation of `self` is linked to the head of `other`, so a
    /// failure anywhere upstream cascades across the fusion point.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DuplicateOperation`] if the two pipelines
    /// share an operation, or any [`link`] failure.
    pub fn join<N>(mut self, other: Pipeline<O, N>) -> Result<Pipeline<I, N>, PipelineError>
    where
        N: Send + 'static,
    {
        let ours: HashSet<OperationId> = self.operations.iter().map(|op| op.id()).collect();
        if let Some(shared) = other.operations.iter().find(|op| ours.contains(&op.id())) {
            return Err(PipelineError::DuplicateOperation(shared.id()));
        }

        let edge = link::<O>(&*self.last, Arc::clone(&other.head))?;
        debug!(from = %edge.from, to = %edge.to, operations = other.len(), "Fused pipelines");

        self.operations.extend(other.operations);
        self.edges.push(edge);
        self.edges.extend(other.edges);
        Ok(Pipeline {
            head: self.head,
            last: other.last,
            operations: self.operations,
            edges: self.edges,
        })
    }

    /// Returns a copy of the pipeline's final result once the last
    /// operation has finished.
    #[must_use]
    pub fn result(&self) -> Option<PipeResult<O>> {
        self.last.result()
    }

    /// Waits for the last operation to finish and returns its result.
    pub async fn wait(&self) -> PipeResult<O> {
        finished(&*self.last).await;
        self.last.result().unwrap_or(Err(PipeError::Abandoned))
    }
}

impl<I, O> Clone for Pipeline<I, O> {
    fn clone(&self) -> Self {
        Self {
            head: Arc::clone(&self.head),
            last: Arc::clone(&self.last),
            operations: self.operations.clone(),
            edges: self.edges.clone(),
        }
    }
}

impl<I, O> fmt::Debug for Pipeline<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.operations.iter().map(|op| op.name()).collect();
        f.debug_struct("Pipeline")
            .field("operations", &names)
            .field("edges", &self.edges.len())
            .finish()
    }
}
