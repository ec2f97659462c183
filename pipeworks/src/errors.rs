//! Error types for the pipeworks framework.
//!
//! Three families live here:
//! - [`PipeError`] travels inside a [`PipeResult`](crate::pipe::PipeResult) and
//!   is what observers of a stage, unit or pipeline see.
//! - [`PipelineError`] reports invalid composition (linking, fusing).
//! - [`QueueError`] reports rejected submissions to the reference executor.

use crate::operation::OperationId;
use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// An opaque error produced by a concrete stage implementation.
pub type StageErrorRef = Arc<dyn StdError + Send + Sync + 'static>;

/// The failure half of a pipe result.
///
/// Cloning is cheap: stage errors are reference-counted, so every copy made
/// while a failure cascades down a chain shares the original error's identity.
#[derive(Debug, Clone, Error)]
pub enum PipeError {
    /// The operation was started without an assigned input.
    #[error("operation started without an input")]
    NoInput,

    /// The operation was cancelled, optionally with a caller-supplied reason.
    #[error("{}", cancelled_message(.reason))]
    Cancelled {
        /// Why the cancellation was requested.
        reason: Option<String>,
    },

    /// An error produced by a stage implementation, passed through unchanged.
    #[error("{0}")]
    Stage(StageErrorRef),

    /// The stage dropped its completion without ever invoking it.
    #[error("stage dropped its completion without delivering a result")]
    Abandoned,
}

impl PipeError {
    /// Wraps a stage-specific error.
    pub fn stage<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Stage(Arc::new(error))
    }

    /// Creates a cancellation error without a reason.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::Cancelled { reason: None }
    }

    /// Creates a cancellation error carrying a reason.
    #[must_use]
    pub fn cancelled_with(reason: impl Into<String>) -> Self {
        Self::Cancelled {
            reason: Some(reason.into()),
        }
    }

    /// Returns true if this is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns the cancellation reason, if this is a cancellation with one.
    #[must_use]
    pub fn cancel_reason(&self) -> Option<&str> {
        match self {
            Self::Cancelled { reason } => reason.as_deref(),
            _ => None,
        }
    }

    /// Attempts to view the underlying stage error as a concrete type.
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        match self {
            Self::Stage(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Returns true if both errors are the same failure.
    ///
    /// Stage errors compare by identity (the same allocation), everything
    /// else compares by value.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Stage(a), Self::Stage(b)) => Arc::ptr_eq(a, b),
            (Self::NoInput, Self::NoInput) | (Self::Abandoned, Self::Abandoned) => true,
            (Self::Cancelled { reason: a }, Self::Cancelled { reason: b }) => a == b,
            _ => false,
        }
    }
}

fn cancelled_message(reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!("operation cancelled: {reason}"),
        None => "operation cancelled".to_string(),
    }
}

impl From<anyhow::Error> for PipeError {
    fn from(err: anyhow::Error) -> Self {
        let boxed: Box<dyn StdError + Send + Sync + 'static> = err.into();
        Self::Stage(Arc::from(boxed))
    }
}

/// Error raised when operations or pipelines cannot be composed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// An operation cannot depend on itself.
    #[error("operation {0} cannot be linked to itself")]
    SelfLink(OperationId),

    /// The upstream operation already feeds a successor; chains are linear.
    #[error("operation {0} already has a successor")]
    AlreadyLinked(OperationId),

    /// The upstream operation has finished, so its output can no longer be forwarded.
    #[error("operation {0} has already finished")]
    AlreadyFinished(OperationId),

    /// The same operation appears twice in one pipeline.
    #[error("operation {0} is already part of this pipeline")]
    DuplicateOperation(OperationId),
}

/// Error raised by the operation queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// An operation depends on one that was never submitted to this queue.
    #[error("operation {operation} depends on unknown operation {dependency}")]
    UnknownDependency {
        /// The dependent operation.
        operation: OperationId,
        /// The missing predecessor.
        dependency: OperationId,
    },

    /// The operation was already submitted to this queue.
    #[error("operation {0} was already submitted")]
    AlreadySubmitted(OperationId),

    /// The submitted dependencies form a cycle through this operation.
    #[error("dependency cycle through operation {0}")]
    DependencyCycle(OperationId),

    /// The queue configuration is invalid.
    #[error("invalid queue configuration: {0}")]
    InvalidConfig(String),

    /// The queue was created outside a tokio runtime.
    #[error("operation queue requires a tokio runtime")]
    NoRuntime,
}
