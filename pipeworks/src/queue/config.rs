//! Queue configuration.

use crate::errors::QueueError;
use serde::{Deserialize, Serialize};

/// Configuration for an [`OperationQueue`](super::OperationQueue).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Queue name, used in logs and events.
    #[serde(default = "default_name")]
    pub name: String,
    /// Upper bound on concurrently executing operations. `None` is unbounded.
    #[serde(default)]
    pub max_concurrent_operations: Option<usize>,
}

fn default_name() -> String {
    "operations".to_string()
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            max_concurrent_operations: None,
        }
    }
}

impl QueueConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the queue name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Limits how many operations may execute at once.
    #[must_use]
    pub fn with_max_concurrent_operations(mut self, max: usize) -> Self {
        self.max_concurrent_operations = Some(max);
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidConfig`] for an empty name or a
    /// concurrency limit of zero.
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.name.trim().is_empty() {
            return Err(QueueError::InvalidConfig("name must not be empty".to_string()));
        }
        if self.max_concurrent_operations == Some(0) {
            return Err(QueueError::InvalidConfig(
                "max_concurrent_operations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
