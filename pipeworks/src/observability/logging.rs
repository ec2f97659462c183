//! `tracing-subscriber` installation driven by [`LogConfig`].

use crate::events::{set_default_event_sink, LoggingEventSink};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Log output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// An `EnvFilter` directive string, e.g. `"info,pipeworks=debug"`.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
    /// Route operation and queue lifecycle events into the log.
    #[serde(default)]
    pub lifecycle_events: bool,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
            lifecycle_events: false,
        }
    }
}

impl LogConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the filter from `RUST_LOG` when it is set.
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var(EnvFilter::DEFAULT_ENV) {
            Ok(filter) if !filter.trim().is_empty() => Self::default().with_filter(filter),
            _ => Self::default(),
        }
    }

    /// Sets the filter directives.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Switches to JSON output.
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Logs lifecycle events of operations and queues created after
    /// [`init_tracing`].
    #[must_use]
    pub fn with_lifecycle_events(mut self, enabled: bool) -> Self {
        self.lifecycle_events = enabled;
        self
    }

    /// Parses the filter directives.
    ///
    /// # Errors
    ///
    /// Fails if the directives are malformed.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.filter).with_context(|| format!("invalid log filter '{}'", self.filter))
    }
}

/// Installs the global `tracing` subscriber described by `config`.
///
/// # Errors
///
/// Fails if the filter is malformed or a global subscriber is already set.
pub fn init_tracing(config: &LogConfig) -> Result<()> {
    let filter = config.env_filter()?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))?;

    if config.lifecycle_events {
        set_default_event_sink(Arc::new(LoggingEventSink::new()));
    }
    Ok(())
}
