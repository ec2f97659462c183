//! Logging setup.
//!
//! The crate logs through `tracing`; [`init_tracing`] installs a
//! `tracing-subscriber` formatter for binaries and tests that want to see it.

mod logging;

pub use logging::{init_tracing, LogConfig};
