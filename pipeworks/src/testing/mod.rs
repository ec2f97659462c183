//! Testing utilities for pipes and pipelines.
//!
//! This module provides:
//! - Counting pipes that succeed or fail deterministically
//! - A manually driven pipe for exercising cancellation and completion races

mod mocks;

pub use mocks::{AppendPipe, FailingPipe, FailsEveryTimeError, ManualPipe};
