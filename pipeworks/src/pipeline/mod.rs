//! Dependency-linked chains of operations.
//!
//! [`link`] connects one operation's result to the next operation's input
//! and records the dependency as an [`Edge`]. [`Pipeline`] builds linear
//! chains out of such links and hands the ordered operations to an executor.

mod chain;
mod link;


pub use chain::Pipeline;
pub use link::{link, Edge};
