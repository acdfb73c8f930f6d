//! Runtime integration layer.
//!
//! Keeps thread and Tokio runtime construction for delivery workers in one place so
//! the rest of the crate never builds runtimes itself.

pub(crate) mod worker_runtime;
