//! Backend contract, error taxonomy, and the accelerator registry.

pub mod registry;
pub mod spec;

pub use spec::{AccelBackend, BackendError, BackendResult, NOT_COMPILED_MESSAGE};
