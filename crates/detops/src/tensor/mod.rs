//! Core tensor abstractions shared between the dispatcher and backends.
//!
//! The tensor module defines shapes, dtypes, device residency tags, and the
//! opaque tensor handle the dispatch layer routes on. Host tensors own their
//! storage; accelerator tensors wrap handles owned by a backend runtime.

mod dense;
mod device;
pub mod dtype;
pub mod shape;

pub use dense::Tensor;
pub use device::Device;
pub use dtype::DType;
pub use shape::Shape;
