//! Rotated-box detection operators with device-routing dispatch.
//!
//! The crate centers on one operator, [`nms_rotated`]: greedy non-maximum
//! suppression over rotated rectangles. Inputs are [`Tensor`] handles whose
//! [`Device`] tag records where the data lives; the operator inspects that
//! tag and routes host-resident inputs to the reference kernels in
//! [`kernels`] and accelerator-resident inputs to whichever
//! [`backend::AccelBackend`] is registered.
//!
//! Accelerator support is a link-time property. Backend crates register
//! themselves from a static initializer, so a binary that links one can route
//! accelerator tensors and a binary that links none fails those calls with
//! [`backend::BackendError::NotCompiled`], through the same operator surface
//! either way.

pub mod backend;
pub mod diagnostics;
pub mod kernels;
pub mod ops;
pub mod tensor;

mod env;

pub use ops::nms_rotated;
pub use tensor::{DType, Device, Shape, Tensor};
