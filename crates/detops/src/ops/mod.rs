//! Operator surface.
//!
//! Operators take tensor handles, validate the parts of the contract shared
//! across devices, and route to a host kernel or a registered accelerator
//! backend based on input residency.

pub(crate) mod common;
mod nms_rotated;

pub use nms_rotated::nms_rotated;
