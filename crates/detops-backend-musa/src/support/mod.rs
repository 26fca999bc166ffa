//! Runtime-revision compatibility shim.
//!
//! The MUSA runtime changed its half-precision kernel ABI and preferred
//! launch geometry between major revisions. Each revision gets its own
//! module exposing an identical surface; the `runtime-v2` Cargo feature
//! picks which one is compiled, and the rest of the crate imports through
//! this parent so revision differences stop here.

#[cfg(feature = "runtime-v2")]
mod apply_v2;
#[cfg(feature = "runtime-v2")]
pub use apply_v2::{kernel_half, kernel_half_bits, kernel_half_to_f32, launch_dims, KernelHalf};

#[cfg(not(feature = "runtime-v2"))]
mod apply_v1;
#[cfg(not(feature = "runtime-v2"))]
pub use apply_v1::{kernel_half, kernel_half_bits, kernel_half_to_f32, launch_dims, KernelHalf};
