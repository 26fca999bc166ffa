//! Host-side compute kernels.
//!
//! These are the reference implementations that run when inputs are
//! host-resident; accelerator backends provide their own equivalents behind
//! [`crate::backend::AccelBackend`].

mod box_iou_rotated;
mod nms_rotated;

pub use box_iou_rotated::{box_iou_rotated_pair, RotatedBox};
pub use nms_rotated::nms_rotated_cpu;
