//! Device-routing entry point for rotated non-maximum suppression.

use anyhow::Result;

use crate::backend::registry::active_accel_backend;
use crate::backend::BackendError;
use crate::kernels::nms_rotated_cpu;
use crate::tensor::Tensor;

use super::common::ensure_same_residency;

/// Runs rotated non-maximum suppression on whichever device the inputs
/// live on.
///
/// `dets` and `scores` must agree on accelerator residency; mixing a host
/// tensor with an accelerator tensor is rejected with a structured
/// [`BackendError::InvalidArgument`] before any dispatch decision is made.
/// Ordinal checks on accelerator tensors belong to the backend.
///
/// Accelerator-resident inputs are forwarded to the registered
/// [`crate::backend::AccelBackend`] with every argument intact: the backend
/// receives `order` (row indices of `dets` by descending score) and
/// `dets_sorted` (`dets` gathered into that order) alongside the raw
/// inputs, plus the `multi_label` switch for six-column rows. When no
/// backend is linked in, the call fails with [`BackendError::NotCompiled`]
/// and performs no computation.
///
/// Host-resident inputs run on [`nms_rotated_cpu`], which sorts internally
/// and therefore only needs `dets`, `scores`, and the threshold.
pub fn nms_rotated(
    dets: &Tensor,
    scores: &Tensor,
    order: &Tensor,
    dets_sorted: &Tensor,
    iou_threshold: f32,
    multi_label: i32,
) -> Result<Tensor> {
    ensure_same_residency("nms_rotated", "dets", dets, "scores", scores)?;
    if dets.device().is_accel() {
        let backend = active_accel_backend()?.ok_or_else(BackendError::not_compiled)?;
        return backend
            .nms_rotated(dets, scores, order, dets_sorted, iou_threshold, multi_label)
            .map_err(Into::into);
    }
    nms_rotated_cpu(dets, scores, iou_threshold)
}
