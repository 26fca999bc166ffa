//! Validation helpers shared by the dispatch layer and the host kernels.
//!
//! All violations surface as [`BackendError::InvalidArgument`] wrapped in
//! `anyhow::Error`, so callers can downcast and react to the structured
//! variant instead of string-matching.

use anyhow::Result;

use crate::backend::BackendError;
use crate::tensor::{DType, Tensor};

/// Number of columns in a plain detection row: `cx, cy, w, h, angle`.
pub(crate) const BOX_COLUMNS: usize = 5;

/// Number of columns when a class label is appended to each row.
pub(crate) const LABELED_BOX_COLUMNS: usize = 6;

fn invalid(message: String) -> anyhow::Error {
    BackendError::invalid_argument(message).into()
}

/// Requires both tensors to agree on accelerator residency.
///
/// Agreement is on the host-versus-accelerator flag only; whether two
/// accelerator tensors share an ordinal is for the backend to judge.
pub(crate) fn ensure_same_residency(
    op: &str,
    lhs_name: &str,
    lhs: &Tensor,
    rhs_name: &str,
    rhs: &Tensor,
) -> Result<()> {
    if lhs.device().is_accel() != rhs.device().is_accel() {
        return Err(invalid(format!(
            "{op}: {lhs_name} and {rhs_name} must agree on accelerator residency, got {} and {}",
            lhs.device(),
            rhs.device()
        )));
    }
    Ok(())
}

/// Requires a tensor to be host-resident.
pub(crate) fn ensure_host_resident(op: &str, name: &str, tensor: &Tensor) -> Result<()> {
    if tensor.device().is_accel() {
        return Err(invalid(format!(
            "{op}: {name} must be host-resident, got {}",
            tensor.device()
        )));
    }
    Ok(())
}

/// Requires a tensor to carry the given scalar dtype.
pub(crate) fn ensure_dtype(op: &str, name: &str, tensor: &Tensor, want: DType) -> Result<()> {
    if tensor.dtype() != want {
        return Err(invalid(format!(
            "{op}: {name} must be {want:?}, got {:?}",
            tensor.dtype()
        )));
    }
    Ok(())
}

/// Requires a rank-2 detection tensor with five or six columns and returns
/// the column count.
pub(crate) fn detection_columns(op: &str, name: &str, dets: &Tensor) -> Result<usize> {
    let dims = dets.shape().dims();
    if dets.shape().rank() != 2 {
        return Err(invalid(format!(
            "{op}: {name} must be a rank-2 tensor of detection rows, got shape {dims:?}"
        )));
    }
    let columns = dims[1];
    if columns != BOX_COLUMNS && columns != LABELED_BOX_COLUMNS {
        return Err(invalid(format!(
            "{op}: {name} rows must have {BOX_COLUMNS} or {LABELED_BOX_COLUMNS} columns, got {columns}"
        )));
    }
    Ok(columns)
}

/// Requires `scores` to be a rank-1 tensor with one score per detection row.
pub(crate) fn ensure_score_count(
    op: &str,
    dets_name: &str,
    dets: &Tensor,
    scores_name: &str,
    scores: &Tensor,
) -> Result<()> {
    let score_dims = scores.shape().dims();
    if scores.shape().rank() != 1 {
        return Err(invalid(format!(
            "{op}: {scores_name} must be a rank-1 tensor, got shape {score_dims:?}"
        )));
    }
    let rows = dets.shape().dims()[0];
    if score_dims[0] != rows {
        return Err(invalid(format!(
            "{op}: {scores_name} has {} entries but {dets_name} has {rows} rows",
            score_dims[0]
        )));
    }
    Ok(())
}
