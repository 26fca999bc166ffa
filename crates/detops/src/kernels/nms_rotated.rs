//! Host kernel for rotated non-maximum suppression.

use anyhow::Result;

use crate::ops::common::{
    detection_columns, ensure_dtype, ensure_host_resident, ensure_score_count,
};
use crate::tensor::{DType, Shape, Tensor};

use super::box_iou_rotated::{box_iou_rotated_pair, RotatedBox};

const OP: &str = "nms_rotated_cpu";

/// Greedy rotated non-maximum suppression over host-resident detections.
///
/// `dets` is a rank-2 `F32` tensor of `(cx, cy, w, h, angle)` rows, with an
/// optional sixth label column that suppression ignores. `scores` holds one
/// confidence per row. Rows are visited in descending score order (ties
/// keep their original relative order) and a survivor suppresses every
/// later row whose rotated IoU with it strictly exceeds `iou_threshold`.
///
/// Returns a rank-1 `I64` tensor of surviving row indices, ordered by
/// descending score.
pub fn nms_rotated_cpu(dets: &Tensor, scores: &Tensor, iou_threshold: f32) -> Result<Tensor> {
    ensure_host_resident(OP, "dets", dets)?;
    ensure_host_resident(OP, "scores", scores)?;
    ensure_dtype(OP, "dets", dets, DType::F32)?;
    ensure_dtype(OP, "scores", scores, DType::F32)?;
    let columns = detection_columns(OP, "dets", dets)?;
    ensure_score_count(OP, "dets", dets, "scores", scores)?;

    let rows = dets.shape().dims()[0];
    let data = dets.data();
    let score_values = scores.data();

    let mut order: Vec<usize> = (0..rows).collect();
    // Stable sort, so equal scores resolve to the lower row index.
    order.sort_by(|&a, &b| score_values[b].total_cmp(&score_values[a]));

    let mut suppressed = vec![false; rows];
    let mut keep: Vec<i64> = Vec::with_capacity(rows);
    for (pos, &row) in order.iter().enumerate() {
        if suppressed[row] {
            continue;
        }
        keep.push(row as i64);
        let head = RotatedBox::from_row(&data[row * columns..row * columns + columns]);
        for &other_row in &order[pos + 1..] {
            if suppressed[other_row] {
                continue;
            }
            let other =
                RotatedBox::from_row(&data[other_row * columns..other_row * columns + columns]);
            if box_iou_rotated_pair(&head, &other) > iou_threshold {
                suppressed[other_row] = true;
            }
        }
    }

    let kept = keep.len();
    Tensor::from_i64(Shape::new(vec![kept]), keep)
}
