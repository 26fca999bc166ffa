//! Host rotated-suppression kernel semantics.

use detops::backend::BackendError;
use detops::kernels::{box_iou_rotated_pair, nms_rotated_cpu, RotatedBox};
use detops::tensor::{DType, Shape, Tensor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn dets_tensor(rows: &[[f32; 5]]) -> Tensor {
    let data: Vec<f32> = rows.iter().flatten().copied().collect();
    Tensor::from_vec(Shape::new(vec![rows.len(), 5]), data).expect("dets tensor")
}

fn scores_tensor(values: &[f32]) -> Tensor {
    Tensor::from_vec(Shape::new(vec![values.len()]), values.to_vec()).expect("scores tensor")
}

#[test]
fn far_apart_boxes_all_survive() -> anyhow::Result<()> {
    let dets = dets_tensor(&[
        [0.0, 0.0, 2.0, 2.0, 0.0],
        [10.0, 10.0, 2.0, 2.0, 0.7],
        [-10.0, 5.0, 3.0, 1.0, -0.3],
    ]);
    let scores = scores_tensor(&[0.5, 0.9, 0.7]);

    let keep = nms_rotated_cpu(&dets, &scores, 0.1)?;
    // Survivors come back ordered by descending score.
    assert_eq!(keep.data_i64(), &[1, 2, 0]);
    Ok(())
}

#[test]
fn duplicate_box_is_suppressed() -> anyhow::Result<()> {
    let dets = dets_tensor(&[
        [1.0, 1.0, 4.0, 2.0, 0.4],
        [1.0, 1.0, 4.0, 2.0, 0.4],
    ]);
    let scores = scores_tensor(&[0.6, 0.8]);

    let keep = nms_rotated_cpu(&dets, &scores, 0.9)?;
    assert_eq!(keep.data_i64(), &[1]);
    Ok(())
}

#[test]
fn equal_scores_keep_the_lower_row_index() -> anyhow::Result<()> {
    let dets = dets_tensor(&[
        [0.0, 0.0, 2.0, 2.0, 0.0],
        [0.0, 0.0, 2.0, 2.0, 0.0],
    ]);
    let scores = scores_tensor(&[0.5, 0.5]);

    let keep = nms_rotated_cpu(&dets, &scores, 0.5)?;
    assert_eq!(keep.data_i64(), &[0]);
    Ok(())
}

/// Overlap exactly at the threshold is kept; suppression requires strictly
/// greater IoU.
#[test]
fn iou_equal_to_threshold_is_not_suppressed() -> anyhow::Result<()> {
    // Unit squares offset by half a side: intersection 0.5, union 1.5.
    let dets = dets_tensor(&[
        [0.0, 0.0, 1.0, 1.0, 0.0],
        [0.5, 0.0, 1.0, 1.0, 0.0],
    ]);
    let scores = scores_tensor(&[0.9, 0.8]);
    let threshold = (0.5f64 / 1.5f64) as f32;

    let keep = nms_rotated_cpu(&dets, &scores, threshold)?;
    assert_eq!(keep.data_i64(), &[0, 1]);

    let keep_below = nms_rotated_cpu(&dets, &scores, threshold - 1e-4)?;
    assert_eq!(keep_below.data_i64(), &[0]);
    Ok(())
}

#[test]
fn partial_overlap_respects_threshold() -> anyhow::Result<()> {
    // IoU of rows 0 and 1 is 3/5.
    let dets = dets_tensor(&[
        [0.0, 0.0, 2.0, 2.0, 0.0],
        [0.5, 0.0, 2.0, 2.0, 0.0],
        [10.0, 10.0, 2.0, 2.0, 0.8],
    ]);
    let scores = scores_tensor(&[0.9, 0.8, 0.7]);

    let keep = nms_rotated_cpu(&dets, &scores, 0.5)?;
    assert_eq!(keep.data_i64(), &[0, 2]);

    let keep_loose = nms_rotated_cpu(&dets, &scores, 0.7)?;
    assert_eq!(keep_loose.data_i64(), &[0, 1, 2]);
    Ok(())
}

#[test]
fn rotation_changes_the_suppression_decision() -> anyhow::Result<()> {
    // Same-center squares: aligned they are identical (IoU 1), rotated 45
    // degrees apart the IoU drops to sqrt(2)/2.
    let dets = dets_tensor(&[
        [0.0, 0.0, 2.0, 2.0, 0.0],
        [0.0, 0.0, 2.0, 2.0, std::f32::consts::FRAC_PI_4],
    ]);
    let scores = scores_tensor(&[0.9, 0.8]);

    let keep_tight = nms_rotated_cpu(&dets, &scores, 0.8)?;
    assert_eq!(keep_tight.data_i64(), &[0, 1]);

    let keep_loose = nms_rotated_cpu(&dets, &scores, 0.6)?;
    assert_eq!(keep_loose.data_i64(), &[0]);
    Ok(())
}

/// A trailing label column is accepted and ignored by suppression.
#[test]
fn labeled_rows_suppress_identically() -> anyhow::Result<()> {
    let plain = dets_tensor(&[
        [0.0, 0.0, 2.0, 2.0, 0.0],
        [0.5, 0.0, 2.0, 2.0, 0.0],
    ]);
    let labeled = Tensor::from_vec(
        Shape::new(vec![2, 6]),
        vec![0.0, 0.0, 2.0, 2.0, 0.0, 3.0, 0.5, 0.0, 2.0, 2.0, 0.0, 7.0],
    )?;
    let scores = scores_tensor(&[0.9, 0.8]);

    let keep_plain = nms_rotated_cpu(&plain, &scores, 0.5)?;
    let keep_labeled = nms_rotated_cpu(&labeled, &scores, 0.5)?;
    assert_eq!(keep_plain.data_i64(), keep_labeled.data_i64());
    Ok(())
}

#[test]
fn empty_input_yields_empty_keep() -> anyhow::Result<()> {
    let dets = Tensor::from_vec(Shape::new(vec![0, 5]), vec![])?;
    let scores = Tensor::from_vec(Shape::new(vec![0]), vec![])?;

    let keep = nms_rotated_cpu(&dets, &scores, 0.5)?;
    assert_eq!(keep.dtype(), DType::I64);
    assert!(keep.is_empty());
    Ok(())
}

/// Degenerate boxes never suppress anything and are never suppressed.
#[test]
fn zero_extent_boxes_survive() -> anyhow::Result<()> {
    let dets = dets_tensor(&[
        [0.0, 0.0, 0.0, 2.0, 0.0],
        [0.0, 0.0, 2.0, 2.0, 0.0],
        [0.0, 0.0, 0.0, 0.0, 1.0],
    ]);
    let scores = scores_tensor(&[0.9, 0.8, 0.7]);

    let keep = nms_rotated_cpu(&dets, &scores, 0.1)?;
    assert_eq!(keep.data_i64(), &[0, 1, 2]);
    Ok(())
}

#[test]
fn score_count_mismatch_is_invalid() {
    let dets = dets_tensor(&[[0.0, 0.0, 2.0, 2.0, 0.0]]);
    let scores = scores_tensor(&[0.9, 0.8]);

    let err = nms_rotated_cpu(&dets, &scores, 0.5).expect_err("length mismatch");
    assert!(matches!(
        err.downcast_ref::<BackendError>(),
        Some(BackendError::InvalidArgument { .. })
    ));
}

#[test]
fn wrong_column_count_is_invalid() {
    let dets = Tensor::from_vec(Shape::new(vec![1, 4]), vec![0.0, 0.0, 2.0, 2.0])
        .expect("dets tensor");
    let scores = scores_tensor(&[0.9]);

    let err = nms_rotated_cpu(&dets, &scores, 0.5).expect_err("four columns");
    assert!(matches!(
        err.downcast_ref::<BackendError>(),
        Some(BackendError::InvalidArgument { .. })
    ));
}

fn random_rows(rng: &mut StdRng, count: usize) -> (Vec<[f32; 5]>, Vec<f32>) {
    let mut rows = Vec::with_capacity(count);
    let mut scores = Vec::with_capacity(count);
    for _ in 0..count {
        rows.push([
            rng.gen_range(0.0..20.0),
            rng.gen_range(0.0..20.0),
            rng.gen_range(0.5..4.0),
            rng.gen_range(0.5..4.0),
            rng.gen_range(-std::f32::consts::PI..std::f32::consts::PI),
        ]);
        scores.push(rng.gen_range(0.0..1.0));
    }
    (rows, scores)
}

/// Structural invariants of the greedy sweep on randomized inputs: kept
/// indices are unique and score-sorted, survivors are pairwise below the
/// threshold, and every suppressed row has a responsible survivor.
#[test]
fn randomized_inputs_uphold_greedy_invariants() -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(42);
    for round in 0..8 {
        let (rows, scores) = random_rows(&mut rng, 48);
        let threshold = 0.2 + 0.1 * (round % 5) as f32;
        let dets = dets_tensor(&rows);
        let keep = nms_rotated_cpu(&dets, &scores_tensor(&scores), threshold)?;
        let kept = keep.data_i64();

        let mut seen = vec![false; rows.len()];
        for window in kept.windows(2) {
            assert!(
                scores[window[0] as usize] >= scores[window[1] as usize],
                "kept indices out of score order"
            );
        }
        for &idx in kept {
            assert!(!seen[idx as usize], "index {idx} kept twice");
            seen[idx as usize] = true;
        }

        let boxes: Vec<RotatedBox> = rows.iter().map(|r| RotatedBox::from_row(r)).collect();
        for (a_pos, &a) in kept.iter().enumerate() {
            for &b in &kept[a_pos + 1..] {
                let iou = box_iou_rotated_pair(&boxes[a as usize], &boxes[b as usize]);
                assert!(
                    iou <= threshold,
                    "survivors {a} and {b} overlap at {iou} > {threshold}"
                );
            }
        }

        for (idx, kept_flag) in seen.iter().enumerate() {
            if *kept_flag {
                continue;
            }
            let suppressor = kept.iter().any(|&k| {
                scores[k as usize] >= scores[idx]
                    && box_iou_rotated_pair(&boxes[k as usize], &boxes[idx]) > threshold
            });
            assert!(suppressor, "row {idx} was suppressed without cause");
        }
    }
    Ok(())
}
