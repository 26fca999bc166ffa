//! Routing behavior of `nms_rotated` in a binary that links no accelerator
//! backend.

use detops::backend::{BackendError, NOT_COMPILED_MESSAGE};
use detops::nms_rotated;
use detops::tensor::{DType, Device, Shape, Tensor};

fn host_dets() -> Tensor {
    Tensor::from_vec(
        Shape::new(vec![2, 5]),
        vec![0.0, 0.0, 2.0, 2.0, 0.0, 10.0, 10.0, 2.0, 2.0, 0.5],
    )
    .expect("dets tensor")
}

fn host_scores() -> Tensor {
    Tensor::from_vec(Shape::new(vec![2]), vec![0.9, 0.8]).expect("scores tensor")
}

fn accel_tensor(dims: Vec<usize>, dtype: DType) -> Tensor {
    Tensor::from_accel_handle(Shape::new(dims), dtype, Device::Accel(0), ())
        .expect("accel tensor")
}

#[test]
fn accel_inputs_without_backend_report_not_compiled() {
    let dets = accel_tensor(vec![2, 5], DType::F32);
    let scores = accel_tensor(vec![2], DType::F32);
    let order = accel_tensor(vec![2], DType::I64);
    let dets_sorted = accel_tensor(vec![2, 5], DType::F32);

    let err = nms_rotated(&dets, &scores, &order, &dets_sorted, 0.5, 0)
        .expect_err("no backend is linked into this binary");
    let backend_err = err
        .downcast_ref::<BackendError>()
        .expect("error downcasts to BackendError");
    assert_eq!(*backend_err, BackendError::NotCompiled);
    assert_eq!(backend_err.to_string(), NOT_COMPILED_MESSAGE);
}

#[test]
fn mixed_residency_is_rejected_with_invalid_argument() {
    let dets = accel_tensor(vec![2, 5], DType::F32);
    let scores = host_scores();

    let err = nms_rotated(&dets, &scores, &scores, &dets, 0.5, 0)
        .expect_err("mixed residency must be rejected");
    let backend_err = err
        .downcast_ref::<BackendError>()
        .expect("error downcasts to BackendError");
    match backend_err {
        BackendError::InvalidArgument { message } => {
            assert!(
                message.contains("agree on accelerator residency"),
                "unexpected message: {message}"
            );
            assert!(message.contains("cpu"), "unexpected message: {message}");
            assert!(message.contains("accel:0"), "unexpected message: {message}");
        }
        other => panic!("expected InvalidArgument, got {other:?}"),
    }
}

#[test]
fn mixed_residency_is_rejected_in_both_directions() {
    let dets = host_dets();
    let scores = accel_tensor(vec![2], DType::F32);

    let err = nms_rotated(&dets, &scores, &scores, &dets, 0.5, 0)
        .expect_err("mixed residency must be rejected");
    assert!(matches!(
        err.downcast_ref::<BackendError>(),
        Some(BackendError::InvalidArgument { .. })
    ));
}

/// Residency agreement is on the host-versus-accelerator flag, not the
/// ordinal. Two accelerator tensors on different ordinals pass the gate
/// and reach backend selection, which here finds nothing linked.
#[test]
fn differing_accel_ordinals_pass_the_residency_gate() {
    let dets = accel_tensor(vec![2, 5], DType::F32);
    let scores = Tensor::from_accel_handle(Shape::new(vec![2]), DType::F32, Device::Accel(1), ())
        .expect("accel tensor");

    let err = nms_rotated(&dets, &scores, &scores, &dets, 0.5, 0)
        .expect_err("no backend is linked into this binary");
    assert_eq!(
        err.downcast_ref::<BackendError>(),
        Some(&BackendError::NotCompiled)
    );
}

#[test]
fn host_inputs_route_to_host_kernel() -> anyhow::Result<()> {
    let dets = host_dets();
    let scores = host_scores();
    let order = Tensor::from_i64(Shape::new(vec![2]), vec![0, 1])?;

    let keep = nms_rotated(&dets, &scores, &order, &dets, 0.5, 0)?;
    assert_eq!(keep.dtype(), DType::I64);
    assert_eq!(keep.data_i64(), &[0, 1]);
    Ok(())
}

/// The host path sorts internally from `dets` and `scores`; `order` and
/// `dets_sorted` must not influence it.
#[test]
fn host_routing_ignores_presorted_arguments() -> anyhow::Result<()> {
    let dets = host_dets();
    let scores = host_scores();
    let bogus_order = Tensor::from_i64(Shape::new(vec![1]), vec![99])?;
    let bogus_sorted = Tensor::from_vec(Shape::new(vec![1]), vec![f32::NAN])?;

    let keep = nms_rotated(&dets, &scores, &bogus_order, &bogus_sorted, 0.5, 1)?;
    let direct = detops::kernels::nms_rotated_cpu(&dets, &scores, 0.5)?;
    assert_eq!(keep.data_i64(), direct.data_i64());
    Ok(())
}

/// Routing the same inputs twice neither mutates them nor changes the
/// answer.
#[test]
fn host_routing_is_repeatable() -> anyhow::Result<()> {
    let dets = host_dets();
    let scores = host_scores();
    let order = Tensor::from_i64(Shape::new(vec![2]), vec![0, 1])?;

    let first = nms_rotated(&dets, &scores, &order, &dets, 0.5, 0)?;
    let second = nms_rotated(&dets, &scores, &order, &dets, 0.5, 0)?;
    assert_eq!(first.data_i64(), second.data_i64());
    assert_eq!(dets.device(), Device::Cpu);
    Ok(())
}
