//! Backend-agnostic conformance checks.
//!
//! Each function asserts one property every production accelerator backend
//! must satisfy, without requiring device hardware.

use detops::backend::registry::has_accel_backend;
use detops::backend::{AccelBackend, BackendError};
use detops::tensor::{Shape, Tensor};

/// Asserts the backend reports the name it registers under.
pub fn reports_expected_name(backend: &dyn AccelBackend, expected: &str) {
    assert_eq!(backend.backend_name(), expected);
}

/// Asserts direct backend calls refuse host-resident detections.
///
/// Backends own their argument validation; a host tensor reaching one is a
/// contract violation to reject, not data to execute.
pub fn rejects_host_resident_dets(backend: &dyn AccelBackend) {
    let dets = host_dets();
    let scores = Tensor::from_vec(Shape::new(vec![2]), vec![0.9, 0.8]).expect("scores tensor");
    let order = Tensor::from_i64(Shape::new(vec![2]), vec![0, 1]).expect("order tensor");
    let err = backend
        .nms_rotated(&dets, &scores, &order, &dets, 0.5, 0)
        .expect_err("host dets must be rejected");
    match err {
        BackendError::InvalidArgument { .. } => {}
        other => panic!("expected InvalidArgument, got {other:?}"),
    }
}

/// Asserts the backend registered itself when its crate was linked.
pub fn registered_under(name: &str) {
    assert!(
        has_accel_backend(name),
        "backend {name:?} is not registered"
    );
}

/// Asserts the availability probe answers consistently across calls.
pub fn availability_probe_is_stable(backend: &dyn AccelBackend) {
    assert_eq!(backend.is_available(), backend.is_available());
}

fn host_dets() -> Tensor {
    Tensor::from_vec(
        Shape::new(vec![2, 5]),
        vec![0.0, 0.0, 2.0, 2.0, 0.0, 4.0, 4.0, 2.0, 2.0, 0.0],
    )
    .expect("dets tensor")
}
