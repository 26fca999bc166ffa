//! Environment report contents and serialization.

use detops::backend::registry::register_accel_backend;
use detops::backend::{AccelBackend, BackendError, BackendResult};
use detops::diagnostics;
use detops::tensor::{Shape, Tensor};

#[derive(Debug)]
struct ProbeBackend;

impl AccelBackend for ProbeBackend {
    fn backend_name(&self) -> &str {
        "probe"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn nms_rotated(
        &self,
        _dets: &Tensor,
        _scores: &Tensor,
        _order: &Tensor,
        _dets_sorted: &Tensor,
        _iou_threshold: f32,
        _multi_label: i32,
    ) -> BackendResult<Tensor> {
        Tensor::from_i64(Shape::new(vec![0]), vec![])
            .map_err(|err| BackendError::execution(err.to_string()))
    }
}

/// One test covers the before/after registration states so the shared
/// registry cannot race between test functions.
#[test]
fn report_tracks_registration_state() -> anyhow::Result<()> {
    let before = diagnostics::collect();
    assert!(!before.crate_version.is_empty());
    assert_eq!(before.host_kernel, "nms_rotated_cpu");
    assert!(before.accel_backends.is_empty());
    assert_eq!(before.active_backend, None);
    assert_eq!(before.selection_error, None);

    register_accel_backend(std::sync::Arc::new(ProbeBackend));

    let after = diagnostics::collect();
    assert_eq!(after.accel_backends.len(), 1);
    assert_eq!(after.accel_backends[0].name, "probe");
    assert!(after.accel_backends[0].available);
    assert_eq!(after.active_backend.as_deref(), Some("probe"));

    let json = after.to_json()?;
    let value: serde_json::Value = serde_json::from_str(&json)?;
    assert_eq!(value["host_kernel"], "nms_rotated_cpu");
    assert_eq!(value["accel_backends"][0]["name"], "probe");
    assert_eq!(value["active_backend"], "probe");
    Ok(())
}
