//! Test-only backend that records every dispatch it receives.

use std::sync::Mutex;

use detops::backend::{AccelBackend, BackendError, BackendResult};
use detops::tensor::{Shape, Tensor};

/// One captured dispatch into the recording backend.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub dets: Tensor,
    pub scores: Tensor,
    pub order: Tensor,
    pub dets_sorted: Tensor,
    pub iou_threshold: f32,
    pub multi_label: i32,
}

/// Accelerator backend that captures its arguments instead of computing.
///
/// The canned result is a host-resident identity keep list so assertions can
/// read it directly; real backends return device-resident results.
#[derive(Debug)]
pub struct RecordingBackend {
    calls: Mutex<Vec<RecordedCall>>,
    failure: Option<BackendError>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failure: None,
        }
    }

    /// A recording backend that fails every call with `error` after
    /// recording it.
    pub fn failing(error: BackendError) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failure: Some(error),
        }
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .expect("recording backend mutex poisoned")
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .expect("recording backend mutex poisoned")
            .len()
    }

    pub fn last_call_or_panic(&self) -> RecordedCall {
        self.recorded_calls()
            .pop()
            .expect("backend should record at least one call")
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AccelBackend for RecordingBackend {
    fn backend_name(&self) -> &str {
        "recording"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn nms_rotated(
        &self,
        dets: &Tensor,
        scores: &Tensor,
        order: &Tensor,
        dets_sorted: &Tensor,
        iou_threshold: f32,
        multi_label: i32,
    ) -> BackendResult<Tensor> {
        self.calls
            .lock()
            .expect("recording backend mutex poisoned")
            .push(RecordedCall {
                dets: dets.clone(),
                scores: scores.clone(),
                order: order.clone(),
                dets_sorted: dets_sorted.clone(),
                iou_threshold,
                multi_label,
            });
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        let rows = dets.shape().dims().first().copied().unwrap_or(0);
        let keep: Vec<i64> = (0..rows as i64).collect();
        Tensor::from_i64(Shape::new(vec![rows]), keep)
            .map_err(|err| BackendError::execution(err.to_string()))
    }
}
