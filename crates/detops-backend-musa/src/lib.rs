//! MUSA accelerator backend for rotated suppression.
//!
//! Linking this crate into a binary is what accelerator support means for
//! MUSA devices: a static initializer registers [`MusaBackend`] under the
//! name `"musa"` with the detops accelerator registry, and the dispatcher
//! routes accelerator-resident calls here from then on. Registration does
//! not touch hardware; the driver is loaded lazily when an operator first
//! executes, so binaries linking this crate still start on machines without
//! a MUSA stack.

pub mod bundle;
pub mod support;

mod device;
mod runtime;

use std::fmt;
use std::sync::Arc;

use detops::backend::registry::register_accel_backend;
use detops::backend::{AccelBackend, BackendError, BackendResult};
use detops::tensor::{DType, Device, Tensor};

use bundle::BundleCache;
use device::DeviceBuffer;

pub use device::MUSA_LIBRARY_ENV;
pub use runtime::sweep_suppression_mask;

/// Device ordinal the driver context binds; the runtime manages a single
/// device per process.
const DEVICE_ORDINAL: u32 = 0;

/// Device-resident tensor payload produced by this backend.
///
/// Stored type-erased inside [`Tensor`]; the backend recovers it by
/// downcasting the tensor's accelerator handle.
#[derive(Clone, Debug)]
pub struct MusaTensor {
    pub buffer: Arc<DeviceBuffer>,
}

impl MusaTensor {
    pub fn new(buffer: Arc<DeviceBuffer>) -> Self {
        Self { buffer }
    }
}

/// MUSA backend (device-only contract; no host fallback).
pub struct MusaBackend {
    bundles: BundleCache,
}

impl MusaBackend {
    pub fn new() -> Self {
        Self {
            bundles: BundleCache::new(),
        }
    }

    /// Reports whether the MUSA driver can be loaded in this process.
    pub fn is_available() -> bool {
        device::is_available()
    }

    /// Copies a host tensor to the device, returning an
    /// accelerator-resident handle on ordinal 0.
    pub fn upload(&self, tensor: &Tensor) -> BackendResult<Tensor> {
        if tensor.device().is_accel() {
            return Err(BackendError::invalid_argument(
                "upload expects a host-resident tensor",
            ));
        }
        let driver = device::driver()?;
        let buffer = driver.alloc_and_upload(tensor.host_bytes())?;
        Tensor::from_accel_handle(
            tensor.shape().clone(),
            tensor.dtype(),
            Device::Accel(DEVICE_ORDINAL),
            MusaTensor::new(buffer),
        )
        .map_err(|err| BackendError::execution(err.to_string()))
    }

    /// Copies an accelerator tensor produced by this backend back to the
    /// host.
    pub fn download(&self, tensor: &Tensor) -> BackendResult<Tensor> {
        let handle = tensor
            .accel_handle()
            .and_then(|handle| handle.downcast_ref::<MusaTensor>())
            .ok_or_else(|| {
                BackendError::invalid_argument("download expects a MUSA tensor handle")
            })?;
        let bytes = handle.buffer.read_to_vec()?;
        let shape = tensor.shape().clone();
        let rebuilt = match tensor.dtype() {
            DType::F32 => Tensor::from_vec(shape, runtime::f32_values(&bytes)),
            DType::F16 => Tensor::from_half(shape, runtime::f16_values(&bytes)),
            DType::I64 => Tensor::from_i64(shape, runtime::i64_values(&bytes)),
        };
        rebuilt.map_err(|err| BackendError::execution(err.to_string()))
    }
}

impl Default for MusaBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MusaBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MusaBackend").finish_non_exhaustive()
    }
}

impl AccelBackend for MusaBackend {
    fn backend_name(&self) -> &str {
        "musa"
    }

    fn is_available(&self) -> bool {
        device::is_available()
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
        runtime::nms_rotated(
            &self.bundles,
            dets,
            scores,
            order,
            dets_sorted,
            iou_threshold,
            multi_label,
        )
    }
}

/// Registers the MUSA backend with the global accelerator registry.
///
/// Called automatically via a static initializer, but can also be called
/// manually; registering again replaces the entry with a fresh instance.
pub fn register_musa_backend() {
    register_accel_backend(Arc::new(MusaBackend::new()));
}

// Auto-register on library load
#[cfg(not(target_family = "wasm"))]
#[used]
#[link_section = ".init_array"]
static REGISTER_MUSA_BACKEND: extern "C" fn() = {
    extern "C" fn register() {
        register_musa_backend();
    }
    register
};
