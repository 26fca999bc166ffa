//! Tensor handle carrying device residency metadata.
//!
//! Host-resident tensors own a dense byte buffer and expose typed views over
//! it. Accelerator-resident tensors carry an opaque handle owned by whichever
//! accelerator runtime produced it; the core never interprets that handle, it
//! only routes it to the backend that understands it.

use std::any::Any;
use std::fmt;
use std::mem::{size_of, ManuallyDrop};
use std::sync::Arc;

use anyhow::{bail, Result};
use half::f16;

use super::device::Device;
use super::dtype::DType;
use super::shape::Shape;

/// Backing storage for a tensor handle.
#[derive(Clone)]
enum Storage {
    /// Dense host buffer owned by this tensor.
    Host(Vec<u8>),
    /// Opaque accelerator-side handle, shared with the owning runtime.
    Accel(Arc<dyn Any + Send + Sync>),
}

/// Multi-dimensional numeric array handle with device residency metadata.
#[derive(Clone)]
pub struct Tensor {
    shape: Shape,
    dtype: DType,
    device: Device,
    storage: Storage,
}

impl Tensor {
    /// Constructs a host `F32` tensor from raw values, validating the length
    /// against the shape.
    pub fn from_vec(shape: Shape, data: Vec<f32>) -> Result<Self> {
        if data.len() != shape.num_elements() {
            bail!(
                "tensor data length ({}) does not match shape {:?}",
                data.len(),
                shape.dims()
            );
        }
        Ok(Tensor {
            shape,
            dtype: DType::F32,
            device: Device::Cpu,
            storage: Storage::Host(vec_into_bytes(data)),
        })
    }

    /// Constructs a host `F16` tensor, ensuring the payload matches the
    /// expected element count.
    pub fn from_half(shape: Shape, data: Vec<f16>) -> Result<Self> {
        if data.len() != shape.num_elements() {
            bail!(
                "tensor data length ({}) does not match shape {:?}",
                data.len(),
                shape.dims()
            );
        }
        Ok(Tensor {
            shape,
            dtype: DType::F16,
            device: Device::Cpu,
            storage: Storage::Host(vec_into_bytes(data)),
        })
    }

    /// Constructs a host `I64` tensor, ensuring the payload matches the
    /// expected element count.
    pub fn from_i64(shape: Shape, data: Vec<i64>) -> Result<Self> {
        if data.len() != shape.num_elements() {
            bail!(
                "tensor data length ({}) does not match shape {:?}",
                data.len(),
                shape.dims()
            );
        }
        Ok(Tensor {
            shape,
            dtype: DType::I64,
            device: Device::Cpu,
            storage: Storage::Host(vec_into_bytes(data)),
        })
    }

    /// Wraps an accelerator-owned handle as a tensor on the given device.
    ///
    /// The handle is stored type-erased; the backend that created it recovers
    /// the concrete type by downcasting [`Tensor::accel_handle`]. Fails if
    /// `device` is not an accelerator device.
    pub fn from_accel_handle<H>(shape: Shape, dtype: DType, device: Device, handle: H) -> Result<Self>
    where
        H: Any + Send + Sync,
    {
        if !device.is_accel() {
            bail!("accelerator handle requires an accelerator device, got {device}");
        }
        Ok(Tensor {
            shape,
            dtype,
            device,
            storage: Storage::Accel(Arc::new(handle)),
        })
    }

    /// Returns the total number of elements stored in the tensor.
    pub fn len(&self) -> usize {
        self.shape.num_elements()
    }

    /// Reports whether the tensor contains zero elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Provides access to the tensor shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the scalar dtype of the tensor payload.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Returns the device residency tag.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Borrows the underlying `f32` data slice, panicking if the tensor is
    /// not a host-resident `F32` tensor.
    pub fn data(&self) -> &[f32] {
        match (&self.storage, self.dtype) {
            (Storage::Host(bytes), DType::F32) => bytes_as_slice::<f32>(bytes),
            _ => panic!("tensor data is not host-resident f32"),
        }
    }

    /// Borrows the underlying `f16` data slice, panicking if the tensor is
    /// not a host-resident `F16` tensor.
    pub fn data_f16(&self) -> &[f16] {
        match (&self.storage, self.dtype) {
            (Storage::Host(bytes), DType::F16) => bytes_as_slice::<f16>(bytes),
            _ => panic!("tensor data is not host-resident f16"),
        }
    }

    /// Borrows the underlying `i64` data slice, panicking if the tensor is
    /// not a host-resident `I64` tensor.
    pub fn data_i64(&self) -> &[i64] {
        match (&self.storage, self.dtype) {
            (Storage::Host(bytes), DType::I64) => bytes_as_slice::<i64>(bytes),
            _ => panic!("tensor data is not host-resident i64"),
        }
    }

    /// Borrows the raw host byte buffer, panicking for accelerator tensors.
    pub fn host_bytes(&self) -> &[u8] {
        match &self.storage {
            Storage::Host(bytes) => bytes,
            Storage::Accel(_) => panic!("tensor bytes are not host-resident"),
        }
    }

    /// Returns the opaque accelerator handle for backend downcasting, or
    /// `None` for host tensors.
    pub fn accel_handle(&self) -> Option<&(dyn Any + Send + Sync)> {
        match &self.storage {
            Storage::Host(_) => None,
            Storage::Accel(handle) => Some(handle.as_ref()),
        }
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let storage = match &self.storage {
            Storage::Host(bytes) => format!("host[{} bytes]", bytes.len()),
            Storage::Accel(_) => "accel-handle".to_string(),
        };
        f.debug_struct("Tensor")
            .field("shape", &self.shape.dims())
            .field("dtype", &self.dtype)
            .field("device", &self.device)
            .field("storage", &storage)
            .finish()
    }
}

/// Converts an owned vector into a raw byte buffer without copying.
fn vec_into_bytes<T>(data: Vec<T>) -> Vec<u8> {
    let mut data = ManuallyDrop::new(data);
    let ptr = data.as_mut_ptr() as *mut u8;
    let len = data.len() * size_of::<T>();
    let cap = data.capacity() * size_of::<T>();
    unsafe { Vec::from_raw_parts(ptr, len, cap) }
}

/// Views a byte slice as a typed slice, asserting that the layout matches.
fn bytes_as_slice<T>(bytes: &[u8]) -> &[T] {
    assert_eq!(
        bytes.len() % size_of::<T>(),
        0,
        "byte length {} is not a multiple of element size {}",
        bytes.len(),
        size_of::<T>()
    );
    unsafe { std::slice::from_raw_parts(bytes.as_ptr() as *const T, bytes.len() / size_of::<T>()) }
}
