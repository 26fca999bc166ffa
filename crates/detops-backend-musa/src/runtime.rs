//! Accelerated rotated suppression.
//!
//! The device kernel fills an `n x col_blocks` suppression mask: bit `k` of
//! word `(i, j)` is set when sorted box `i` suppresses sorted box
//! `j * 64 + k`. The kernel only compares a box against later boxes, so the
//! host sweep scans rows in order, skips boxes already marked, and
//! accumulates the mask words of each survivor. Kept sorted positions are
//! then gathered through `order` to recover original row indices.

use std::ffi::c_void;
use std::sync::Arc;

use detops::backend::{BackendError, BackendResult};
use detops::tensor::{DType, Device, Shape, Tensor};

use crate::bundle::{self, BundleCache};
use crate::device::{self, DeviceBuffer, MusaDriver};
use crate::support::{kernel_half, kernel_half_bits};
use crate::MusaTensor;

/// Mask kernel block width; one thread per bit of a mask word.
const MASK_WORD_BITS: usize = 64;

const KERNEL_SYMBOL_F32: &str = "nms_rotated_musa_kernel_f32";
const KERNEL_SYMBOL_F16: &str = "nms_rotated_musa_kernel_f16";

pub(crate) fn nms_rotated(
    cache: &BundleCache,
    dets: &Tensor,
    _scores: &Tensor,
    order: &Tensor,
    dets_sorted: &Tensor,
    iou_threshold: f32,
    multi_label: i32,
) -> BackendResult<Tensor> {
    if !dets.device().is_accel() {
        return Err(BackendError::invalid_argument(format!(
            "musa nms_rotated expects accelerator-resident dets, got {}",
            dets.device()
        )));
    }
    let dims = dets_sorted.shape().dims();
    if dets_sorted.shape().rank() != 2 {
        return Err(BackendError::invalid_argument(format!(
            "musa nms_rotated expects rank-2 dets_sorted, got shape {dims:?}"
        )));
    }
    let boxes = dims[0];
    let expected_columns = if multi_label != 0 { 6 } else { 5 };
    if dims[1] != expected_columns {
        return Err(BackendError::invalid_argument(format!(
            "musa nms_rotated with multi_label={multi_label} expects {expected_columns} columns, got {}",
            dims[1]
        )));
    }

    // The threshold is converted to the kernel's scalar type, mirroring the
    // box dtype the kernel was compiled for.
    let mut threshold_f32 = iou_threshold;
    let mut threshold_half = kernel_half_bits(kernel_half(iou_threshold));
    let (symbol, threshold_param) = match dets_sorted.dtype() {
        DType::F32 => (
            KERNEL_SYMBOL_F32,
            &mut threshold_f32 as *mut f32 as *mut c_void,
        ),
        DType::F16 => (
            KERNEL_SYMBOL_F16,
            &mut threshold_half as *mut u16 as *mut c_void,
        ),
        other => {
            return Err(BackendError::invalid_argument(format!(
                "musa nms_rotated supports F32 or F16 boxes, got {other:?}"
            )))
        }
    };

    let order_vals = order_values(order, boxes)?;

    let driver = device::driver()?;
    if boxes == 0 {
        return keep_tensor(&driver, dets.device(), &[]);
    }

    let boxes_buf = device_boxes(&driver, dets_sorted)?;
    let col_blocks = (boxes + MASK_WORD_BITS - 1) / MASK_WORD_BITS;
    // Every mask word in range is written by the kernel, so the buffer does
    // not need to be zeroed first.
    let mask_buf = driver.alloc(boxes * col_blocks * 8)?;

    let manifest = bundle::bundle_path_from_env()?;
    let decoded = cache.load(&manifest)?;
    let module = driver.load_module(decoded.image_for(symbol)?)?;
    let function = driver.get_function(&module, symbol)?;

    let mut boxes_param = boxes as i32;
    let mut boxes_ptr = boxes_buf.device_ptr();
    let mut mask_ptr = mask_buf.device_ptr();
    let mut multi_label_param = multi_label;
    let mut params: [*mut c_void; 5] = [
        &mut boxes_param as *mut i32 as *mut c_void,
        threshold_param,
        &mut boxes_ptr as *mut u64 as *mut c_void,
        &mut mask_ptr as *mut u64 as *mut c_void,
        &mut multi_label_param as *mut i32 as *mut c_void,
    ];
    let grid = (col_blocks as u32, col_blocks as u32, 1);
    let block = (MASK_WORD_BITS as u32, 1, 1);
    driver.launch_kernel(&function, grid, block, 0, &mut params)?;
    driver.synchronize()?;

    let mask = u64_words(&mask_buf.read_to_vec()?);
    let keep: Vec<i64> = sweep_suppression_mask(&mask, boxes)
        .into_iter()
        .map(|pos| order_vals[pos])
        .collect();
    keep_tensor(&driver, dets.device(), &keep)
}

/// Selects surviving sorted positions from the kernel's suppression mask.
///
/// `mask` holds `boxes` rows of `ceil(boxes / 64)` words each. Suppression
/// bits only point forward (a box never suppresses an earlier one), so a
/// single in-order scan suffices.
pub fn sweep_suppression_mask(mask: &[u64], boxes: usize) -> Vec<usize> {
    let col_blocks = if boxes == 0 {
        0
    } else {
        (boxes + MASK_WORD_BITS - 1) / MASK_WORD_BITS
    };
    debug_assert_eq!(mask.len(), boxes * col_blocks);
    let mut removed = vec![0u64; col_blocks];
    let mut keep = Vec::with_capacity(boxes);
    for i in 0..boxes {
        let word = i / MASK_WORD_BITS;
        let bit = i % MASK_WORD_BITS;
        if removed[word] & (1u64 << bit) != 0 {
            continue;
        }
        keep.push(i);
        let row = &mask[i * col_blocks..(i + 1) * col_blocks];
        for j in word..col_blocks {
            removed[j] |= row[j];
        }
    }
    keep
}

fn order_values(order: &Tensor, boxes: usize) -> BackendResult<Vec<i64>> {
    if order.dtype() != DType::I64 {
        return Err(BackendError::invalid_argument(format!(
            "musa nms_rotated expects an I64 order tensor, got {:?}",
            order.dtype()
        )));
    }
    if order.len() != boxes {
        return Err(BackendError::invalid_argument(format!(
            "order has {} entries but dets_sorted has {boxes} rows",
            order.len()
        )));
    }
    if order.device().is_accel() {
        let handle = musa_handle(order, "order")?;
        return Ok(i64_values(&handle.buffer.read_to_vec()?));
    }
    Ok(order.data_i64().to_vec())
}

fn device_boxes(
    driver: &Arc<MusaDriver>,
    dets_sorted: &Tensor,
) -> BackendResult<Arc<DeviceBuffer>> {
    if dets_sorted.device().is_accel() {
        let handle = musa_handle(dets_sorted, "dets_sorted")?;
        return Ok(Arc::clone(&handle.buffer));
    }
    driver.alloc_and_upload(dets_sorted.host_bytes())
}

fn keep_tensor(driver: &Arc<MusaDriver>, device: Device, keep: &[i64]) -> BackendResult<Tensor> {
    let mut bytes = Vec::with_capacity(keep.len() * 8);
    for value in keep {
        bytes.extend_from_slice(&value.to_ne_bytes());
    }
    let buffer = driver.alloc_and_upload(&bytes)?;
    Tensor::from_accel_handle(
        Shape::new(vec![keep.len()]),
        DType::I64,
        device,
        MusaTensor::new(buffer),
    )
    .map_err(|err| BackendError::execution(err.to_string()))
}

fn musa_handle<'t>(tensor: &'t Tensor, name: &str) -> BackendResult<&'t MusaTensor> {
    tensor
        .accel_handle()
        .and_then(|handle| handle.downcast_ref::<MusaTensor>())
        .ok_or_else(|| {
            BackendError::invalid_argument(format!(
                "{name} does not carry a MUSA tensor handle"
            ))
        })
}

pub(crate) fn u64_words(bytes: &[u8]) -> Vec<u64> {
    bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            u64::from_ne_bytes(word)
        })
        .collect()
}

pub(crate) fn i64_values(bytes: &[u8]) -> Vec<i64> {
    bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            i64::from_ne_bytes(word)
        })
        .collect()
}

pub(crate) fn f32_values(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| {
            let mut word = [0u8; 4];
            word.copy_from_slice(chunk);
            f32::from_ne_bytes(word)
        })
        .collect()
}

pub(crate) fn f16_values(bytes: &[u8]) -> Vec<half::f16> {
    bytes
        .chunks_exact(2)
        .map(|chunk| {
            let mut word = [0u8; 2];
            word.copy_from_slice(chunk);
            half::f16::from_bits(u16::from_ne_bytes(word))
        })
        .collect()
}
