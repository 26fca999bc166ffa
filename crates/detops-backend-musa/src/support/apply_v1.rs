//! Support surface for the legacy 1.x runtime ABI.
//!
//! The 1.x runtime passes half-precision scalars as opaque 16-bit payloads.
//! The wrapper type keeps the bit pattern and forces an explicit unwrap at
//! the call sites that assemble launch parameters.

use half::f16;

/// Half-precision scalar as the 1.x kernel ABI receives it: a raw bit
/// pattern rather than a typed float.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct KernelHalf(u16);

/// Converts a host value to the kernel's half type.
pub fn kernel_half(value: f32) -> KernelHalf {
    KernelHalf(f16::from_f32(value).to_bits())
}

/// Raw bit pattern handed to launch parameters.
pub fn kernel_half_bits(value: KernelHalf) -> u16 {
    value.0
}

/// Reads a kernel half back to `f32`.
pub fn kernel_half_to_f32(value: KernelHalf) -> f32 {
    f16::from_bits(value.0).to_f32()
}

const BLOCK_THREADS: u32 = 512;

/// Grid and block sizes covering `work_items` elements.
///
/// The 1.x runtime schedules full 512-thread blocks over a flat grid; a
/// zero-item launch still gets non-zero dims so the launch stays valid.
pub fn launch_dims(work_items: usize) -> (u32, u32) {
    let block = BLOCK_THREADS as usize;
    let grid = ((work_items + block - 1) / block).max(1) as u32;
    (grid, BLOCK_THREADS)
}
