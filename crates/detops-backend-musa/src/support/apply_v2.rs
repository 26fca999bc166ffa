//! Support surface for the 2.x runtime ABI.
//!
//! The 2.x runtime takes IEEE binary16 directly, so the kernel scalar is
//! `half::f16` itself and the conversions are bit-identities.

use half::f16;

/// Half-precision scalar exactly as the 2.x kernel ABI receives it.
pub type KernelHalf = f16;

/// Converts a host value to the kernel's half type.
pub fn kernel_half(value: f32) -> KernelHalf {
    f16::from_f32(value)
}

/// Raw bit pattern handed to launch parameters.
pub fn kernel_half_bits(value: KernelHalf) -> u16 {
    value.to_bits()
}

/// Reads a kernel half back to `f32`.
pub fn kernel_half_to_f32(value: KernelHalf) -> f32 {
    value.to_f32()
}

const BLOCK_THREADS: u32 = 256;

/// Grid and block sizes covering `work_items` elements.
///
/// The 2.x runtime prefers 256-thread blocks; a zero-item launch still gets
/// non-zero dims so the launch stays valid.
pub fn launch_dims(work_items: usize) -> (u32, u32) {
    let block = BLOCK_THREADS as usize;
    let grid = ((work_items + block - 1) / block).max(1) as u32;
    (grid, BLOCK_THREADS)
}
