//! Enumerates the scalar element types carried by detection tensors.

/// Logical dtype identifier shared between host tensors and accelerator handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit floating point following IEEE-754 semantics.
    F32,
    /// 16-bit floating point (fp16), accepted by accelerator kernels.
    F16,
    /// 64-bit signed integer, used for sort orders and keep indices.
    I64,
}

impl DType {
    /// Returns the number of bytes required per scalar element.
    pub fn size_in_bytes(self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F16 => 2,
            DType::I64 => 8,
        }
    }

    /// Produces a stable tag used when serializing or crossing FFI boundaries.
    pub fn tag(self) -> u32 {
        match self {
            DType::F32 => 0,
            DType::F16 => 1,
            DType::I64 => 2,
        }
    }

    /// Reconstructs a `DType` from its serialized tag representation.
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(DType::F32),
            1 => Some(DType::F16),
            2 => Some(DType::I64),
            _ => None,
        }
    }

    /// Reports whether the dtype is one of the floating-point box/score types.
    pub fn is_float(self) -> bool {
        matches!(self, DType::F32 | DType::F16)
    }
}
