//! Device residency tags attached to every tensor handle.

use std::fmt;

/// Identifies where a tensor's backing storage lives.
///
/// Residency is metadata: a tensor may be tagged [`Device::Accel`] even in a
/// build that links no accelerator backend, in which case routing an operator
/// to it fails with a configuration error instead of silently falling back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    /// Dense host memory owned by this process.
    Cpu,
    /// Memory on the accelerator device with the given ordinal, owned by an
    /// accelerator runtime and reachable only through its backend.
    Accel(u32),
}

impl Device {
    /// Residency query used by the dispatch layer: true when the tensor's
    /// storage lives on an accelerator device.
    pub fn is_accel(self) -> bool {
        matches!(self, Device::Accel(_))
    }

    /// Returns the accelerator ordinal, if any.
    pub fn accel_ordinal(self) -> Option<u32> {
        match self {
            Device::Cpu => None,
            Device::Accel(ordinal) => Some(ordinal),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => f.write_str("cpu"),
            Device::Accel(ordinal) => write!(f, "accel:{ordinal}"),
        }
    }
}
