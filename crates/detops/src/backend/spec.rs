//! Accelerator backend contract and the error taxonomy shared with callers.
//!
//! The dispatch layer consumes exactly one collaborator interface: a backend
//! executing rotated non-maximum suppression against the accelerator device.
//! Backends live in their own crates and register themselves with
//! [`crate::backend::registry`]; linking such a crate into a binary is what
//! makes accelerator support available at run time.

use std::fmt;

use crate::tensor::Tensor;

/// Fixed message reported when an operator is routed to the accelerator in a
/// binary that links no accelerator backend.
pub const NOT_COMPILED_MESSAGE: &str = "Not compiled with GPU support";

/// Errors produced below the operator surface.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// An argument violated the operator contract.
    InvalidArgument { message: String },
    /// Accelerator execution was requested but no accelerator backend is
    /// linked into this binary.
    NotCompiled,
    /// The backend failed while executing a kernel, driver call, or transfer.
    Execution { message: String },
    /// The backend does not implement the requested operation.
    Unimplemented { op: &'static str, reason: String },
}

impl BackendError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        BackendError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn not_compiled() -> Self {
        BackendError::NotCompiled
    }

    pub fn execution(message: impl Into<String>) -> Self {
        BackendError::Execution {
            message: message.into(),
        }
    }

    pub fn unimplemented(op: &'static str, reason: impl Into<String>) -> Self {
        BackendError::Unimplemented {
            op,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::InvalidArgument { message } => {
                write!(f, "invalid argument: {message}")
            }
            BackendError::NotCompiled => f.write_str(NOT_COMPILED_MESSAGE),
            BackendError::Execution { message } => {
                write!(f, "backend execution failure: {message}")
            }
            BackendError::Unimplemented { op, reason } => {
                write!(f, "{op} is not implemented: {reason}")
            }
        }
    }
}

impl std::error::Error for BackendError {}

/// Convenience alias for results returned by backend routines.
pub type BackendResult<T> = Result<T, BackendError>;

/// Device-side implementation of rotated non-maximum suppression.
///
/// The dispatcher passes all six operator arguments through unmodified; the
/// backend owns argument validation, device transfers, kernel execution, and
/// the shape of the returned index tensor. Implementations must not fall back
/// to host execution: a backend that cannot reach its device reports an
/// [`BackendError::Execution`] error instead.
pub trait AccelBackend: Send + Sync + fmt::Debug {
    /// Returns a human-readable backend identifier (e.g., `"musa"`).
    fn backend_name(&self) -> &str;

    /// Probes whether the backing device runtime can be reached from this
    /// process. Registration does not imply availability.
    fn is_available(&self) -> bool;

    /// Runs rotated non-maximum suppression on the accelerator.
    ///
    /// `order` holds the descending-score permutation of the boxes and
    /// `dets_sorted` the boxes permuted by it; `multi_label` selects
    /// six-column label-aware suppression. Returns the kept indices, relative
    /// to the caller's original box order.
    fn nms_rotated(
        &self,
        dets: &Tensor,
        scores: &Tensor,
        order: &Tensor,
        dets_sorted: &Tensor,
        iou_threshold: f32,
        multi_label: i32,
    ) -> BackendResult<Tensor>;
}
