//! Dimension bookkeeping for detection tensors.
//!
//! Everything this crate moves around is low-rank: rank-2 detection
//! matrices of `(rows, columns)` and rank-1 score or index vectors.
//! `Shape` holds the dimension list and answers the rank and
//! element-count questions the validators and kernels ask of it.

/// Dimension list of a tensor, outermost axis first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Wraps a dimension list.
    ///
    /// Panics when `dims` is empty; a zero-axis tensor has no element
    /// layout for the dense storage to check buffers against. Zero-sized
    /// axes (an empty detection batch) are fine.
    pub fn new(dims: Vec<usize>) -> Self {
        assert!(!dims.is_empty(), "shape must have at least one dimension");
        Shape { dims }
    }

    /// The dimension list.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of axes.
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Element count implied by the dimensions.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }
}
