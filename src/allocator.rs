//! Output allocation.

use crate::matrix::{ElementType, Matrix};
use tracing::debug;

/// Outcome of an [`OutputAllocator::allocate`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Allocation {
    /// The existing buffer already had the requested shape and type.
    Reused,
    /// A new zero-filled buffer replaced the previous one.
    Reallocated,
}

/// Owns the stage's output buffer.
#[derive(Clone, Debug, Default)]
pub struct OutputAllocator {
    output: Option<Matrix>,
    allocations: usize,
}

impl OutputAllocator {
    /// An allocator with no buffer yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure the output has shape `sizes` and element type `element_type`.
    ///
    /// A buffer that already matches is kept as is, so its contents survive
    /// until the next copy overwrites them.
    pub fn allocate(&mut self, sizes: &[usize], element_type: ElementType) -> Allocation {
        if let Some(output) = &self.output {
            if output.shape() == sizes && output.element_type() == element_type {
                return Allocation::Reused;
            }
        }

        debug!(?sizes, %element_type, "allocating output");
        self.output = Some(Matrix::zeros(sizes, element_type));
        self.allocations += 1;
        Allocation::Reallocated
    }

    /// The current output buffer.
    pub fn output(&self) -> Option<&Matrix> {
        self.output.as_ref()
    }

    /// Mutable access to the output buffer, for the per-tick copy.
    pub fn output_mut(&mut self) -> Option<&mut Matrix> {
        self.output.as_mut()
    }

    /// Number of buffers allocated so far.
    pub fn allocations(&self) -> usize {
        self.allocations
    }
}
